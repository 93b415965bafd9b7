//! # 서비스 모듈
//!
//! HTTP 요청과 무관하게 백그라운드에서 도는 작업들입니다.
//! - `aggregation`: 지난 7일 하트비트를 집계해서 사용자별 메일을 보내는 주간 패스
//! - `mailer`: 메일 전송 트레이트와 SMTP/로그 구현
//! - `schedule`: 다음 트리거 시각(일요일 00:00) 계산

pub mod aggregation;
pub mod mailer;
pub mod schedule;

pub use aggregation::*;
pub use mailer::*;
pub use schedule::*;
