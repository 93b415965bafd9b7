//! # 데이터 모델 모듈
//!
//! 와이어 스키마와 DB 행에 대응하는 구조체들을 정의합니다.
//! - `heartbeat`: 수집 요청 본문(`Heartbeat`)과 저장된 행(`HeartbeatRecord`)
//! - `project`: (user_id, name)으로 식별되는 프로젝트
//! - `summary`: 주간 집계 결과
//! - `user`: 사용자와 이메일

pub mod heartbeat;
pub mod project;
pub mod summary;
pub mod user;

pub use heartbeat::*;
pub use project::*;
pub use summary::*;
pub use user::*;
