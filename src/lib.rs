//! # Eztracker 라이브러리
//!
//! 에디터 활동을 하트비트로 만들고, 서버에 전송하고, 저장하고,
//! 매주 사용자별 요약 메일을 보내는 파이프라인 전체를 담고 있습니다.
//!
//! 데이터 흐름:
//! ```text
//! client::coalescer → client::command (shim 호출) → eztracker-cli → client::transport
//!     → routes::heartbeats (POST /heartbeat) → db → services::aggregation → services::mailer
//! ```
//!
//! 서버 쪽 모듈:
//! - `config`: 환경변수 기반 서버 설정
//! - `db`: SQLite 쿼리 함수
//! - `error`: `AppError`와 HTTP 응답 변환
//! - `middleware`: Bearer 인증과 자격 증명 저장소
//! - `models`: 와이어 스키마와 DB 행 구조체
//! - `routes`: Axum 라우터와 핸들러
//! - `services`: 주간 집계, 스케줄 계산, 메일 전송
//!
//! 클라이언트 쪽 모듈은 `client` 아래에 있습니다.

pub mod client;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
