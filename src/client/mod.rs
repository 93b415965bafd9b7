//! # 클라이언트 모듈
//!
//! 에디터 쪽에서 도는 코드입니다.
//!
//! - `config`: `~/.eztracker.cfg`와 환경변수에서 설정 읽기
//! - `language`: 스코프/확장자로 언어 판별
//! - `state`: 프로세스 재시작을 넘겨주는 로컬 상태 파일 (마지막 파일, 활동 시각, 하트비트 시각)
//! - `coalescer`: 편집 이벤트를 하트비트로 만들지 결정하는 상태 기계와 전송 버퍼
//! - `command`: 버퍼를 shim 바이너리 인자로 바꿔서 실행하는 `HeartbeatSink`
//! - `wire`: 에디터 → shim 이벤트 스키마와 서버 스키마 변환
//! - `transport`: shim이 서버로 보내는 HTTP 전송

pub mod coalescer;
pub mod command;
pub mod config;
pub mod language;
pub mod state;
pub mod transport;
pub mod wire;

pub use coalescer::*;
pub use command::*;
pub use config::*;
pub use state::*;
pub use transport::*;
pub use wire::*;

/// shim 프로세스 종료 코드. 에디터가 상황에 맞게 반응할 수 있도록 서로 구분됩니다.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    /// 일반 실패 (인자 오류, 전송 실패)
    pub const FAILURE: i32 = 1;
    /// 로컬 설정 파일을 읽거나 해석할 수 없음
    pub const CONFIG_PARSE_ERROR: i32 = 103;
    /// 설정과 환경변수 어디에도 API 키가 없음
    pub const API_KEY_ERROR: i32 = 104;
}
