//! # 하트비트 모델
//!
//! 하트비트는 "어떤 파일에서 얼마나 시간을 보냈는가"에 대한 불변의 기록입니다.
//! 한 번 저장되면 수정되거나 삭제되지 않습니다 (append-only).

use serde::{Deserialize, Serialize};

/// `POST /heartbeat` 요청 본문. shim이 보내고 서버가 받는 와이어 스키마입니다.
///
/// 모든 필드가 필수입니다. 하나라도 빠지면 역직렬화에 실패하여 400으로 거절됩니다.
/// `timestamp`는 클라이언트 시계 기준의 epoch 초이며, 서버는 이 값을 그대로 믿습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heartbeat {
    pub user_id: String,
    pub project: String,
    pub language: String,
    pub file_path: String,
    /// 이 파일에 머문 시간 (초, 소수점 포함)
    pub duration: f64,
    /// epoch 초
    pub timestamp: i64,
}

/// `heartbeats` 테이블의 한 행
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct HeartbeatRecord {
    pub id: i64,
    pub user_id: String,
    pub project_id: i64,
    pub language: String,
    pub file_path: String,
    pub duration: f64,
    pub timestamp: i64,
}
