//! # 헬스체크 핸들러
//!
//! `GET /health` → `{ "status": "ok" }` 또는 DB에 닿지 않으면 503과 `{ "status": "degraded" }`

use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use super::AppState;

/// 프로세스가 살아 있고 SQLite에 쿼리를 보낼 수 있는지 확인합니다.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match sqlx::query("SELECT 1").execute(&state.pool).await {
        Ok(_) => (StatusCode::OK, Json(json!({ "status": "ok" }))),
        Err(e) => {
            tracing::warn!("Health check could not reach the database: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "degraded" })),
            )
        }
    }
}
