//! # 라우트 모듈
//!
//! 수집 서버의 HTTP 표면입니다.
//!
//! ## 엔드포인트
//! - `POST /heartbeat` → 하트비트 한 건 수집 (`heartbeats::ingest_heartbeat`)
//! - `GET  /health`    → 배포 환경의 상태 확인 (`health::health_check`)
//!
//! `/heartbeat`에 POST 이외의 메서드로 요청하면 Axum의 메서드 라우터가 405를 돌려줍니다.

pub mod health;
pub mod heartbeats;

pub use health::*;
pub use heartbeats::*;

use crate::middleware::auth::CredentialStore;
use axum::{
    routing::{get, post},
    Router,
};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// 모든 핸들러가 `State(state): State<AppState>`로 공유하는 상태
///
/// SqlitePool과 Arc는 clone해도 같은 풀/저장소를 가리킵니다.
#[derive(Clone)]
pub struct AppState {
    /// SQLite 연결 풀
    pub pool: SqlitePool,
    /// Bearer 토큰을 검증하는 자격 증명 저장소
    pub credentials: Arc<dyn CredentialStore>,
}

impl AppState {
    pub fn new(pool: SqlitePool, credentials: impl CredentialStore) -> Self {
        Self {
            pool,
            credentials: Arc::new(credentials),
        }
    }
}

/// 서버 라우터를 만듭니다. `main`과 테스트가 같은 라우터를 씁니다.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/heartbeat", post(ingest_heartbeat))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
