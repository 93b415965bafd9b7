//! # 하트비트 수집 핸들러
//!
//! `POST /heartbeat` 한 건을 처리하는 순서:
//! 1. 본문을 `Heartbeat`로 파싱 → 실패하면 400 (인증도 저장도 하지 않음)
//! 2. Bearer 토큰 검증 → 실패하면 401 (저장소에 아무것도 남기지 않음)
//! 3. 사용자 행 확보 (없으면 이메일 없이 생성)
//! 4. (user_id, project)로 프로젝트 get-or-create
//! 5. 하트비트 삽입 → 실패하면 500, 서버에서 재시도하지 않음
//! 6. 200 + `Heartbeat received`
//!
//! 파싱을 인증보다 먼저 하는 순서는 의도된 것입니다.
//! 그래서 `Json` 추출기 대신 원본 바이트를 받아 직접 파싱합니다.
//! (`Json` 추출기는 Content-Type 검사로 415를 돌려줄 수 있고, 추출기 순서가 파싱을 뒤로 미룹니다.)

use axum::{body::Bytes, extract::State, http::HeaderMap};

use super::AppState;
use crate::{db, error::AppError, middleware::auth, models::Heartbeat};

pub const ACKNOWLEDGEMENT: &str = "Heartbeat received";

pub async fn ingest_heartbeat(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<&'static str, AppError> {
    let heartbeat: Heartbeat = serde_json::from_slice(&body).map_err(|e| {
        tracing::warn!("Rejected heartbeat with invalid body: {}", e);
        AppError::BadRequest(format!("Invalid JSON: {e}"))
    })?;

    auth::authorize(&headers, state.credentials.as_ref()).inspect_err(|e| {
        tracing::warn!(user_id = %heartbeat.user_id, "Rejected heartbeat: {}", e);
    })?;

    db::ensure_user(&state.pool, &heartbeat.user_id).await?;

    let project = db::get_or_create_project(
        &state.pool,
        &heartbeat.user_id,
        &heartbeat.project,
        &heartbeat.file_path,
    )
    .await?;

    let record = db::insert_heartbeat(&state.pool, project.id, &heartbeat).await?;
    tracing::debug!(
        id = record.id,
        user_id = %record.user_id,
        project_id = record.project_id,
        duration = record.duration,
        "Stored heartbeat"
    );

    Ok(ACKNOWLEDGEMENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::auth::StaticCredentialStore;
    use crate::routes::router;
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
        Router,
    };
    use http_body_util::BodyExt;
    use sqlx::SqlitePool;
    use tower::ServiceExt;

    const BODY: &str = r#"{"user_id":"u1","project":"demo","language":"go","file_path":"/x/demo/main.go","duration":120.5,"timestamp":1700000000}"#;

    async fn app() -> (Router, SqlitePool) {
        let pool = db::connect("sqlite::memory:", 1).await.unwrap();
        let state = AppState::new(pool.clone(), StaticCredentialStore::new("secret"));
        (router(state), pool)
    }

    fn request(method: Method, token: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri("/heartbeat")
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn row_counts(pool: &SqlitePool) -> (i64, i64, i64) {
        let count = |table: &'static str| {
            let pool = pool.clone();
            async move {
                let (n,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
                    .fetch_one(&pool)
                    .await
                    .unwrap();
                n
            }
        };
        (count("users").await, count("projects").await, count("heartbeats").await)
    }

    #[tokio::test]
    async fn accepts_valid_heartbeat() {
        let (app, pool) = app().await;

        let response = app
            .oneshot(request(Method::POST, Some("secret"), BODY))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], ACKNOWLEDGEMENT.as_bytes());
        assert_eq!(row_counts(&pool).await, (1, 1, 1));
    }

    #[tokio::test]
    async fn wrong_bearer_is_unauthorized_without_side_effects() {
        let (app, pool) = app().await;

        let response = app
            .oneshot(request(Method::POST, Some("wrong"), BODY))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(row_counts(&pool).await, (0, 0, 0));
    }

    #[tokio::test]
    async fn malformed_body_is_rejected_before_authentication() {
        let (app, pool) = app().await;

        // 토큰이 없어도 400이 나와야 인증을 평가하지 않았다는 뜻입니다.
        let response = app
            .oneshot(request(Method::POST, None, "not json"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(row_counts(&pool).await, (0, 0, 0));
    }

    #[tokio::test]
    async fn missing_field_is_bad_request() {
        let (app, _pool) = app().await;

        let response = app
            .oneshot(request(
                Method::POST,
                Some("secret"),
                r#"{"user_id":"u1","project":"demo"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn other_methods_are_not_allowed() {
        let (app, _pool) = app().await;

        let response = app
            .oneshot(request(Method::GET, Some("secret"), ""))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn repeated_heartbeats_share_one_project() {
        let (app, pool) = app().await;

        for _ in 0..3 {
            let response = app
                .clone()
                .oneshot(request(Method::POST, Some("secret"), BODY))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        assert_eq!(row_counts(&pool).await, (1, 1, 3));
    }

    #[tokio::test]
    async fn storage_failure_is_internal_error() {
        let (app, pool) = app().await;
        sqlx::query("DROP TABLE heartbeats").execute(&pool).await.unwrap();

        let response = app
            .oneshot(request(Method::POST, Some("secret"), BODY))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (app, _pool) = app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
