//! # 에러 처리 모듈
//!
//! 수집 서버에서 발생할 수 있는 에러를 하나의 타입으로 통합하고,
//! HTTP 응답으로 변환하는 방법을 정의합니다.
//!
//! 에러 분류:
//! - 입력 검증(`BadRequest`): 잘못된 JSON. 부수 효과 없이 즉시 거절
//! - 인증(`Unauthorized`): 자격 증명 불일치. "unauthorized" 이상의 정보는 노출하지 않음
//! - 저장소(`Database`): 해당 요청만 실패시키고 프로세스는 계속 동작

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::middleware::auth::AuthError;

/// 요청 처리 또는 집계 패스 중에 발생할 수 있는 에러
///
/// 핸들러에서 `Result<T, AppError>`를 반환하면
/// Axum이 `IntoResponse`를 호출하여 HTTP 응답으로 변환합니다.
#[derive(Debug, Error)]
pub enum AppError {
    /// 잘못된 요청 (HTTP 400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// 인증 실패 (HTTP 401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// 데이터베이스 오류 (HTTP 500)
    /// #[from]: sqlx 함수 호출 뒤의 `?`가 자동으로 이 variant로 변환됩니다.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Unauthorized(err.to_string())
    }
}

impl IntoResponse for AppError {
    /// 에러 종류에 맞는 상태 코드와 JSON 에러 본문을 만듭니다.
    ///
    /// 데이터베이스 에러는 실제 내용을 로그에만 기록하고
    /// 클라이언트에는 일반적인 메시지만 돌려줍니다.
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::BadRequest(ref msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", msg.clone())
            }
            AppError::Unauthorized(_) => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Unauthorized".to_string(),
            ),
            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database_error",
                    "A database error occurred".to_string(),
                )
            }
        };

        // 결과: { "error": { "code": "bad_request", "message": "..." } }
        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
