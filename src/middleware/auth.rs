//! # Bearer 인증
//!
//! 수집 핸들러가 본문을 파싱한 뒤에 호출합니다. 실패 사유는 로그에만 남고 응답은 항상 "Unauthorized"입니다.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use thiserror::Error;

/// Bearer 자격 증명으로 하트비트를 제출할 수 있는지 판단합니다.
///
/// `AppState`에 주입되므로 핸들러는 프로세스 전역 비밀키를 직접 읽지 않습니다.
pub trait CredentialStore: Send + Sync + 'static {
    fn verify(&self, token: &str) -> bool;
}

/// 서버 시작 시의 `API_KEY` 하나만 받아들이는 저장소. 비밀키가 비어 있으면 아무것도 통과시키지 않습니다.
#[derive(Clone)]
pub struct StaticCredentialStore {
    secret: String,
}

impl StaticCredentialStore {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl CredentialStore for StaticCredentialStore {
    fn verify(&self, token: &str) -> bool {
        !self.secret.is_empty() && constant_time_eq(token.as_bytes(), self.secret.as_bytes())
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authorization token is required")]
    MissingToken,
    #[error("Invalid authorization token")]
    InvalidToken,
}

/// `Authorization: Bearer <token>` 헤더에서 토큰을 꺼냅니다.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(AuthError::MissingToken)?;

    auth_header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidToken)
}

pub fn authorize(headers: &HeaderMap, store: &dyn CredentialStore) -> Result<(), AuthError> {
    let token = bearer_token(headers)?;
    if store.verify(token) {
        Ok(())
    } else {
        Err(AuthError::InvalidToken)
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
