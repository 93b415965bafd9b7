use serde::Serialize;

/// `projects` 테이블의 한 행.
///
/// 논리적 식별자는 (user_id, name)이고, `path`는 처음 본 파일 경로를 예시로 남깁니다.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Project {
    pub id: i64,
    pub user_id: String,
    pub name: String,
    pub path: String,
}
