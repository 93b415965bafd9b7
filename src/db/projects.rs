//! # 프로젝트 get-or-create 쿼리
//!
//! 프로젝트는 (user_id, name) 조합으로 식별합니다.
//! 먼저 조회하고, 없을 때만 새로 만듭니다.
//!
//! ## 약한 유일성
//! 조회와 삽입은 서로 다른 문장이라 원자적이지 않습니다.
//! 같은 (user_id, name)으로 동시에 첫 요청이 들어오면 행이 두 개 생길 수 있고,
//! 중복의 수는 동시 호출자 수를 넘지 않습니다.
//! 중복이 생겨도 조회는 항상 가장 작은 id를 돌려주므로 이후 호출은 같은 프로젝트로 수렴합니다.

use crate::error::AppError;
use crate::models::Project;
use sqlx::SqlitePool;

/// (user_id, name)으로 프로젝트를 조회합니다. 중복 행이 있으면 가장 먼저 만든 행을 돌려줍니다.
pub async fn find_project(
    pool: &SqlitePool,
    user_id: &str,
    name: &str,
) -> Result<Option<Project>, AppError> {
    let project = sqlx::query_as::<_, Project>(
        r#"
        SELECT id, user_id, name, path
        FROM projects
        WHERE user_id = ? AND name = ?
        ORDER BY id
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .bind(name)
    .fetch_optional(pool)
    .await?;

    Ok(project)
}

/// 새 프로젝트 행을 삽입하고, DB가 부여한 id를 포함한 행을 돌려줍니다.
pub async fn create_project(
    pool: &SqlitePool,
    user_id: &str,
    name: &str,
    path: &str,
) -> Result<Project, AppError> {
    let project = sqlx::query_as::<_, Project>(
        r#"
        INSERT INTO projects (user_id, name, path)
        VALUES (?, ?, ?)
        RETURNING id, user_id, name, path
        "#,
    )
    .bind(user_id)
    .bind(name)
    .bind(path)
    .fetch_one(pool)
    .await?;

    Ok(project)
}

/// 조회 후 없으면 생성합니다.
///
/// `path`는 새로 만들 때만 쓰이는 예시 파일 경로입니다.
pub async fn get_or_create_project(
    pool: &SqlitePool,
    user_id: &str,
    name: &str,
    path: &str,
) -> Result<Project, AppError> {
    if let Some(project) = find_project(pool, user_id, name).await? {
        return Ok(project);
    }

    let project = create_project(pool, user_id, name, path).await?;
    tracing::info!(user_id, project = name, id = project.id, "Created project");
    Ok(project)
}

pub async fn count_projects(pool: &SqlitePool, user_id: &str, name: &str) -> Result<i64, AppError> {
    let (count,) = sqlx::query_as::<_, (i64,)>(
        "SELECT COUNT(*) FROM projects WHERE user_id = ? AND name = ?",
    )
    .bind(user_id)
    .bind(name)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[tokio::test]
    async fn get_or_create_is_idempotent() {
        let pool = db::connect("sqlite::memory:", 1).await.unwrap();

        let first = get_or_create_project(&pool, "u1", "demo", "/x/demo/main.go")
            .await
            .unwrap();
        let second = get_or_create_project(&pool, "u1", "demo", "/x/demo/other.go")
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        // 예시 경로는 처음 만든 값이 유지됩니다.
        assert_eq!(second.path, "/x/demo/main.go");
        assert_eq!(count_projects(&pool, "u1", "demo").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn same_name_for_different_users_is_separate() {
        let pool = db::connect("sqlite::memory:", 1).await.unwrap();

        let a = get_or_create_project(&pool, "u1", "demo", "/a").await.unwrap();
        let b = get_or_create_project(&pool, "u2", "demo", "/b").await.unwrap();

        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn lookup_prefers_oldest_duplicate() {
        let pool = db::connect("sqlite::memory:", 1).await.unwrap();

        let oldest = create_project(&pool, "u1", "demo", "/a").await.unwrap();
        create_project(&pool, "u1", "demo", "/b").await.unwrap();

        let found = get_or_create_project(&pool, "u1", "demo", "/c").await.unwrap();
        assert_eq!(found.id, oldest.id);
        assert_eq!(count_projects(&pool, "u1", "demo").await.unwrap(), 2);
    }
}
