use crate::error::AppError;
use crate::models::User;
use sqlx::SqlitePool;

/// 사용자 행이 없으면 이메일 없이 만듭니다. 이미 있으면 아무것도 하지 않습니다.
pub async fn ensure_user(pool: &SqlitePool, id: &str) -> Result<(), AppError> {
    sqlx::query("INSERT OR IGNORE INTO users (id, email) VALUES (?, NULL)")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn set_email(pool: &SqlitePool, id: &str, email: &str) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO users (id, email)
        VALUES (?, ?)
        ON CONFLICT (id) DO UPDATE SET email = excluded.email
        "#,
    )
    .bind(id)
    .bind(email)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn find_user(pool: &SqlitePool, id: &str) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>("SELECT id, email FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(user)
}

/// 메일을 보낼 수 있는 주소를 돌려줍니다. 행이 없거나 이메일이 비어 있으면 None입니다.
pub async fn find_email(pool: &SqlitePool, id: &str) -> Result<Option<String>, AppError> {
    let email = find_user(pool, id)
        .await?
        .and_then(|user| user.email)
        .filter(|email| !email.trim().is_empty());

    Ok(email)
}
