//! # 하트비트 쿼리 모듈
//!
//! 하트비트는 삽입만 하고 수정/삭제하지 않습니다.
//! 순서는 삽입 순서가 아니라 클라이언트가 보낸 `timestamp` 기준입니다.

use crate::error::AppError;
use crate::models::{Heartbeat, HeartbeatRecord, SummaryWindow, UsageGroup};
use sqlx::SqlitePool;

/// 하트비트 한 건을 저장합니다. `project_id`는 get-or-create로 미리 확보한 값입니다.
pub async fn insert_heartbeat(
    pool: &SqlitePool,
    project_id: i64,
    heartbeat: &Heartbeat,
) -> Result<HeartbeatRecord, AppError> {
    let record = sqlx::query_as::<_, HeartbeatRecord>(
        r#"
        INSERT INTO heartbeats (user_id, project_id, language, file_path, duration, timestamp)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING id, user_id, project_id, language, file_path, duration, timestamp
        "#,
    )
    .bind(&heartbeat.user_id)
    .bind(project_id)
    .bind(&heartbeat.language)
    .bind(&heartbeat.file_path)
    .bind(heartbeat.duration)
    .bind(heartbeat.timestamp)
    .fetch_one(pool)
    .await?;

    Ok(record)
}

/// 구간 `[start, end)`의 하트비트를 (user_id, project, language)별로 합산합니다.
///
/// 결과 순서는 SQLite의 GROUP BY가 돌려주는 순서 그대로이며 별도로 정렬하지 않습니다.
pub async fn summarize_window(
    pool: &SqlitePool,
    window: SummaryWindow,
) -> Result<Vec<UsageGroup>, AppError> {
    let groups = sqlx::query_as::<_, UsageGroup>(
        r#"
        SELECT h.user_id AS user_id,
               p.name AS project,
               h.language AS language,
               SUM(h.duration) AS total_duration
        FROM heartbeats h
        JOIN projects p ON h.project_id = p.id
        WHERE h.timestamp >= ? AND h.timestamp < ?
        GROUP BY h.user_id, p.name, h.language
        "#,
    )
    .bind(window.start)
    .bind(window.end)
    .fetch_all(pool)
    .await?;

    Ok(groups)
}
