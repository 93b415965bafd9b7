//! # 데이터베이스 접근 계층 (Data Access Layer)
//!
//! 라우트 핸들러와 집계 서비스가 호출하는 SQL 쿼리 함수들입니다.
//! 모든 함수는 개별 문장(statement) 단위로 실행되며 다중 문장 트랜잭션은 쓰지 않습니다.
//!
//! 하위 모듈:
//! - `heartbeats`: 하트비트 삽입과 구간 집계
//! - `projects`: (user_id, name) 기준 get-or-create
//! - `users`: 사용자 생성과 이메일 조회

pub mod heartbeats;
pub mod projects;
pub mod users;

pub use heartbeats::*;
pub use projects::*;
pub use users::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

/// SQLite 연결 풀을 만들고 마이그레이션을 실행합니다.
///
/// 파일이 없으면 새로 만듭니다. `sqlite::memory:`를 쓰는 테스트는
/// `max_connections`를 1로 넘겨야 모든 쿼리가 같은 인메모리 DB를 봅니다.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        // 인메모리 DB는 연결이 닫히면 사라지므로 유휴 연결을 정리하지 않습니다.
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}
