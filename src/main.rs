//! # Eztracker 서버 진입점
//!
//! 이 바이너리가 수행하는 작업:
//! 1. 환경변수(.env) 로딩
//! 2. 로깅(tracing) 초기화
//! 3. SQLite 연결 풀 생성 + 마이그레이션
//! 4. 주간 요약 스케줄러를 백그라운드 태스크로 시작
//! 5. `POST /heartbeat` 수집 서버 시작 (Ctrl+C로 종료)
//!
//! `eztracker set-email <user_id> <email>`은 서버를 띄우지 않고
//! 사용자의 요약 메일 주소만 등록한 뒤 끝납니다.

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use eztracker::{
    clock::SystemClock,
    config::Config,
    db,
    middleware::auth::StaticCredentialStore,
    routes::{router, AppState},
    services::{mailer_for, Aggregator, Anchor, WeeklyTrigger},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "eztracker", version, about = "Eztracker heartbeat ingestion server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 수집 서버와 주간 요약 스케줄러를 실행합니다 (기본값)
    Serve,
    /// 사용자의 요약 메일 주소를 등록하거나 바꿉니다
    SetEmail { user_id: String, email: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── 1단계: 환경변수 로딩 ──
    // .env 파일이 없어도 에러 없이 넘어갑니다.
    dotenvy::dotenv().ok();

    // ── 2단계: 로깅 초기화 ──
    // RUST_LOG가 없으면 eztracker, tower_http, axum 모듈을 debug 레벨로 출력합니다.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "eztracker=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // ── 3단계: 설정 로딩 ──
    let config = Config::from_env()?;

    // ── 4단계: SQLite 연결 풀 생성 + 마이그레이션 ──
    tracing::info!("Connecting to database and running migrations...");
    let pool = db::connect(&config.database_url, 5).await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::SetEmail { user_id, email } => {
            db::set_email(&pool, &user_id, &email).await?;
            tracing::info!(user_id = %user_id, email = %email, "Summary email registered");
            Ok(())
        }
        Command::Serve => serve(config, pool).await,
    }
}

async fn serve(config: Config, pool: sqlx::SqlitePool) -> Result<()> {
    // ── 5단계: 주간 요약 스케줄러 ──
    // 메일 서버 설정이 없거나 쓸 수 없으면 요약을 로그로만 남깁니다.
    let mailer = mailer_for(config.smtp.as_ref());
    let anchor = if config.summary_in_utc {
        Anchor::Utc
    } else {
        Anchor::Local
    };

    // 스케줄러는 요청 처리와 독립된 하나의 태스크입니다. 런타임이 끝나면 함께 사라집니다.
    let aggregator = Aggregator::new(pool.clone(), mailer);
    tokio::spawn(aggregator.run(WeeklyTrigger::sunday_midnight(anchor), Arc::new(SystemClock)));

    // ── 6단계: 라우터 + 서버 시작 ──
    let state = AppState::new(pool, StaticCredentialStore::new(config.api_key.clone()));
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Eztracker server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        // 신호를 받을 수 없으면 종료 없이 계속 서비스합니다.
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
