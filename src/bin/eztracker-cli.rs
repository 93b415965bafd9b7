//! # eztracker-cli: 에디터가 호출하는 전송 shim
//!
//! 에디터 플러그인은 버퍼를 비울 때마다 이 바이너리를 한 번 실행합니다.
//! 첫 번째 하트비트는 개별 플래그로, 나머지는 `--extra-heartbeats` JSON 배열로 받습니다.
//!
//! 종료 코드:
//! - 0: 성공 (`--version`, `--today` 포함)
//! - 1: 인자 오류 또는 전송 실패
//! - 103: 설정 파일을 읽을 수 없음
//! - 104: API 키 없음

use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use eztracker::client::{
    config_path, exit_code, ActivityEvent, ClientConfig, ClientConfigError, IngestClient,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_PLUGIN: &str = concat!("eztracker-cli/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Parser)]
#[command(name = "eztracker-cli", disable_version_flag = true)]
struct Cli {
    /// 활동이 일어난 파일 경로
    #[arg(long)]
    entity: Option<String>,

    /// epoch 초 (소수점 허용)
    #[arg(long)]
    time: Option<String>,

    #[arg(long)]
    language: Option<String>,

    #[arg(long)]
    alternate_language: Option<String>,

    /// 저장 이벤트에서 나온 하트비트
    #[arg(long)]
    write: bool,

    /// user-agent 형식의 플러그인 식별자
    #[arg(long, default_value = DEFAULT_PLUGIN)]
    plugin: String,

    #[arg(long, default_value_t = 0.0)]
    duration: f64,

    /// 나머지 하트비트의 JSON 배열
    #[arg(long)]
    extra_heartbeats: Option<String>,

    /// 오늘의 합계 (아직 지원하지 않음)
    #[arg(long)]
    today: bool,

    #[arg(long)]
    version: bool,

    #[arg(long)]
    debug: bool,

    /// 기본값 `~/.eztracker.cfg` 대신 읽을 설정 파일
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help는 정상 종료입니다.
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(exit_code::FAILURE as u8)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    if let Some(message) = informational(&cli) {
        println!("{message}");
        return ExitCode::SUCCESS;
    }

    let loaded = load_config(&cli, |key| std::env::var(key).ok());
    let debug = cli.debug || loaded.as_ref().is_ok_and(|config| config.debug);
    init_logging(debug);

    let config = match loaded {
        Ok(config) => config,
        Err(e) => return config_failure(e),
    };

    let events = match build_events(&cli) {
        Ok(events) => events,
        Err(e) => {
            tracing::error!("{:#}", e);
            return ExitCode::from(exit_code::FAILURE as u8);
        }
    };

    match send(&config, &events, &cli.plugin).await {
        Ok(sent) => {
            tracing::debug!(sent, "Done");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("Failed to send heartbeats: {:#}", e);
            ExitCode::from(exit_code::FAILURE as u8)
        }
    }
}

fn init_logging(debug: bool) {
    let default = if debug { "eztracker=debug" } else { "eztracker=warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// 설정도 하트비트도 필요 없는 플래그의 출력
fn informational(cli: &Cli) -> Option<String> {
    if cli.version {
        Some(format!("eztracker-cli v{}", env!("CARGO_PKG_VERSION")))
    } else if cli.today {
        Some("not implemented".to_string())
    } else {
        None
    }
}

fn load_config<F>(cli: &Cli, lookup: F) -> Result<ClientConfig, ClientConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match &cli.config {
        Some(path) => ClientConfig::load_from(path, lookup),
        None => {
            let path = config_path().ok_or(ClientConfigError::NoHome)?;
            ClientConfig::load_from(&path, lookup)
        }
    }
}

fn config_failure(e: ClientConfigError) -> ExitCode {
    // 로그는 stderr로 나갑니다.
    tracing::error!("{}", e);
    ExitCode::from(config_exit_code(&e))
}

// 종료 코드는 0..=255 범위입니다.
fn config_exit_code(e: &ClientConfigError) -> u8 {
    u8::try_from(e.exit_code()).unwrap_or(exit_code::FAILURE as u8)
}

/// 플래그로 받은 primary와 JSON으로 받은 extra를 순서대로 합칩니다.
fn build_events(cli: &Cli) -> anyhow::Result<Vec<ActivityEvent>> {
    let entity = cli
        .entity
        .clone()
        .ok_or_else(|| anyhow::anyhow!("--entity is required"))?;
    let time = cli
        .time
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("--time is required"))?;
    let timestamp: f64 = time
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid --time: {time}"))?;

    let mut events = vec![ActivityEvent {
        entity,
        timestamp,
        language: cli.language.clone().unwrap_or_default(),
        alternate_language: cli.alternate_language.clone().unwrap_or_default(),
        is_write: cli.write,
        plugin: cli.plugin.clone(),
        duration: cli.duration,
    }];

    if let Some(extra) = &cli.extra_heartbeats {
        let extra: Vec<ActivityEvent> = serde_json::from_str(extra)
            .map_err(|e| anyhow::anyhow!("invalid --extra-heartbeats: {e}"))?;
        events.extend(extra);
    }

    Ok(events)
}

async fn send(config: &ClientConfig, events: &[ActivityEvent], plugin: &str) -> anyhow::Result<usize> {
    let client = IngestClient::new(&config.server_url, config.api_key.clone())?;
    tracing::debug!(endpoint = client.endpoint(), count = events.len(), "Sending heartbeats");
    Ok(client.send_events(events, &config.user_id, plugin).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("eztracker-cli").chain(args.iter().copied())).unwrap()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn version_and_today_answer_without_config_or_entity() {
        assert_eq!(
            informational(&cli(&["--version"])).as_deref(),
            Some(concat!("eztracker-cli v", env!("CARGO_PKG_VERSION")))
        );
        assert_eq!(
            informational(&cli(&["--today", "--config", "/nonexistent/.eztracker.cfg"])).as_deref(),
            Some("not implemented")
        );
        assert!(informational(&cli(&["--entity", "/a.rs", "--time", "1"])).is_none());
    }

    #[test]
    fn entity_and_time_are_required() {
        let err = build_events(&cli(&["--time", "1700000000"])).unwrap_err();
        assert!(err.to_string().contains("--entity"));

        let err = build_events(&cli(&["--entity", "/a.rs"])).unwrap_err();
        assert!(err.to_string().contains("--time"));
    }

    #[test]
    fn malformed_time_or_extra_heartbeats_is_rejected() {
        let err = build_events(&cli(&["--entity", "/a.rs", "--time", "yesterday"])).unwrap_err();
        assert!(err.to_string().contains("invalid --time"));

        let err = build_events(&cli(&[
            "--entity",
            "/a.rs",
            "--time",
            "1700000000",
            "--extra-heartbeats",
            "[{\"entity\":",
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("invalid --extra-heartbeats"));
    }

    #[test]
    fn primary_heartbeat_precedes_extras_in_order() {
        let events = build_events(&cli(&[
            "--entity",
            "/p/main.rs",
            "--time",
            "1700000000.5",
            "--language",
            "rust",
            "--write",
            "--plugin",
            "vim-eztracker/1.0",
            "--duration",
            "30",
            "--extra-heartbeats",
            r#"[{"entity":"/p/a.rs","timestamp":1700000001,"duration":5},{"entity":"/p/b.rs","timestamp":1700000002,"duration":6}]"#,
        ]))
        .unwrap();

        let entities: Vec<_> = events.iter().map(|e| e.entity.as_str()).collect();
        assert_eq!(entities, ["/p/main.rs", "/p/a.rs", "/p/b.rs"]);

        let primary = &events[0];
        assert_eq!(primary.timestamp, 1_700_000_000.5);
        assert_eq!(primary.language, "rust");
        assert!(primary.is_write);
        assert_eq!(primary.plugin, "vim-eztracker/1.0");
        assert_eq!(primary.duration, 30.0);
        assert_eq!(events[2].duration, 6.0);
    }

    #[test]
    fn config_errors_keep_their_exit_codes() {
        let dir = tempfile::tempdir().unwrap();

        let absent = dir.path().join("absent.cfg");
        let absent = absent.to_str().unwrap();
        let err = load_config(&cli(&["--config", absent]), no_env).unwrap_err();
        assert_eq!(config_exit_code(&err), 104);

        // 디렉토리는 설정 파일로 읽을 수 없습니다.
        let unreadable = dir.path().to_str().unwrap();
        let err = load_config(&cli(&["--config", unreadable]), |key| {
            (key == "API_KEY").then(|| "k".to_string())
        })
        .unwrap_err();
        assert_eq!(config_exit_code(&err), 103);

        assert_eq!(config_exit_code(&ClientConfigError::NoHome), 103);
    }

    #[test]
    fn env_api_key_is_enough_without_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let absent = dir.path().join("absent.cfg");

        let config = load_config(&cli(&["--config", absent.to_str().unwrap()]), |key| {
            (key == "API_KEY").then(|| "k".to_string())
        })
        .unwrap();
        assert_eq!(config.api_key, "k");
    }
}
