//! # shim 호출
//!
//! 코얼레서가 비운 버퍼를 `eztracker-cli` 한 번의 실행으로 넘깁니다.
//! 첫 번째 하트비트는 개별 인자(`--entity`, `--time`, ...)로, 나머지는
//! `--extra-heartbeats`에 JSON 배열로 실어 보냅니다.
//!
//! 종료 코드 104(API 키 없음)와 103(설정 해석 실패)은 별도의 에러로 구분해서
//! 에디터가 다르게 반응할 수 있게 합니다.

use std::{io, path::PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

use super::{exit_code, ActivityEvent};

/// 한 번의 shim 실행에 실리는 하트비트 묶음. duration이 0인 이벤트는 들어 있지 않습니다.
#[derive(Debug, Clone, PartialEq)]
pub struct ShimBatch {
    pub primary: ActivityEvent,
    pub extra: Vec<ActivityEvent>,
}

impl ShimBatch {
    /// duration이 0인 이벤트를 버리고, 남은 것 중 첫 번째를 primary로 올립니다.
    /// 보낼 것이 하나도 없으면 None입니다.
    pub fn from_events(events: impl IntoIterator<Item = ActivityEvent>) -> Option<Self> {
        let mut events = events.into_iter().filter(ActivityEvent::is_transmittable);
        let primary = events.next()?;
        Some(Self {
            primary,
            extra: events.collect(),
        })
    }

    pub fn count(&self) -> usize {
        1 + self.extra.len()
    }
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("shim binary not found: {0}")]
    NotFound(String),
    #[error("failed to run shim: {0}")]
    Spawn(#[source] io::Error),
    #[error("shim could not find an API key")]
    ApiKey,
    #[error("shim could not parse its config: {0}")]
    ConfigParse(String),
    #[error("shim exited with {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },
    #[error("failed to encode extra heartbeats: {0}")]
    Encode(#[from] serde_json::Error),
}

/// 코얼레서가 하트비트 묶음을 넘기는 곳
#[async_trait]
pub trait HeartbeatSink: Send + Sync + 'static {
    async fn deliver(&self, batch: ShimBatch) -> Result<(), SinkError>;
}

/// shim 바이너리를 자식 프로세스로 실행하는 기본 sink
pub struct CommandSink {
    program: PathBuf,
}

impl CommandSink {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// shim에 넘길 인자 목록
    pub fn arguments(batch: &ShimBatch) -> Result<Vec<String>, SinkError> {
        let primary = &batch.primary;
        let mut args = vec![
            "--entity".to_string(),
            primary.entity.clone(),
            "--time".to_string(),
            primary.timestamp.to_string(),
            "--plugin".to_string(),
            primary.plugin.clone(),
            "--duration".to_string(),
            primary.duration.to_string(),
        ];

        if primary.is_write {
            args.push("--write".to_string());
        }
        if !primary.language.is_empty() {
            args.push("--language".to_string());
            args.push(primary.language.clone());
        } else if !primary.alternate_language.is_empty() {
            args.push("--alternate-language".to_string());
            args.push(primary.alternate_language.clone());
        }
        if !batch.extra.is_empty() {
            args.push("--extra-heartbeats".to_string());
            args.push(serde_json::to_string(&batch.extra)?);
        }

        Ok(args)
    }
}

#[async_trait]
impl HeartbeatSink for CommandSink {
    async fn deliver(&self, batch: ShimBatch) -> Result<(), SinkError> {
        let args = Self::arguments(&batch)?;
        tracing::debug!(program = %self.program.display(), count = batch.count(), "Running shim");

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .await
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => SinkError::NotFound(self.program.display().to_string()),
                _ => SinkError::Spawn(e),
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        match output.status.code() {
            Some(exit_code::SUCCESS) => {
                tracing::debug!(
                    "Shim output: {}",
                    String::from_utf8_lossy(&output.stdout).trim()
                );
                Ok(())
            }
            Some(exit_code::API_KEY_ERROR) => Err(SinkError::ApiKey),
            Some(exit_code::CONFIG_PARSE_ERROR) => Err(SinkError::ConfigParse(stderr)),
            code => Err(SinkError::Failed { code, stderr }),
        }
    }
}
