//! # 활동 코얼레서 (Activity Coalescer)
//!
//! 에디터 한 세션의 편집/포커스/저장 이벤트를 받아서, 그 이벤트가 보낼 만한
//! 하트비트인지 결정하고 버퍼에 쌓습니다.
//!
//! ## 상태 기계
//! ```text
//! IDLE ──활동──▶ FOCUSED(file) ──다른 파일──▶ FOCUSED(file')
//!                   │  ▲
//!                   └──┘ 같은 파일: heartbeat_frequency가 지나야 새 하트비트
//! WRITE 이벤트는 어떤 상태에서든 즉시 하트비트를 만듭니다.
//! ```
//!
//! ## 하트비트를 만드는 조건 (하나라도 참이면)
//! - 저장(write) 이벤트
//! - 마지막 하트비트 이후 `heartbeat_frequency`가 지남 (파일과 무관)
//! - 마지막으로 기록된 파일과 다른 파일
//!
//! 같은 파일에 이어지는 하트비트의 duration은 `now - last_heartbeat_at`이고,
//! 파일이 바뀌었거나 이전 하트비트가 없으면 0입니다.
//! duration이 0인 하트비트도 버퍼에는 들어가지만 네트워크로는 나가지 않습니다 ([`ShimBatch`]).
//!
//! 버퍼는 `send_buffer` 간격마다 한꺼번에 비워서 [`HeartbeatSink`]로 넘깁니다.
//! 전송에 실패한 하트비트는 다시 넣지 않고 버립니다.

use std::{mem, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use regex::Regex;

use super::{
    config::{state_path, ClientConfig},
    language::{detect_language, is_primary_language},
    ActivityEvent, HeartbeatSink, LocalState, ShimBatch, SinkError, StateStore,
};
use crate::clock::{epoch_seconds, Clock};

/// 아직 보내지 않은 하트비트 한 건
#[derive(Debug, Clone, PartialEq)]
pub struct PendingHeartbeat {
    pub entity: String,
    /// epoch 초
    pub time: f64,
    pub is_write: bool,
    pub duration: f64,
    pub language: String,
}

impl PendingHeartbeat {
    /// 와이어 이벤트로 바꿉니다. `forth`만 `language`로, 나머지 언어는 `alternate_language`로 갑니다.
    pub fn to_event(&self, plugin: &str) -> ActivityEvent {
        let (language, alternate_language) = if is_primary_language(&self.language) {
            (self.language.clone(), String::new())
        } else {
            (String::new(), self.language.clone())
        };

        ActivityEvent {
            entity: self.entity.clone(),
            timestamp: self.time,
            language,
            alternate_language,
            is_write: self.is_write,
            plugin: plugin.to_string(),
            duration: self.duration,
        }
    }
}

/// 새 하트비트를 만든 이유
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatReason {
    Write,
    FileChanged,
    Elapsed,
}

/// `on_activity` 한 번의 결과
#[derive(Debug, Clone, PartialEq)]
pub enum Activity {
    /// 첫 설정이 끝나지 않아서 버림 (큐에 넣지도, 재시도하지도 않음)
    Uninitialized,
    /// 스크래치/터미널/이름 없는 버퍼 또는 무시 패턴
    Ignored,
    /// 같은 파일에 대한 포커스가 이어지는 중이라 하트비트를 만들지 않음
    Coalesced,
    Buffered {
        reason: HeartbeatReason,
        duration: f64,
    },
}

/// 활동을 무시할 파일 이름 규칙
pub struct IgnoreRules {
    patterns: Vec<Regex>,
}

impl IgnoreRules {
    /// 컴파일할 수 없는 패턴은 경고만 남기고 건너뜁니다.
    pub fn new(patterns: &[String]) -> Self {
        let patterns = patterns
            .iter()
            .filter_map(|pattern| match Regex::new(pattern) {
                Ok(regex) => Some(regex),
                Err(e) => {
                    tracing::warn!(pattern = %pattern, "Skipping invalid ignore pattern: {}", e);
                    None
                }
            })
            .collect();
        Self { patterns }
    }

    pub fn is_ignored(&self, file: &str) -> bool {
        file.trim().is_empty()
            || file.starts_with("term:")
            || file.contains("MiniBufExplorer")
            || file == "--NO NAME--"
            || self.patterns.iter().any(|regex| regex.is_match(file))
    }
}

pub struct Coalescer {
    initialized: bool,
    heartbeat_frequency: Duration,
    send_buffer: Duration,
    ignore: IgnoreRules,
    plugin: String,
    state: StateStore,
    buffer: Vec<PendingHeartbeat>,
    last_sent: DateTime<Utc>,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn HeartbeatSink>,
}

impl Coalescer {
    /// 설정 전 상태의 코얼레서를 만듭니다. [`Coalescer::initialize`]가 성공하기 전까지 모든 활동은 버려집니다.
    pub fn new(
        state: StateStore,
        sink: Arc<dyn HeartbeatSink>,
        clock: Arc<dyn Clock>,
        plugin: impl Into<String>,
    ) -> Self {
        let defaults = ClientConfig::default();
        Self {
            initialized: false,
            heartbeat_frequency: defaults.heartbeat_frequency,
            send_buffer: defaults.send_buffer,
            ignore: IgnoreRules::new(&defaults.ignore_patterns),
            plugin: plugin.into(),
            state,
            buffer: Vec::new(),
            last_sent: clock.now(),
            clock,
            sink,
        }
    }

    /// 사용자 설정과 shim 바이너리로 코얼레서를 만들고 바로 초기화를 시도합니다.
    ///
    /// 설정을 읽지 못하면 경고를 남기고 설정 전 상태로 둡니다.
    pub fn from_environment(clock: Arc<dyn Clock>, plugin: impl Into<String>) -> Self {
        let path = state_path()
            .unwrap_or_else(|| std::env::temp_dir().join("eztracker_last_heartbeat"));
        let loaded = ClientConfig::load();
        let cli_path = loaded
            .as_ref()
            .map(|config| config.cli_path.clone())
            .unwrap_or_else(|_| super::config::DEFAULT_CLI_PATH.to_string());

        let mut coalescer = Self::new(
            StateStore::new(path, ClientConfig::default().cache_ttl),
            Arc::new(super::CommandSink::new(cli_path)),
            clock,
            plugin,
        );
        match loaded {
            Ok(config) => {
                coalescer.initialize(&config);
            }
            Err(e) => tracing::warn!("Eztracker is not set up: {}", e),
        }
        coalescer
    }

    /// 설정을 반영합니다. API 키가 있어야 초기화된 것으로 봅니다.
    pub fn initialize(&mut self, config: &ClientConfig) -> bool {
        self.heartbeat_frequency = config.heartbeat_frequency;
        self.send_buffer = config.send_buffer;
        self.ignore = IgnoreRules::new(&config.ignore_patterns);
        self.state.set_ttl(config.cache_ttl);
        self.initialized = !config.api_key.trim().is_empty();
        tracing::debug!(initialized = self.initialized, "Coalescer configured");
        self.initialized
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn pending(&self) -> &[PendingHeartbeat] {
        &self.buffer
    }

    /// 버퍼 진입, 유휴 타임아웃, 저장 이벤트마다 호출됩니다.
    pub async fn on_activity(&mut self, file: &str, language: &str, is_write: bool) -> Activity {
        if !self.initialized {
            return Activity::Uninitialized;
        }
        if self.ignore.is_ignored(file) {
            tracing::debug!(file, "Ignoring file");
            return Activity::Ignored;
        }

        let now = self.clock.now();
        let now_secs = epoch_seconds(now);
        let last = self.state.load(now).await;

        let same_file = last.last_file.as_deref() == Some(file);
        let elapsed = now_secs - last.last_heartbeat_at;

        let reason = if is_write {
            Some(HeartbeatReason::Write)
        } else if !same_file {
            Some(HeartbeatReason::FileChanged)
        } else if elapsed > self.heartbeat_frequency.as_secs_f64() {
            Some(HeartbeatReason::Elapsed)
        } else {
            None
        };

        let activity = match reason {
            Some(reason) => {
                let duration = if same_file && last.has_heartbeat() {
                    elapsed.max(0.0)
                } else {
                    0.0
                };

                self.buffer.push(PendingHeartbeat {
                    entity: file.to_string(),
                    time: now_secs,
                    is_write,
                    duration,
                    language: language.to_string(),
                });

                let next = LocalState {
                    last_activity_at: now_secs,
                    last_heartbeat_at: now_secs,
                    last_file: Some(file.to_string()),
                };
                if let Err(e) = self.state.save(next, now).await {
                    tracing::warn!("Failed to persist heartbeat state: {}", e);
                }

                tracing::debug!(file, ?reason, duration, "Buffered heartbeat");
                Activity::Buffered { reason, duration }
            }
            None => Activity::Coalesced,
        };

        if self.send_due(now) {
            if let Err(e) = self.flush().await {
                tracing::warn!("Dropped buffered heartbeats: {}", e);
            }
        }

        activity
    }

    /// 언어를 에디터 스코프와 확장자로 판별한 뒤 [`Coalescer::on_activity`]로 넘깁니다.
    pub async fn on_buffer_activity(
        &mut self,
        file: &str,
        scope: Option<&str>,
        is_write: bool,
    ) -> Activity {
        let language = detect_language(scope, file);
        self.on_activity(file, &language, is_write).await
    }

    /// 파일 내용이 바뀔 때 호출됩니다. 활동 시각만 갱신하고 하트비트는 만들지 않습니다.
    pub async fn on_modified(&mut self, file: &str) {
        if !self.initialized || self.ignore.is_ignored(file) {
            return;
        }

        let now = self.clock.now();
        let mut state = self.state.load(now).await;
        state.last_activity_at = epoch_seconds(now);
        if let Err(e) = self.state.save(state, now).await {
            tracing::warn!("Failed to persist activity state: {}", e);
        }
    }

    fn send_due(&self, now: DateTime<Utc>) -> bool {
        if self.buffer.is_empty() {
            return false;
        }
        match (now - self.last_sent).to_std() {
            Ok(since) => since > self.send_buffer,
            Err(_) => false,
        }
    }

    /// 버퍼를 전부 비우고 보낼 수 있는 하트비트를 sink로 넘깁니다. 넘긴 개수를 돌려줍니다.
    ///
    /// 실패해도 버퍼는 이미 비워진 상태이며, API 키 에러면 다시 설정될 때까지 활동을 받지 않습니다.
    pub async fn flush(&mut self) -> Result<usize, SinkError> {
        let drained = mem::take(&mut self.buffer);
        self.last_sent = self.clock.now();

        let events = drained.iter().map(|pending| pending.to_event(&self.plugin));
        let Some(batch) = ShimBatch::from_events(events) else {
            tracing::debug!(buffered = drained.len(), "No heartbeat with a duration to send");
            return Ok(0);
        };

        let count = batch.count();
        match self.sink.deliver(batch).await {
            Ok(()) => {
                tracing::debug!(count, "Sent heartbeats");
                Ok(count)
            }
            Err(SinkError::ApiKey) => {
                self.initialized = false;
                Err(SinkError::ApiKey)
            }
            Err(e) => Err(e),
        }
    }
}
