//! # 로컬 활동 상태
//!
//! 에디터 세션이 소유하는 작은 캐시입니다: 마지막 파일, 마지막 활동 시각, 마지막 하트비트 시각.
//! 디스크 파일은 프로세스 재시작을 넘겨주는 용도이며, 여러 세션이 함께 쓰는 저장소가 아닙니다.
//! 잠금 없이 읽고 쓰므로 나중에 쓴 쪽이 이깁니다.
//!
//! 파일 형식 (줄바꿈 구분 세 필드):
//! ```text
//! <last_activity_at epoch 초>
//! <last_heartbeat_at epoch 초>
//! <last_file 경로>
//! ```

use std::{io, path::PathBuf, time::Duration};

use chrono::{DateTime, Utc};
use tokio::fs;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalState {
    pub last_activity_at: f64,
    pub last_heartbeat_at: f64,
    pub last_file: Option<String>,
}

impl LocalState {
    /// 세 줄 형식을 해석합니다. 숫자를 읽을 수 없으면 None입니다.
    pub fn parse(text: &str) -> Option<Self> {
        let mut lines = text.lines();
        let last_activity_at = lines.next()?.trim().parse().ok()?;
        let last_heartbeat_at = lines.next()?.trim().parse().ok()?;
        let last_file = lines
            .next()
            .map(str::trim)
            .filter(|file| !file.is_empty())
            .map(str::to_string);

        Some(Self {
            last_activity_at,
            last_heartbeat_at,
            last_file,
        })
    }

    pub fn render(&self) -> String {
        format!(
            "{}\n{}\n{}\n",
            self.last_activity_at,
            self.last_heartbeat_at,
            self.last_file.as_deref().unwrap_or_default()
        )
    }

    /// 이전 하트비트가 기록된 적이 있는지
    pub fn has_heartbeat(&self) -> bool {
        self.last_file.is_some() && self.last_heartbeat_at > 0.0
    }
}

/// 디스크 상태 파일 앞에 TTL 캐시를 둔 저장소
pub struct StateStore {
    path: PathBuf,
    ttl: Duration,
    cached: Option<(LocalState, DateTime<Utc>)>,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            path: path.into(),
            ttl,
            cached: None,
        }
    }

    pub fn set_ttl(&mut self, ttl: Duration) {
        self.ttl = ttl;
    }

    /// 캐시가 TTL 안이면 캐시를, 아니면 디스크에서 다시 읽은 값을 돌려줍니다.
    ///
    /// 파일이 없거나 깨져 있으면 빈 상태로 시작합니다.
    pub async fn load(&mut self, now: DateTime<Utc>) -> LocalState {
        if let Some((state, loaded_at)) = &self.cached {
            if matches!((now - *loaded_at).to_std(), Ok(age) if age < self.ttl) {
                return state.clone();
            }
        }

        let state = match fs::read_to_string(&self.path).await {
            Ok(text) => LocalState::parse(&text).unwrap_or_else(|| {
                tracing::warn!(path = %self.path.display(), "Ignoring malformed state file");
                LocalState::default()
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => LocalState::default(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "Failed to read state file: {}", e);
                LocalState::default()
            }
        };

        self.cached = Some((state.clone(), now));
        state
    }

    /// 캐시를 갱신하고 디스크에 씁니다. 쓰기에 실패해도 캐시는 새 값을 유지합니다.
    pub async fn save(&mut self, state: LocalState, now: DateTime<Utc>) -> io::Result<()> {
        let text = state.render();
        self.cached = Some((state, now));

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&self.path, text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, TimeZone};

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(seconds, 0).unwrap()
    }

    #[test]
    fn parses_three_line_format() {
        let state = LocalState::parse("1700000000.5\n1699999990.25\n/x/demo/main.go\n").unwrap();
        assert_eq!(state.last_activity_at, 1_700_000_000.5);
        assert_eq!(state.last_heartbeat_at, 1_699_999_990.25);
        assert_eq!(state.last_file.as_deref(), Some("/x/demo/main.go"));
        assert_eq!(LocalState::parse(&state.render()), Some(state));

        assert_eq!(LocalState::parse("garbage"), None);
    }

    #[tokio::test]
    async fn missing_file_is_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = StateStore::new(dir.path().join("state"), Duration::from_secs(10));

        let state = store.load(at(100)).await;
        assert_eq!(state, LocalState::default());
        assert!(!state.has_heartbeat());
    }

    #[tokio::test]
    async fn cache_is_reread_after_ttl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state");
        let mut store = StateStore::new(&path, Duration::from_secs(10));

        let written = LocalState {
            last_activity_at: 100.0,
            last_heartbeat_at: 100.0,
            last_file: Some("/a/b.rs".into()),
        };
        store.save(written.clone(), at(100)).await.unwrap();

        // 다른 세션이 파일을 덮어씁니다.
        let other = LocalState {
            last_file: Some("/c/d.rs".into()),
            ..written.clone()
        };
        std::fs::write(&path, other.render()).unwrap();

        assert_eq!(store.load(at(105)).await, written);
        assert_eq!(
            store.load(at(100) + ChronoDuration::seconds(11)).await,
            other
        );
    }
}
