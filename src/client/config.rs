//! # 클라이언트 설정
//!
//! 기본값 → 환경변수 → `~/.eztracker.cfg` 순서로 덮어씁니다.
//!
//! ```text
//! [settings]
//! api_key = ...
//! server_url = http://localhost:8080
//! debug = true
//! heartbeat_frequency = 2      ; 분
//! send_buffer_seconds = 30
//! cache_ttl_seconds = 10
//! user_id = alice
//! cli_path = eztracker-cli
//! ```
//!
//! 파일이 없으면 그냥 넘어가지만, 있는데 읽을 수 없으면 `ConfigParse` 에러(종료 코드 103)입니다.
//! 모두 합친 뒤에도 API 키가 비어 있으면 `MissingApiKey`(종료 코드 104)입니다.

use std::{
    env, io,
    path::{Path, PathBuf},
    time::Duration,
};

use thiserror::Error;

use super::exit_code;

pub const CONFIG_FILE_NAME: &str = ".eztracker.cfg";
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080";
pub const DEFAULT_CLI_PATH: &str = "eztracker-cli";

#[derive(Debug, Error)]
pub enum ClientConfigError {
    #[error("could not determine the home directory")]
    NoHome,
    #[error("failed to read config file {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("API key not found in config or environment")]
    MissingApiKey,
}

impl ClientConfigError {
    pub fn exit_code(&self) -> i32 {
        match self {
            ClientConfigError::MissingApiKey => exit_code::API_KEY_ERROR,
            ClientConfigError::NoHome | ClientConfigError::Read { .. } => {
                exit_code::CONFIG_PARSE_ERROR
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_key: String,
    pub server_url: String,
    pub debug: bool,
    /// 서버 하트비트의 `user_id`
    pub user_id: String,
    /// 같은 파일에 계속 머물 때 하트비트를 다시 만드는 최소 간격
    pub heartbeat_frequency: Duration,
    /// 버퍼를 shim으로 넘기는 최소 간격
    pub send_buffer: Duration,
    /// 메모리의 로컬 상태를 파일에서 다시 읽기 전까지 믿는 시간
    pub cache_ttl: Duration,
    pub cli_path: String,
    /// 파일 이름에 대해 검사하는 정규식. 하나라도 맞으면 활동을 무시합니다.
    pub ignore_patterns: Vec<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            server_url: DEFAULT_SERVER_URL.to_string(),
            debug: false,
            user_id: default_user_id(),
            heartbeat_frequency: Duration::from_secs(2 * 60),
            send_buffer: Duration::from_secs(30),
            cache_ttl: Duration::from_secs(10),
            cli_path: DEFAULT_CLI_PATH.to_string(),
            ignore_patterns: vec![
                r"COMMIT_EDITMSG$".to_string(),
                r"PULLREQ_EDITMSG$".to_string(),
                r"MERGE_MSG$".to_string(),
                r"TAG_EDITMSG$".to_string(),
            ],
        }
    }
}

fn default_user_id() -> String {
    env::var("USER")
        .or_else(|_| env::var("USERNAME"))
        .ok()
        .filter(|user| !user.is_empty())
        .unwrap_or_else(|| "anonymous".to_string())
}

pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_FILE_NAME))
}

/// 로컬 상태 파일 위치 (`~/.eztracker/last_heartbeat`)
pub fn state_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".eztracker").join("last_heartbeat"))
}

impl ClientConfig {
    /// 실제 환경변수와 홈 디렉토리의 설정 파일을 읽습니다.
    pub fn load() -> Result<Self, ClientConfigError> {
        let path = config_path().ok_or(ClientConfigError::NoHome)?;
        Self::load_from(&path, |key| env::var(key).ok())
    }

    pub fn load_from<F>(path: &Path, lookup: F) -> Result<Self, ClientConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        config.apply_env(lookup);

        match std::fs::read_to_string(path) {
            Ok(text) => config.apply_file(&text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(ClientConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }

        if config.api_key.trim().is_empty() {
            return Err(ClientConfigError::MissingApiKey);
        }
        Ok(config)
    }

    fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.is_empty());

        if let Some(api_key) = get("API_KEY") {
            self.api_key = api_key;
        }
        if let Some(server_url) = get("EZTRACKER_SERVER_URL") {
            self.server_url = server_url;
        }
        if get("EZTRACKER_DEBUG").as_deref() == Some("true") {
            self.debug = true;
        }
        if let Some(user_id) = get("EZTRACKER_USER_ID") {
            self.user_id = user_id;
        }
    }

    /// INI 형식 텍스트에서 `[settings]` 구간의 값만 반영합니다. 알 수 없는 키와 잘못된 값은 무시합니다.
    pub fn apply_file(&mut self, text: &str) {
        let mut section = String::new();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if line.starts_with('[') && line.ends_with(']') {
                section = line.trim_matches(|c| c == '[' || c == ']').to_string();
                continue;
            }
            if section != "settings" {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim();

            match key.trim() {
                "api_key" => self.api_key = value.to_string(),
                "server_url" => self.server_url = value.to_string(),
                "debug" => self.debug = value.eq_ignore_ascii_case("true"),
                "user_id" if !value.is_empty() => self.user_id = value.to_string(),
                "cli_path" if !value.is_empty() => self.cli_path = value.to_string(),
                "heartbeat_frequency" => {
                    if let Some(frequency) = parse_seconds(value, 60.0) {
                        self.heartbeat_frequency = frequency;
                    }
                }
                "send_buffer_seconds" => {
                    if let Some(interval) = parse_seconds(value, 1.0) {
                        self.send_buffer = interval;
                    }
                }
                "cache_ttl_seconds" => {
                    if let Some(ttl) = parse_seconds(value, 1.0) {
                        self.cache_ttl = ttl;
                    }
                }
                _ => {}
            }
        }
    }
}

fn parse_seconds(value: &str, unit: f64) -> Option<Duration> {
    let amount: f64 = value.parse().ok()?;
    Duration::try_from_secs_f64(amount * unit).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn file_overrides_environment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &path,
            "# comment\n[other]\napi_key = wrong\n[settings]\napi_key = from-file\nheartbeat_frequency = 0.5\nsend_buffer_seconds = 5\ncache_ttl_seconds = 3\nuser_id = alice\nbogus line\n",
        )
        .unwrap();

        let config = ClientConfig::load_from(
            &path,
            env_of(&[("API_KEY", "from-env"), ("EZTRACKER_SERVER_URL", "http://srv:1")]),
        )
        .unwrap();

        assert_eq!(config.api_key, "from-file");
        assert_eq!(config.server_url, "http://srv:1");
        assert_eq!(config.user_id, "alice");
        assert_eq!(config.heartbeat_frequency, Duration::from_secs(30));
        assert_eq!(config.send_buffer, Duration::from_secs(5));
        assert_eq!(config.cache_ttl, Duration::from_secs(3));
    }

    #[test]
    fn missing_file_uses_environment() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig::load_from(
            &dir.path().join("absent.cfg"),
            env_of(&[("API_KEY", "k"), ("EZTRACKER_DEBUG", "true")]),
        )
        .unwrap();

        assert_eq!(config.api_key, "k");
        assert!(config.debug);
        assert_eq!(config.heartbeat_frequency, Duration::from_secs(120));
    }

    #[test]
    fn missing_api_key_maps_to_its_own_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let err = ClientConfig::load_from(&dir.path().join("absent.cfg"), env_of(&[])).unwrap_err();

        assert!(matches!(err, ClientConfigError::MissingApiKey));
        assert_eq!(err.exit_code(), exit_code::API_KEY_ERROR);
    }

    #[test]
    fn unreadable_file_is_a_config_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        // 디렉토리는 문자열로 읽을 수 없습니다.
        let err = ClientConfig::load_from(dir.path(), env_of(&[("API_KEY", "k")])).unwrap_err();

        assert!(matches!(err, ClientConfigError::Read { .. }));
        assert_eq!(err.exit_code(), exit_code::CONFIG_PARSE_ERROR);
    }

    #[test]
    fn invalid_frequency_is_ignored() {
        let mut config = ClientConfig::default();
        config.apply_file("[settings]\nheartbeat_frequency = soon\n");
        assert_eq!(config.heartbeat_frequency, Duration::from_secs(120));
    }
}
