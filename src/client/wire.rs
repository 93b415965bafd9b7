//! # 에디터 → shim 이벤트 스키마
//!
//! 에디터 플러그인이 shim에 넘기는 이벤트 형식과, shim이 서버에 보내는
//! [`Heartbeat`] 형식 사이의 변환을 담당합니다.
//!
//! 언어 결정 규칙: 명시적인 `language`가 있으면 그 값, 없으면 `alternate_language`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::models::Heartbeat;

/// 프로젝트를 경로에서 알아낼 수 없을 때 쓰는 이름
pub const UNKNOWN_PROJECT: &str = "unknown";

/// 에디터에서 발생한 활동 한 건. `--extra-heartbeats` JSON 배열의 원소이기도 합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    /// 파일 경로
    pub entity: String,
    /// epoch 초 (소수점 이하 포함)
    pub timestamp: f64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub language: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub alternate_language: String,
    #[serde(default)]
    pub is_write: bool,
    /// user-agent 형식의 플러그인 식별자 (예: "eztracker-sublime/0.1.0")
    #[serde(default)]
    pub plugin: String,
    /// 같은 파일에 머문 시간 (초)
    #[serde(default)]
    pub duration: f64,
}

impl ActivityEvent {
    pub fn resolved_language(&self) -> &str {
        if !self.language.is_empty() {
            &self.language
        } else {
            &self.alternate_language
        }
    }

    /// duration이 정확히 0인 이벤트는 네트워크로 보내지 않습니다.
    pub fn is_transmittable(&self) -> bool {
        self.duration != 0.0
    }

    pub fn to_heartbeat(&self, user_id: &str) -> Heartbeat {
        Heartbeat {
            user_id: user_id.to_string(),
            project: project_from_path(&self.entity),
            language: self.resolved_language().to_string(),
            file_path: self.entity.clone(),
            duration: self.duration,
            timestamp: self.timestamp as i64,
        }
    }
}

/// 파일이 들어 있는 디렉토리의 이름을 프로젝트 이름으로 씁니다.
///
/// `/x/demo/main.go` → `demo`. 디렉토리가 없으면 [`UNKNOWN_PROJECT`].
pub fn project_from_path(entity: &str) -> String {
    Path::new(entity)
        .parent()
        .and_then(Path::file_name)
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .unwrap_or(UNKNOWN_PROJECT)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(language: &str, alternate: &str) -> ActivityEvent {
        ActivityEvent {
            entity: "/x/demo/main.go".into(),
            timestamp: 1_700_000_000.75,
            language: language.into(),
            alternate_language: alternate.into(),
            is_write: false,
            plugin: "test/0".into(),
            duration: 12.5,
        }
    }

    #[test]
    fn explicit_language_wins() {
        assert_eq!(event("forth", "go").resolved_language(), "forth");
        assert_eq!(event("", "go").resolved_language(), "go");
        assert_eq!(event("", "").resolved_language(), "");
    }

    #[test]
    fn project_is_parent_directory() {
        assert_eq!(project_from_path("/x/demo/main.go"), "demo");
        assert_eq!(project_from_path("main.go"), UNKNOWN_PROJECT);
        assert_eq!(project_from_path("/main.go"), UNKNOWN_PROJECT);
    }

    #[test]
    fn converts_to_server_heartbeat() {
        let heartbeat = event("", "go").to_heartbeat("u1");
        assert_eq!(
            heartbeat,
            Heartbeat {
                user_id: "u1".into(),
                project: "demo".into(),
                language: "go".into(),
                file_path: "/x/demo/main.go".into(),
                duration: 12.5,
                timestamp: 1_700_000_000,
            }
        );
    }

    #[test]
    fn extra_heartbeats_json_omits_empty_language_fields() {
        let json = serde_json::to_value(event("", "go")).unwrap();
        assert!(json.get("language").is_none());
        assert_eq!(json["alternate_language"], "go");

        let parsed: ActivityEvent =
            serde_json::from_str(r#"{"entity":"/a/b.rs","timestamp":1.5}"#).unwrap();
        assert_eq!(parsed.duration, 0.0);
        assert!(!parsed.is_transmittable());
    }
}
