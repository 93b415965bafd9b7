//! # 전송 shim의 HTTP 클라이언트
//!
//! 하트비트 하나당 `POST {server_url}/heartbeat` 한 번입니다.
//! 재시도하지 않습니다. 한 건이라도 실패하면 호출한 쪽(shim)이 0이 아닌 코드로 끝납니다.

use std::time::Duration;

use reqwest::{header::USER_AGENT, Client};
use thiserror::Error;

use super::ActivityEvent;
use crate::models::Heartbeat;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("server responded {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

pub struct IngestClient {
    http: Client,
    endpoint: String,
    api_key: String,
}

impl IngestClient {
    pub fn new(server_url: &str, api_key: impl Into<String>) -> Result<Self, TransportError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(TransportError::Client)?;

        Ok(Self {
            http,
            endpoint: format!("{}/heartbeat", server_url.trim_end_matches('/')),
            api_key: api_key.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// 하트비트 한 건을 보냅니다. 2xx가 아니면 상태 코드와 본문을 담은 에러입니다.
    pub async fn send(&self, heartbeat: &Heartbeat, user_agent: &str) -> Result<(), TransportError> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header(USER_AGENT, user_agent)
            .json(heartbeat)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status { status, body });
        }

        tracing::debug!(entity = %heartbeat.file_path, %status, "Heartbeat delivered");
        Ok(())
    }

    /// 이벤트를 순서대로 보내고 보낸 개수를 돌려줍니다. duration이 0인 이벤트는 건너뜁니다.
    ///
    /// 이벤트에 플러그인 문자열이 없으면 `default_plugin`을 User-Agent로 씁니다.
    pub async fn send_events(
        &self,
        events: &[ActivityEvent],
        user_id: &str,
        default_plugin: &str,
    ) -> Result<usize, TransportError> {
        let mut sent = 0;
        for event in events.iter().filter(|event| event.is_transmittable()) {
            let user_agent = if event.plugin.is_empty() {
                default_plugin
            } else {
                event.plugin.as_str()
            };
            self.send(&event.to_heartbeat(user_id), user_agent).await?;
            sent += 1;
        }
        Ok(sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_without_double_slash() {
        let client = IngestClient::new("http://localhost:8080/", "k").unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8080/heartbeat");

        let client = IngestClient::new("http://srv:1", "k").unwrap();
        assert_eq!(client.endpoint(), "http://srv:1/heartbeat");
    }

    #[tokio::test]
    async fn zero_duration_events_are_not_sent() {
        // 연결할 수 없는 주소여도 보낼 것이 없으면 요청 자체가 없습니다.
        let client = IngestClient::new("http://127.0.0.1:9", "k").unwrap();
        let event = ActivityEvent {
            entity: "/x/demo/main.go".into(),
            timestamp: 1.0,
            language: String::new(),
            alternate_language: "go".into(),
            is_write: false,
            plugin: String::new(),
            duration: 0.0,
        };

        assert_eq!(client.send_events(&[event], "u1", "p").await.unwrap(), 0);
    }
}
