//! HTTP client for the backend service.

use std::time::Duration;

use reqwest::Client;
use thiserror::Error;
use tracing::info;

use super::types::ForwardPayload;
use crate::config::Config;

/// Longest backend response body kept for logging.
const BODY_PREVIEW_CHARS: usize = 200;

/// Reasons a forward did not reach a successful backend response.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("backend URL is not configured")]
    NotConfigured,

    #[error("failed to serialize forward payload: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("backend did not answer within {0:?}")]
    Timeout(Duration),

    #[error("backend request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("backend returned status {status}")]
    Status { status: u16, body_preview: String },
}

/// Result of a successful forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForwardOutcome {
    pub status: u16,
}

/// Posts text messages to the backend with a bounded timeout.
///
/// Cloning is cheap; clones share one connection pool.
#[derive(Clone)]
pub struct Forwarder {
    client: Client,
    url: Option<String>,
    api_key: Option<String>,
    timeout: Duration,
}

impl Forwarder {
    /// Build a forwarder with its own connection pool.
    ///
    /// Fails only if the TLS backend cannot be initialized.
    pub fn new(url: Option<String>, api_key: Option<String>, timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            url,
            api_key,
            timeout,
        })
    }

    pub fn from_config(config: &Config) -> reqwest::Result<Self> {
        Self::new(
            config.scf_api_url.clone(),
            config.scf_api_key.clone(),
            config.forward_timeout(),
        )
    }

    /// Send one payload to the backend. Never retries.
    ///
    /// Only 2xx counts as success; any other status is reported with a
    /// short preview of the response body.
    pub async fn forward(&self, payload: &ForwardPayload) -> Result<ForwardOutcome, ForwardError> {
        let url = self.url.as_deref().ok_or(ForwardError::NotConfigured)?;

        let body = serde_json::to_vec(payload)?;

        info!(
            openid = %payload.openid,
            text_length = payload.text.len(),
            has_msg_id = payload.msg_id.is_some(),
            has_api_key = self.api_key.is_some(),
            timeout_ms = self.timeout.as_millis() as u64,
            "scf_forward_starting"
        );

        let mut request = self
            .client
            .post(url)
            .timeout(self.timeout)
            .header("Content-Type", "application/json")
            .body(body);

        if let Some(key) = &self.api_key {
            request = request.header("X-API-Key", key.as_str());
        }

        let response = request.send().await.map_err(|e| self.classify(e))?;
        let status = response.status().as_u16();

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ForwardError::Status {
                status,
                body_preview: text.chars().take(BODY_PREVIEW_CHARS).collect(),
            });
        }

        info!(status_code = status, "scf_forward_complete");

        Ok(ForwardOutcome { status })
    }

    fn classify(&self, error: reqwest::Error) -> ForwardError {
        if error.is_timeout() {
            ForwardError::Timeout(self.timeout)
        } else {
            ForwardError::Request(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use wiremock::{
        matchers::{body_json, header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn payload() -> ForwardPayload {
        ForwardPayload {
            openid: "oUser42".to_string(),
            text: "hello".to_string(),
            msg_type: "text".to_string(),
            ts: 1700000000,
            msg_id: Some("24000000000000001".to_string()),
        }
    }

    #[tokio::test]
    async fn test_forward_not_configured() {
        let forwarder = Forwarder::new(None, None, Duration::from_secs(5)).unwrap();

        let result = forwarder.forward(&payload()).await;
        assert!(matches!(result, Err(ForwardError::NotConfigured)));
    }

    #[tokio::test]
    async fn test_from_config_without_url() {
        let config = Config::from_lookup(|_| None);
        let forwarder = Forwarder::from_config(&config).unwrap();

        assert_eq!(forwarder.timeout, Duration::from_millis(5000));
        assert!(matches!(
            forwarder.forward(&payload()).await,
            Err(ForwardError::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn test_forward_success_sends_json_and_api_key() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/reply"))
            .and(header("content-type", "application/json"))
            .and(header("x-api-key", "key123"))
            .and(body_json(payload()))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let forwarder = Forwarder::new(
            Some(format!("{}/reply", mock_server.uri())),
            Some("key123".to_string()),
            Duration::from_secs(5),
        )
        .unwrap();

        let outcome = forwarder.forward(&payload()).await.unwrap();
        assert_eq!(outcome.status, 200);
    }

    #[tokio::test]
    async fn test_forward_without_api_key_omits_header() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&mock_server)
            .await;

        let forwarder = Forwarder::new(Some(mock_server.uri()), None, Duration::from_secs(5)).unwrap();
        let outcome = forwarder.forward(&payload()).await.unwrap();
        assert_eq!(outcome.status, 204);

        let requests = mock_server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].headers.get("x-api-key").is_none());
    }

    #[tokio::test]
    async fn test_forward_non_success_status() {
        let mock_server = MockServer::start().await;
        let long_body = "x".repeat(500);

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string(long_body))
            .mount(&mock_server)
            .await;

        let forwarder = Forwarder::new(Some(mock_server.uri()), None, Duration::from_secs(5)).unwrap();

        match forwarder.forward(&payload()).await {
            Err(ForwardError::Status { status, body_preview }) => {
                assert_eq!(status, 502);
                assert_eq!(body_preview.len(), BODY_PREVIEW_CHARS);
            }
            other => panic!("Expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_forward_redirect_is_not_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(304))
            .mount(&mock_server)
            .await;

        let forwarder = Forwarder::new(Some(mock_server.uri()), None, Duration::from_secs(5)).unwrap();
        let result = forwarder.forward(&payload()).await;
        assert!(matches!(result, Err(ForwardError::Status { status: 304, .. })));
    }

    #[tokio::test]
    async fn test_forward_timeout() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&mock_server)
            .await;

        let timeout = Duration::from_millis(200);
        let forwarder = Forwarder::new(Some(mock_server.uri()), None, timeout).unwrap();

        let started = Instant::now();
        let result = forwarder.forward(&payload()).await;

        assert!(matches!(result, Err(ForwardError::Timeout(t)) if t == timeout));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_forward_unreachable() {
        let forwarder = Forwarder::new(
            Some("http://127.0.0.1:1/hook".to_string()),
            None,
            Duration::from_secs(2),
        )
        .unwrap();

        let result = forwarder.forward(&payload()).await;
        assert!(matches!(
            result,
            Err(ForwardError::Request(_)) | Err(ForwardError::Timeout(_))
        ));
    }
}
