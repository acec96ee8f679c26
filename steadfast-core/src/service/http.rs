use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION};
use serde::Deserialize;

use crate::config::schema::ServiceConfig;
use crate::error::{Error, Result};
use crate::prompts::AgentProfile;
use crate::service::retry::{send_with_retry, RetryPolicy};
use crate::service::sse::event_stream;
use crate::service::types::{AgentService, EventStream};

/// Agent gateway spoken to over HTTP, with responses streamed as SSE.
#[derive(Debug)]
pub struct HttpAgentService {
    client: reqwest::Client,
    base_url: String,
    session_id: String,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct OpenSessionResponse {
    session_id: String,
}

impl HttpAgentService {
    /// Opens a remote session configured with `profile`.
    pub async fn connect(config: &ServiceConfig, profile: &AgentProfile) -> Result<Self> {
        let client = build_client(config)?;
        let base_url = config.base_url.trim_end_matches('/').to_owned();
        let retry = RetryPolicy::default();

        let response = send_with_retry(
            client.post(format!("{base_url}/sessions")).json(profile),
            &retry,
            "open session",
        )
        .await?;
        let response = ensure_success(response, "open session").await?;
        let opened: OpenSessionResponse = response.json().await.map_err(|err| {
            Error::Service(format!("failed to parse open-session response: {err}"))
        })?;

        tracing::info!(session_id = %opened.session_id, model = %profile.model, "remote session opened");
        Ok(Self {
            client,
            base_url,
            session_id: opened.session_id,
            retry,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/sessions/{}/{action}", self.base_url, self.session_id)
    }
}

#[async_trait]
impl AgentService for HttpAgentService {
    fn name(&self) -> &str {
        "http"
    }

    async fn query(&mut self, text: &str) -> Result<EventStream> {
        let response = self
            .client
            .post(self.endpoint("query"))
            .header(ACCEPT, "text/event-stream")
            .json(&serde_json::json!({ "prompt": text }))
            .send()
            .await
            .map_err(|err| Error::Transport(format!("query request failed: {err}")))?;
        let response = ensure_success(response, "query").await?;
        Ok(event_stream(response))
    }

    async fn interrupt(&mut self) -> Result<()> {
        let response = send_with_retry(
            self.client.post(self.endpoint("interrupt")),
            &self.retry,
            "interrupt",
        )
        .await?;
        ensure_success(response, "interrupt").await.map(|_| ())
    }

    async fn close(&mut self) -> Result<()> {
        let response = send_with_retry(
            self.client
                .delete(format!("{}/sessions/{}", self.base_url, self.session_id)),
            &self.retry,
            "close session",
        )
        .await?;
        ensure_success(response, "close session").await.map(|_| ())
    }
}

async fn ensure_success(response: reqwest::Response, operation: &str) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(status_error(operation, status, &body))
}

fn status_error(operation: &str, status: reqwest::StatusCode, body: &str) -> Error {
    Error::Service(format!("{operation} failed with status {status}: {}", body.trim()))
}

fn build_client(config: &ServiceConfig) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    if let Some(env_name) = config.api_key_env.as_deref() {
        if let Ok(key) = std::env::var(env_name) {
            let value = HeaderValue::from_str(&format!("Bearer {key}")).map_err(|err| {
                Error::Config(format!("invalid API key in {env_name}: {err}"))
            })?;
            headers.insert(AUTHORIZATION, value);
        }
    }

    for (name, value) in &config.extra_headers {
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|err| {
            Error::Config(format!("invalid custom header name '{name}': {err}"))
        })?;
        let header_value = HeaderValue::from_str(value).map_err(|err| {
            Error::Config(format!("invalid custom header value for '{name}': {err}"))
        })?;
        headers.insert(header_name, header_value);
    }

    // No overall request timeout; silence is policed by the inactivity watchdog.
    reqwest::Client::builder()
        .default_headers(headers)
        .connect_timeout(std::time::Duration::from_millis(config.connect_timeout_ms.max(1)))
        .build()
        .map_err(|err| Error::Config(format!("failed to build service client: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service_config(base_url: &str) -> ServiceConfig {
        ServiceConfig {
            base_url: base_url.to_owned(),
            ..ServiceConfig::default()
        }
    }

    #[test]
    fn endpoint_joins_base_session_and_action() {
        let service = HttpAgentService {
            client: reqwest::Client::new(),
            base_url: "http://gateway.local".to_owned(),
            session_id: "abc123".to_owned(),
            retry: RetryPolicy::default(),
        };

        assert_eq!(
            service.endpoint("interrupt"),
            "http://gateway.local/sessions/abc123/interrupt"
        );
        assert_eq!(service.session_id(), "abc123");
        assert_eq!(service.name(), "http");
    }

    #[test]
    fn status_error_names_operation_status_and_body() {
        let err = status_error(
            "interrupt",
            reqwest::StatusCode::SERVICE_UNAVAILABLE,
            "gateway draining\n",
        );

        match err {
            Error::Service(message) => assert_eq!(
                message,
                "interrupt failed with status 503 Service Unavailable: gateway draining"
            ),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn build_client_accepts_custom_headers() {
        let mut config = service_config("http://localhost:8787");
        config.api_key_env = None;
        config.extra_headers = vec![("x-team".to_owned(), "resilience".to_owned())];

        assert!(build_client(&config).is_ok());
    }

    #[test]
    fn build_client_rejects_invalid_header_name() {
        let mut config = service_config("http://localhost:8787");
        config.api_key_env = None;
        config.extra_headers = vec![("bad header".to_owned(), "x".to_owned())];

        let err = build_client(&config).expect_err("space in header name");
        assert!(matches!(err, Error::Config(message) if message.contains("bad header")));
    }

    #[test]
    fn build_client_rejects_invalid_header_value() {
        let mut config = service_config("http://localhost:8787");
        config.api_key_env = None;
        config.extra_headers = vec![("x-trace".to_owned(), "line\nbreak".to_owned())];

        let err = build_client(&config).expect_err("newline in header value");
        assert!(matches!(err, Error::Config(message) if message.contains("x-trace")));
    }
}
