//! HTTP Backend Implementation
//!
//! Talks to the Zelf agent server.
//!
//! # API
//!
//! - `POST /chat/stream` - One turn; the response body is an SSE-style stream
//!   of `data: <json>` lines
//! - `GET /health` - Liveness probe

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;

use super::traits::{AgentBackend, ChunkStream};
use crate::config::ConductorConfig;
use crate::error::ConductorError;
use crate::messages::ChatRequest;

/// HTTP backend client
#[derive(Clone, Debug)]
pub struct HttpBackend {
    /// Streaming endpoint URL
    stream_url: String,
    /// Health endpoint URL
    health_url: String,
    /// HTTP client
    http_client: reqwest::Client,
}

impl HttpBackend {
    /// Create a backend from configuration
    ///
    /// # Errors
    ///
    /// Fails if the configuration is invalid or the HTTP client cannot be built.
    pub fn new(config: &ConductorConfig) -> Result<Self, ConductorError> {
        config.validate()?;

        let mut builder = reqwest::Client::builder().connect_timeout(config.connect_timeout());
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            stream_url: config.stream_url(),
            health_url: config.health_url(),
            http_client: builder.build()?,
        })
    }

    /// Create from environment variables
    ///
    /// # Errors
    ///
    /// See [`HttpBackend::new`].
    pub fn from_env() -> Result<Self, ConductorError> {
        Self::new(&ConductorConfig::from_env())
    }

    /// Streaming endpoint URL
    #[must_use]
    pub fn stream_url(&self) -> &str {
        &self.stream_url
    }

    /// Build the request for one turn without sending it
    #[must_use]
    pub fn build_request(&self, request: &ChatRequest) -> reqwest::RequestBuilder {
        self.http_client
            .post(&self.stream_url)
            .header(ACCEPT, "text/event-stream")
            .json(request)
    }
}

#[async_trait]
impl AgentBackend for HttpBackend {
    fn name(&self) -> &'static str {
        "Http"
    }

    async fn health_check(&self) -> bool {
        match self
            .http_client
            .get(&self.health_url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, url = %self.health_url, "Health check failed");
                false
            }
        }
    }

    async fn open_stream(&self, request: &ChatRequest) -> Result<ChunkStream, ConductorError> {
        tracing::debug!(
            url = %self.stream_url,
            messages = request.messages.len(),
            has_location = request.location.is_some(),
            "Opening agent stream"
        );

        let response = self.build_request(request).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(ConductorError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let chunks = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(ConductorError::from));
        Ok(Box::pin(chunks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{Location, Message, WireMessage};

    #[test]
    fn test_build_request() {
        let config = ConductorConfig::default().with_base_url("http://agent.local:8000/");
        let backend = HttpBackend::new(&config).unwrap();
        let request = ChatRequest {
            messages: vec![WireMessage::from(&Message::user("hi"))],
            location: Some(Location::new(52.37, 4.9)),
        };

        let http_request = backend.build_request(&request).build().unwrap();
        assert_eq!(http_request.method(), "POST");
        assert_eq!(
            http_request.url().as_str(),
            "http://agent.local:8000/chat/stream"
        );
        assert_eq!(
            http_request.headers()[ACCEPT].to_str().unwrap(),
            "text/event-stream"
        );

        let body = http_request.body().and_then(|b| b.as_bytes()).unwrap();
        let json: serde_json::Value = serde_json::from_slice(body).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["location"]["lat"], 52.37);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = ConductorConfig::default().with_base_url("agent.local");
        assert!(matches!(
            HttpBackend::new(&config),
            Err(ConductorError::Config(_))
        ));
    }
}
