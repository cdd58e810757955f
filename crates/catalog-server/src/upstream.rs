//! Client for the upstream movie catalog (TMDb).

use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use catalog_core::UpstreamRequest;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::UpstreamConfig;
use crate::payload::Payload;

/// Ways an upstream call can fail.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// No response was obtained (connect, TLS, timeout, broken body stream).
    #[error("upstream request failed: {0}")]
    Transport(String),

    /// The upstream answered with a non-success status.
    #[error("upstream responded with status {0}")]
    Status(StatusCode),

    /// The upstream answered 2xx with a body that is not JSON.
    #[error("upstream returned a non-JSON body: {0}")]
    Decode(String),
}

impl UpstreamError {
    /// Status returned to the client for this failure.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Status(status) => *status,
            Self::Transport(_) | Self::Decode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Status(_) => "status",
            Self::Decode(_) => "decode",
        }
    }
}

/// Source of truth consulted on a cache miss.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// Issue exactly one request. No retries.
    async fn fetch(&self, request: &UpstreamRequest) -> Result<Payload, UpstreamError>;
}

/// reqwest-based TMDb client.
///
/// Every request carries `api_key` and `language` followed by the
/// query-specific parameters.
#[derive(Clone)]
pub struct TmdbClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    language: String,
}

impl TmdbClient {
    pub fn from_config(config: &UpstreamConfig) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("catalog-server/", env!("CARGO_PKG_VERSION")));
        if let Some(ms) = config.timeout_ms {
            builder = builder.timeout(Duration::from_millis(ms));
        }
        Ok(Self {
            http: builder.build()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            language: config.language.clone(),
        })
    }

    fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }
}

#[async_trait]
impl UpstreamClient for TmdbClient {
    #[instrument(skip(self, request), fields(endpoint = request.endpoint))]
    async fn fetch(&self, request: &UpstreamRequest) -> Result<Payload, UpstreamError> {
        let mut params: Vec<(&str, &str)> = Vec::with_capacity(request.params.len() + 2);
        params.push(("api_key", self.api_key.as_str()));
        params.push(("language", self.language.as_str()));
        params.extend(request.params.iter().map(|(k, v)| (*k, v.as_str())));

        let response = self
            .http
            .get(self.endpoint_url(request.endpoint))
            .query(&params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    UpstreamError::Transport("request timed out".to_string())
                } else if e.is_connect() {
                    UpstreamError::Transport(format!("failed to connect: {}", e.without_url()))
                } else {
                    UpstreamError::Transport(e.without_url().to_string())
                }
            })?;

        let status = response.status();
        debug!(status = %status, "upstream responded");
        if !status.is_success() {
            return Err(UpstreamError::Status(status));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| UpstreamError::Transport(format!("failed to read body: {}", e.without_url())))?;

        Payload::from_slice(&body).map_err(|e| UpstreamError::Decode(e.to_string()))
    }
}
