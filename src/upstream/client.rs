//! Upstream HTTP client with timeout and error handling.
//!
//! # Responsibilities
//! - Reject malformed or non-HTTP URIs before any network activity
//! - Perform one GET with the request's headers
//! - Classify reqwest errors into transport failures
//! - Decode the response body as JSON

use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use url::Url;

use crate::config::UpstreamConfig;
use crate::observability::metrics;
use crate::request::Headers;
use crate::upstream::types::{TransportError, UpstreamOutcome};

/// Performs single retrieval calls against the upstream API.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// GET `uri` with `headers`. Never panics and never returns an error:
    /// every failure is folded into the outcome.
    async fn fetch(&self, uri: &str, headers: &Headers) -> UpstreamOutcome;
}

/// Production [`Upstream`] backed by a pooled reqwest client.
#[derive(Clone)]
pub struct HttpUpstream {
    client: Client,
    timeout: Duration,
}

impl HttpUpstream {
    /// Create a client with the configured request and connect timeouts.
    pub fn new(config: &UpstreamConfig) -> Result<Self, reqwest::Error> {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;

        Ok(Self { client, timeout })
    }

    fn parse_uri(uri: &str) -> Result<Url, TransportError> {
        let url = Url::parse(uri).map_err(|e| TransportError::InvalidUri {
            uri: uri.to_string(),
            reason: e.to_string(),
        })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(TransportError::InvalidUri {
                uri: uri.to_string(),
                reason: format!("unsupported scheme '{}'", other),
            }),
        }
    }

    fn classify(uri: &str, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout { uri: uri.to_string() }
        } else if err.is_connect() {
            TransportError::Connect {
                uri: uri.to_string(),
                reason: err.to_string(),
            }
        } else {
            TransportError::Other {
                uri: uri.to_string(),
                reason: err.to_string(),
            }
        }
    }

    async fn send(&self, uri: &str, headers: &Headers) -> Result<UpstreamOutcome, TransportError> {
        let url = Self::parse_uri(uri)?;

        let mut request = self.client.get(url);
        for (name, value) in headers.iter() {
            request = request.header(name, value);
        }

        let response = request.send().await.map_err(|e| Self::classify(uri, e))?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| Self::classify(uri, e))?;

        let payload = match serde_json::from_slice(&body) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(uri = %uri, status, error = %e, "Upstream body is not valid JSON");
                None
            }
        };

        Ok(UpstreamOutcome::Http { status, payload })
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn fetch(&self, uri: &str, headers: &Headers) -> UpstreamOutcome {
        let start = Instant::now();
        let outcome = match self.send(uri, headers).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(error = %e, "Upstream transport failure");
                UpstreamOutcome::Failed(e)
            }
        };

        tracing::debug!(uri = %uri, outcome = outcome.label(), elapsed = ?start.elapsed(), "Upstream call finished");
        metrics::record_upstream_call(outcome.label(), start);
        outcome
    }
}

impl std::fmt::Debug for HttpUpstream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpUpstream")
            .field("timeout", &self.timeout)
            .finish()
    }
}
