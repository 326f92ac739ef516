//! Upstream call outcomes.

use serde_json::Value;
use thiserror::Error;

/// Why an upstream call produced no HTTP response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The URI could not be parsed or uses an unsupported scheme.
    #[error("invalid uri '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    /// The call exceeded the configured timeout.
    #[error("upstream request to '{uri}' timed out")]
    Timeout { uri: String },

    /// The destination could not be reached.
    #[error("cannot connect to '{uri}': {reason}")]
    Connect { uri: String, reason: String },

    /// Any other client-side failure (bad header, body read error, ...).
    #[error("upstream request to '{uri}' failed: {reason}")]
    Other { uri: String, reason: String },
}

/// Result of one upstream call.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamOutcome {
    /// The upstream answered. `payload` is `None` when the body is not JSON.
    Http { status: u16, payload: Option<Value> },
    /// No HTTP response was obtained.
    Failed(TransportError),
}

impl UpstreamOutcome {
    /// Successful outcome carrying a JSON body.
    pub fn ok(payload: Value) -> Self {
        UpstreamOutcome::Http {
            status: 200,
            payload: Some(payload),
        }
    }

    /// Numeric HTTP status, if the upstream answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            UpstreamOutcome::Http { status, .. } => Some(*status),
            UpstreamOutcome::Failed(_) => None,
        }
    }

    /// Metric label for this outcome.
    pub fn label(&self) -> &'static str {
        match self {
            UpstreamOutcome::Http { status, .. } if *status == 200 => "ok",
            UpstreamOutcome::Http { .. } => "http_error",
            UpstreamOutcome::Failed(TransportError::InvalidUri { .. }) => "invalid_uri",
            UpstreamOutcome::Failed(TransportError::Timeout { .. }) => "timeout",
            UpstreamOutcome::Failed(TransportError::Connect { .. }) => "connect_error",
            UpstreamOutcome::Failed(TransportError::Other { .. }) => "transport_error",
        }
    }
}
