//! Proxy response and error types.

use serde_json::Value;
use thiserror::Error;

use crate::aggregate::AggregationError;
use crate::request::RequestError;

pub const STATUS_OK: u16 = 200;
pub const STATUS_BAD_REQUEST: u16 = 400;
/// Fixed status for any failed upstream aggregation.
pub const STATUS_AGGREGATION_FAILED: u16 = 401;
pub const STATUS_NOT_IMPLEMENTED: u16 = 501;

/// Everything that can stop a request from producing a payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProxyError {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("no aggregator registered for endpoint '{0}'")]
    NoAggregator(String),

    #[error(transparent)]
    Aggregation(#[from] AggregationError),
}

impl ProxyError {
    /// Status code reported to the caller.
    pub fn status_code(&self) -> u16 {
        match self {
            ProxyError::Request(_) => STATUS_BAD_REQUEST,
            ProxyError::NoAggregator(_) => STATUS_NOT_IMPLEMENTED,
            ProxyError::Aggregation(e) if e.is_unsupported() => STATUS_NOT_IMPLEMENTED,
            ProxyError::Aggregation(_) => STATUS_AGGREGATION_FAILED,
        }
    }

    /// Whether a response carrying this error is stored in the cache.
    pub fn is_cacheable(&self) -> bool {
        self.status_code() == STATUS_AGGREGATION_FAILED
    }
}

/// Outcome of one proxy request.
///
/// `payload` is present exactly when `status` is 200.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyResponse {
    /// Serialized JSON document.
    pub payload: Option<String>,
    pub status: u16,
    /// Internal diagnostic behind a non-200 status.
    pub error: Option<ProxyError>,
}

impl ProxyResponse {
    pub fn ok(payload: String) -> Self {
        Self {
            payload: Some(payload),
            status: STATUS_OK,
            error: None,
        }
    }

    pub fn failed(error: ProxyError) -> Self {
        Self {
            payload: None,
            status: error.status_code(),
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == STATUS_OK
    }

    pub fn is_cacheable(&self) -> bool {
        match &self.error {
            None => true,
            Some(e) => e.is_cacheable(),
        }
    }

    /// Payload parsed back into a JSON value.
    pub fn payload_json(&self) -> Option<Value> {
        self.payload
            .as_deref()
            .and_then(|p| serde_json::from_str(p).ok())
    }
}

/// A response plus whether it came from the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    pub response: ProxyResponse,
    pub served_from_cache: bool,
}
