//! Aggregation error types.

use thiserror::Error;

use crate::upstream::TransportError;

/// The retrieval command, the only one endpoints implement today.
pub const RETRIEVE_COMMAND: &str = "GET";

/// Why an endpoint could not produce a payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregationError {
    /// The command is allowed but the endpoint does not implement it.
    #[error("command '{command}' is not supported by endpoint '{endpoint}'")]
    UnsupportedOperation { command: String, endpoint: String },

    /// An upstream call answered with something other than 200.
    #[error("upstream '{uri}' answered with status {status}")]
    UpstreamStatus { uri: String, status: u16 },

    /// An upstream call produced no HTTP response.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// An upstream call answered 200 with a body of the wrong shape.
    #[error("unexpected payload from '{uri}': {reason}")]
    MalformedPayload { uri: String, reason: String },
}

impl AggregationError {
    pub fn is_unsupported(&self) -> bool {
        matches!(self, AggregationError::UnsupportedOperation { .. })
    }
}
