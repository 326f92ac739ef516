//! Parsed request types and decoding errors.

use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Upstream request headers, shared by every request an engine parses.
pub type Headers = Arc<BTreeMap<String, String>>;

/// A decoded request: what to do, against which endpoint, for which resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRequest {
    /// Operation name (e.g. "GET").
    pub command: String,
    /// Aggregation endpoint name.
    pub endpoint: String,
    /// Resource identifier substituted into upstream URI templates.
    pub endpoint_param: String,
    /// Headers sent with every upstream call for this request.
    pub headers: Headers,
}

/// Errors produced while decoding or validating request text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// The text did not split into exactly `command : uri`.
    #[error("malformed command: expected '<command> : /<endpoint>/<param>/'")]
    MalformedCommand,

    /// The URI did not contain exactly two non-empty segments.
    #[error("malformed uri '{0}': expected /<endpoint>/<param>/")]
    MalformedUri(String),

    /// The command is not in the allow-list.
    #[error("invalid command '{0}'")]
    InvalidCommand(String),

    /// The endpoint is not in the allow-list.
    #[error("invalid endpoint '{0}'")]
    InvalidEndpoint(String),
}
