//! Shared two-call fetch helpers.

use serde::de::DeserializeOwned;
use serde_json::Value;
use url::form_urlencoded;

use crate::aggregate::types::AggregationError;
use crate::config::validation::PARAM_PLACEHOLDER;
use crate::request::Headers;
use crate::upstream::{Upstream, UpstreamOutcome};

/// Substitute the percent-encoded endpoint parameter into a URI template.
///
/// Only ASCII alphanumerics and `*-._` pass through unencoded, so the
/// parameter cannot add path segments, a query or a fragment.
pub fn expand_template(template: &str, param: &str) -> String {
    template.replace(PARAM_PLACEHOLDER, &encode_param(param))
}

fn encode_param(param: &str) -> String {
    // form encoding turns spaces into '+', which is literal inside a path
    form_urlencoded::byte_serialize(param.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// Require a 200 outcome carrying a JSON body.
pub fn require_ok(uri: &str, outcome: UpstreamOutcome) -> Result<Value, AggregationError> {
    match outcome {
        UpstreamOutcome::Http { status: 200, payload: Some(payload) } => Ok(payload),
        UpstreamOutcome::Http { status: 200, payload: None } => Err(AggregationError::MalformedPayload {
            uri: uri.to_string(),
            reason: "body is not valid JSON".to_string(),
        }),
        UpstreamOutcome::Http { status, .. } => Err(AggregationError::UpstreamStatus {
            uri: uri.to_string(),
            status,
        }),
        UpstreamOutcome::Failed(e) => Err(AggregationError::Transport(e)),
    }
}

/// Decode a JSON payload into a typed record.
pub fn decode<T: DeserializeOwned>(uri: &str, payload: Value) -> Result<T, AggregationError> {
    serde_json::from_value(payload).map_err(|e| AggregationError::MalformedPayload {
        uri: uri.to_string(),
        reason: e.to_string(),
    })
}

/// Fetch two URIs concurrently; both must answer 200 with JSON.
///
/// When both fail, the first URI's error is reported.
pub async fn fetch_pair(
    upstream: &dyn Upstream,
    first: &str,
    second: &str,
    headers: &Headers,
) -> Result<(Value, Value), AggregationError> {
    let (a, b) = tokio::join!(upstream.fetch(first, headers), upstream.fetch(second, headers));
    let a = require_ok(first, a)?;
    let b = require_ok(second, b)?;
    Ok((a, b))
}
