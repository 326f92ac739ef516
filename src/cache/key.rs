//! Composite cache key.

use std::fmt;

use crate::request::ParsedRequest;

/// Identifies one cached response by endpoint and endpoint parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub endpoint: String,
    pub param: String,
}

impl CacheKey {
    pub fn new(endpoint: impl Into<String>, param: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            param: param.into(),
        }
    }

    pub fn for_request(request: &ParsedRequest) -> Self {
        Self::new(request.endpoint.as_str(), request.endpoint_param.as_str())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.endpoint, self.param)
    }
}
