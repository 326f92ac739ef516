//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Name of the built-in aggregation endpoint.
pub const RESOURCE_WITH_SUBSCRIBERS: &str = "resource-with-subscribers";

/// Root configuration for the event proxy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Upstream API settings (token, headers, timeouts).
    pub upstream: UpstreamConfig,

    /// Commands accepted in request text (e.g. "GET").
    pub allowed_commands: Vec<String>,

    /// Endpoint names accepted in request text.
    pub allowed_endpoints: Vec<String>,

    /// Endpoint definitions keyed by endpoint name.
    pub endpoints: BTreeMap<String, EndpointConfig>,

    /// Response cache settings.
    pub cache: CacheConfig,

    /// Timeout configuration for the HTTP front-end.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub admin: AdminConfig,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        let mut endpoints = BTreeMap::new();
        endpoints.insert(
            RESOURCE_WITH_SUBSCRIBERS.to_string(),
            EndpointConfig {
                kind: EndpointKind::ResourceWithSubscribers,
                uris: vec![
                    "https://demo.calendar42.com/api/v2/events/{0}/".to_string(),
                    "https://demo.calendar42.com/api/v2/event-subscriptions/?event_ids=[{0}]".to_string(),
                ],
            },
        );

        Self {
            listener: ListenerConfig::default(),
            upstream: UpstreamConfig::default(),
            allowed_commands: vec!["GET".to_string()],
            allowed_endpoints: vec![RESOURCE_WITH_SUBSCRIBERS.to_string()],
            endpoints,
            cache: CacheConfig::default(),
            timeouts: TimeoutConfig::default(),
            observability: ObservabilityConfig::default(),
            admin: AdminConfig::default(),
        }
    }
}

impl ProxyConfig {
    /// Headers attached to every upstream call.
    ///
    /// The fixed JSON headers come first; `extra_headers` may override them.
    pub fn request_headers(&self) -> BTreeMap<String, String> {
        let mut headers = BTreeMap::new();
        headers.insert("Accept".to_string(), "application/json".to_string());
        headers.insert("Content-type".to_string(), "application/json".to_string());
        if !self.upstream.api_token.is_empty() {
            headers.insert(
                "Authorization".to_string(),
                format!("Token {}", self.upstream.api_token),
            );
        }
        for (name, value) in &self.upstream.extra_headers {
            headers.insert(name.clone(), value.clone());
        }
        headers
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Upstream API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// API token sent as `Authorization: Token <api_token>`.
    pub api_token: String,

    /// Additional headers sent with every upstream call.
    pub extra_headers: BTreeMap<String, String>,

    /// Total time allowed for one upstream call in seconds.
    pub request_timeout_secs: u64,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_token: String::new(),
            extra_headers: BTreeMap::new(),
            request_timeout_secs: 30,
            connect_timeout_secs: 5,
        }
    }
}

/// Aggregation strategy behind an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointKind {
    /// Primary resource plus its subscription list.
    ResourceWithSubscribers,
}

/// Endpoint definition.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EndpointConfig {
    /// Strategy used to resolve the endpoint.
    pub kind: EndpointKind,

    /// Upstream URI templates; `{0}` is replaced by the endpoint parameter.
    pub uris: Vec<String>,
}

/// Response cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Entry time-to-live in seconds (4.2 minutes by default).
    pub ttl_secs: u64,

    /// Optional upper bound on the number of cached responses.
    pub max_entries: Option<usize>,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 252,
            max_entries: None,
        }
    }
}

/// Timeout configuration for the HTTP front-end.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 60 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin routes.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
        }
    }
}
