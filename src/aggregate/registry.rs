//! Endpoint name → aggregation strategy registry.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::aggregate::resource_with_subscribers::ResourceWithSubscribers;
use crate::aggregate::types::AggregationError;
use crate::config::{EndpointKind, ProxyConfig};
use crate::request::ParsedRequest;
use crate::upstream::Upstream;

/// Resolves one endpoint into a serialized JSON payload.
#[async_trait]
pub trait Aggregator: Send + Sync {
    async fn resolve(&self, request: &ParsedRequest) -> Result<String, AggregationError>;
}

/// Maps endpoint names to their aggregators.
#[derive(Clone, Default)]
pub struct AggregatorRegistry {
    aggregators: HashMap<String, Arc<dyn Aggregator>>,
}

impl AggregatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build aggregators for every configured endpoint.
    ///
    /// Endpoints whose templates do not fit their kind are skipped with an
    /// error log; validation normally rejects such configs first.
    pub fn from_config(config: &ProxyConfig, upstream: Arc<dyn Upstream>) -> Self {
        let mut registry = Self::new();
        for (name, endpoint) in &config.endpoints {
            match endpoint.kind {
                EndpointKind::ResourceWithSubscribers => {
                    match ResourceWithSubscribers::from_uris(upstream.clone(), &endpoint.uris) {
                        Some(aggregator) => registry.register(name.as_str(), aggregator),
                        None => tracing::error!(
                            endpoint = %name,
                            uris = endpoint.uris.len(),
                            "Endpoint needs exactly two uri templates, not registered"
                        ),
                    }
                }
            }
        }
        registry
    }

    /// Register (or replace) the aggregator for `endpoint`.
    pub fn register(&mut self, endpoint: impl Into<String>, aggregator: impl Aggregator + 'static) {
        self.register_arc(endpoint, Arc::new(aggregator));
    }

    pub fn register_arc(&mut self, endpoint: impl Into<String>, aggregator: Arc<dyn Aggregator>) {
        self.aggregators.insert(endpoint.into(), aggregator);
    }

    pub fn get(&self, endpoint: &str) -> Option<Arc<dyn Aggregator>> {
        self.aggregators.get(endpoint).cloned()
    }

    /// Registered endpoint names, sorted.
    pub fn endpoints(&self) -> Vec<String> {
        let mut names: Vec<String> = self.aggregators.keys().cloned().collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for AggregatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregatorRegistry")
            .field("endpoints", &self.endpoints())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EndpointConfig, RESOURCE_WITH_SUBSCRIBERS};
    use crate::upstream::mock::MockUpstream;

    struct Echo;

    #[async_trait]
    impl Aggregator for Echo {
        async fn resolve(&self, request: &ParsedRequest) -> Result<String, AggregationError> {
            Ok(format!("\"{}\"", request.endpoint_param))
        }
    }

    #[test]
    fn test_from_config() {
        let mut config = ProxyConfig::default();
        config.endpoints.insert(
            "broken".into(),
            EndpointConfig {
                kind: EndpointKind::ResourceWithSubscribers,
                uris: vec!["http://a/{0}".into()],
            },
        );

        let registry = AggregatorRegistry::from_config(&config, Arc::new(MockUpstream::new()));
        assert_eq!(registry.endpoints(), vec![RESOURCE_WITH_SUBSCRIBERS.to_string()]);
        assert!(registry.get("broken").is_none());
    }

    #[tokio::test]
    async fn test_register_custom_endpoint() {
        let mut registry = AggregatorRegistry::new();
        registry.register("echo", Echo);

        let aggregator = registry.get("echo").unwrap();
        let request = ParsedRequest {
            command: "GET".into(),
            endpoint: "echo".into(),
            endpoint_param: "7".into(),
            headers: Default::default(),
        };
        assert_eq!(aggregator.resolve(&request).await.unwrap(), "\"7\"");
        assert!(registry.get("missing").is_none());
    }
}
