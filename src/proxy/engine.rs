//! The dispatch pipeline: parse, validate, cache, aggregate.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::aggregate::AggregatorRegistry;
use crate::cache::{CacheKey, ResponseCache};
use crate::config::ProxyConfig;
use crate::observability::metrics;
use crate::proxy::types::{Dispatch, ProxyError, ProxyResponse};
use crate::request::{ParsedRequest, RequestError, RequestParser, RequestValidator};
use crate::upstream::Upstream;

/// Metric label for requests rejected before an endpoint is known.
const REJECTED_ENDPOINT: &str = "rejected";

/// Single entry point of the proxy.
///
/// Safe to share between concurrent callers; the cache is shared state and
/// everything else is request-scoped.
pub struct ProxyEngine {
    parser: RequestParser,
    validator: RequestValidator,
    registry: AggregatorRegistry,
    cache: ResponseCache,
    last_served_from_cache: AtomicBool,
}

impl ProxyEngine {
    /// Create an engine from configuration and an explicit registry.
    pub fn new(config: &ProxyConfig, registry: AggregatorRegistry, cache: ResponseCache) -> Self {
        tracing::debug!(
            commands = ?config.allowed_commands,
            endpoints = ?registry.endpoints(),
            ttl = ?cache.ttl(),
            "Proxy engine initialized"
        );

        Self {
            parser: RequestParser::new(Arc::new(config.request_headers())),
            validator: RequestValidator::new(
                config.allowed_commands.iter().cloned(),
                config.allowed_endpoints.iter().cloned(),
            ),
            registry,
            cache,
            last_served_from_cache: AtomicBool::new(false),
        }
    }

    /// Create an engine whose endpoints are built from `config.endpoints`.
    pub fn from_config(config: &ProxyConfig, upstream: Arc<dyn Upstream>, cache: ResponseCache) -> Self {
        let registry = AggregatorRegistry::from_config(config, upstream);
        Self::new(config, registry, cache)
    }

    /// Handle one request and return its response.
    pub async fn handle(&self, text: &str) -> ProxyResponse {
        self.handle_detailed(text).await.response
    }

    /// Handle one request, also reporting whether it was a cache hit.
    pub async fn handle_detailed(&self, text: &str) -> Dispatch {
        let start = Instant::now();

        let (endpoint, dispatch) = match self.decode(text) {
            Ok(request) => {
                let dispatch = self.dispatch(&request).await;
                (request.endpoint, dispatch)
            }
            Err(e) => {
                tracing::info!(request = %text, error = %e, "Rejected request");
                let dispatch = Dispatch {
                    response: ProxyResponse::failed(ProxyError::Request(e)),
                    served_from_cache: false,
                };
                (REJECTED_ENDPOINT.to_string(), dispatch)
            }
        };

        self.last_served_from_cache
            .store(dispatch.served_from_cache, Ordering::SeqCst);
        metrics::record_request(
            &endpoint,
            dispatch.response.status,
            if dispatch.served_from_cache { "hit" } else { "miss" },
            start,
        );
        dispatch
    }

    /// Whether the most recently completed request was served from the cache.
    pub fn served_from_cache(&self) -> bool {
        self.last_served_from_cache.load(Ordering::SeqCst)
    }

    /// Drop every cached response.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn registry(&self) -> &AggregatorRegistry {
        &self.registry
    }

    fn decode(&self, text: &str) -> Result<ParsedRequest, RequestError> {
        let request = self.parser.parse(text)?;
        self.validator.validate(&request)?;
        Ok(request)
    }

    async fn dispatch(&self, request: &ParsedRequest) -> Dispatch {
        let key = CacheKey::for_request(request);

        if let Some(cached) = self.cache.get(&key) {
            tracing::debug!(key = %key, status = cached.status, "Serving from cache");
            return Dispatch {
                response: cached.as_ref().clone(),
                served_from_cache: true,
            };
        }

        let response = self.resolve(request).await;
        if response.is_cacheable() {
            self.cache.insert(key, response.clone());
        }

        Dispatch {
            response,
            served_from_cache: false,
        }
    }

    async fn resolve(&self, request: &ParsedRequest) -> ProxyResponse {
        let Some(aggregator) = self.registry.get(&request.endpoint) else {
            tracing::warn!(endpoint = %request.endpoint, "Endpoint is allowed but has no aggregator");
            return ProxyResponse::failed(ProxyError::NoAggregator(request.endpoint.clone()));
        };

        match aggregator.resolve(request).await {
            Ok(payload) => {
                tracing::info!(
                    endpoint = %request.endpoint,
                    param = %request.endpoint_param,
                    "Aggregation succeeded"
                );
                ProxyResponse::ok(payload)
            }
            Err(e) => {
                tracing::warn!(
                    endpoint = %request.endpoint,
                    param = %request.endpoint_param,
                    command = %request.command,
                    error = %e,
                    "Aggregation failed"
                );
                ProxyResponse::failed(ProxyError::Aggregation(e))
            }
        }
    }
}

impl std::fmt::Debug for ProxyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyEngine")
            .field("registry", &self.registry)
            .field("cache", &self.cache)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::AggregationError;
    use crate::config::RESOURCE_WITH_SUBSCRIBERS;
    use crate::upstream::mock::MockUpstream;
    use crate::upstream::{TransportError, UpstreamOutcome};
    use serde_json::json;
    use std::time::Duration;

    const REQUEST: &str = "GET: /resource-with-subscribers/42/";
    const RESOURCE_URI: &str = "http://api/events/42/";
    const SUBSCRIPTIONS_URI: &str = "http://api/event-subscriptions/?event_ids=[42]";

    fn test_config() -> ProxyConfig {
        let mut config = ProxyConfig::default();
        config.upstream.api_token = "t0k3n".into();
        if let Some(endpoint) = config.endpoints.get_mut(RESOURCE_WITH_SUBSCRIBERS) {
            endpoint.uris = vec![
                "http://api/events/{0}/".into(),
                "http://api/event-subscriptions/?event_ids=[{0}]".into(),
            ];
        }
        config
    }

    fn healthy_upstream() -> Arc<MockUpstream> {
        Arc::new(
            MockUpstream::new()
                .route(RESOURCE_URI, UpstreamOutcome::ok(json!({"data": [{"id": "42", "title": "T"}]})))
                .route(
                    SUBSCRIPTIONS_URI,
                    UpstreamOutcome::ok(json!({"data": [
                        {"subscriber": {"first_name": "Ann"}},
                        {"subscriber": {"first_name": "Bo"}}
                    ]})),
                ),
        )
    }

    fn engine_with(config: &ProxyConfig, upstream: Arc<MockUpstream>, ttl: Duration) -> ProxyEngine {
        ProxyEngine::from_config(config, upstream, ResponseCache::new(ttl, None))
    }

    fn engine(upstream: Arc<MockUpstream>) -> ProxyEngine {
        engine_with(&test_config(), upstream, Duration::from_secs(252))
    }

    #[tokio::test]
    async fn test_successful_aggregation() {
        let upstream = healthy_upstream();
        let engine = engine(upstream.clone());

        let response = engine.handle(REQUEST).await;
        assert_eq!(response.status, 200);
        assert_eq!(
            response.payload.as_deref(),
            Some(r#"{"id":"42","title":"T","names":["Ann","Bo"]}"#)
        );
        assert_eq!(response.error, None);
        assert!(!engine.served_from_cache());

        // Configured token reaches the upstream
        for headers in upstream.call_headers() {
            assert_eq!(headers["Authorization"], "Token t0k3n");
        }
    }

    #[tokio::test]
    async fn test_second_request_is_served_from_cache() {
        let upstream = healthy_upstream();
        let engine = engine(upstream.clone());

        let first = engine.handle_detailed(REQUEST).await;
        let second = engine.handle_detailed(REQUEST).await;

        assert!(!first.served_from_cache);
        assert!(second.served_from_cache);
        assert!(engine.served_from_cache());
        assert_eq!(first.response, second.response);
        assert_eq!(upstream.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_whitespace_variants_share_cache_entry() {
        let upstream = healthy_upstream();
        let engine = engine(upstream.clone());

        engine.handle(REQUEST).await;
        engine.handle("  GET :  /resource-with-subscribers/42  ").await;
        assert!(engine.served_from_cache());
        assert_eq!(upstream.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_cache_expiry() {
        let upstream = healthy_upstream();
        let engine = engine_with(&test_config(), upstream.clone(), Duration::from_millis(50));

        engine.handle(REQUEST).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        let response = engine.handle(REQUEST).await;

        assert!(!engine.served_from_cache());
        assert_eq!(response.status, 200);
        assert_eq!(upstream.calls().len(), 4);
    }

    #[tokio::test]
    async fn test_clear_cache() {
        let upstream = healthy_upstream();
        let engine = engine(upstream.clone());

        engine.handle(REQUEST).await;
        engine.handle(REQUEST).await;
        assert!(engine.served_from_cache());

        engine.clear_cache();
        engine.handle(REQUEST).await;
        assert!(!engine.served_from_cache());
    }

    #[tokio::test]
    async fn test_subscription_failure_yields_401() {
        let upstream = healthy_upstream();
        upstream.set_route(SUBSCRIPTIONS_URI, UpstreamOutcome::Http { status: 500, payload: None });
        let engine = engine(upstream);

        let response = engine.handle(REQUEST).await;
        assert_eq!(response.status, 401);
        assert_eq!(response.payload, None);
        assert_eq!(
            response.error,
            Some(ProxyError::Aggregation(AggregationError::UpstreamStatus {
                uri: SUBSCRIPTIONS_URI.into(),
                status: 500,
            }))
        );
    }

    #[tokio::test]
    async fn test_failed_aggregation_is_cached() {
        let upstream = healthy_upstream();
        upstream.set_route(RESOURCE_URI, UpstreamOutcome::Http { status: 404, payload: None });
        let engine = engine(upstream.clone());

        let first = engine.handle_detailed(REQUEST).await;
        // Upstream recovers, but the negative result stays cached for the ttl
        upstream.set_route(RESOURCE_URI, UpstreamOutcome::ok(json!({"data": [{"id": "42", "title": "T"}]})));
        let second = engine.handle_detailed(REQUEST).await;

        assert_eq!(first.response.status, 401);
        assert!(second.served_from_cache);
        assert_eq!(second.response.status, 401);
        assert_eq!(upstream.calls().len(), 2);

        engine.clear_cache();
        assert_eq!(engine.handle(REQUEST).await.status, 200);
    }

    #[tokio::test]
    async fn test_invalid_uri_template_yields_401() {
        let invalid = TransportError::InvalidUri {
            uri: "fdsfsdf".into(),
            reason: "relative URL without a base".into(),
        };
        let upstream = healthy_upstream();
        upstream.set_route("fdsfsdf", UpstreamOutcome::Failed(invalid.clone()));

        let mut config = test_config();
        if let Some(endpoint) = config.endpoints.get_mut(RESOURCE_WITH_SUBSCRIBERS) {
            endpoint.uris[0] = "fdsfsdf".into();
        }
        let engine = engine_with(&config, upstream, Duration::from_secs(252));

        let response = engine.handle(REQUEST).await;
        assert_eq!(response.status, 401);
        assert_eq!(
            response.error,
            Some(ProxyError::Aggregation(AggregationError::Transport(invalid)))
        );
    }

    #[tokio::test]
    async fn test_invalid_command_makes_no_upstream_calls() {
        let upstream = healthy_upstream();
        let engine = engine(upstream.clone());

        let response = engine.handle("GE_T: /resource-with-subscribers/42/").await;
        assert_eq!(response.status, 400);
        assert_eq!(response.payload, None);
        assert_eq!(
            response.error,
            Some(ProxyError::Request(RequestError::InvalidCommand("GE_T".into())))
        );
        assert!(upstream.calls().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_requests_yield_400() {
        let upstream = healthy_upstream();
        let engine = engine(upstream.clone());

        let cases = [
            "GET /resource-with-subscribers/42/",
            "GET/: /resource-with-subscribers/42/:",
            "GE_T/: /resource-with-subscribers/42/",
            "GET: /resource//",
            "GET: /a/b/c/",
            "GET: /resource-with-subscribers//42/",
            "GET: /events-with-subscript/ions/42/",
            "GET: /unknown-endpoint/42/",
            "",
        ];
        for text in cases {
            let response = engine.handle(text).await;
            assert_eq!(response.status, 400, "request {:?}", text);
            assert!(response.payload.is_none());
            assert!(!engine.served_from_cache());
        }
        assert!(upstream.calls().is_empty());
        assert!(engine.cache().is_empty());
    }

    #[tokio::test]
    async fn test_no_state_leaks_between_requests() {
        let upstream = healthy_upstream();
        let engine = engine(upstream);

        assert_eq!(engine.handle("GET/: /resource-with-subscribers/42/").await.status, 400);
        assert_eq!(engine.handle("GET: /resource-with-subscribers//42/").await.status, 400);
        assert_eq!(engine.handle(REQUEST).await.status, 200);
        assert!(!engine.served_from_cache());

        assert_eq!(engine.handle(REQUEST).await.status, 200);
        assert!(engine.served_from_cache());

        // A rejected request after a cache hit reports a fresh, uncached result
        let rejected = engine.handle("GE_T: /resource-with-subscribers/42/").await;
        assert_eq!(rejected.status, 400);
        assert!(rejected.payload.is_none());
        assert!(!engine.served_from_cache());

        assert_eq!(engine.handle(REQUEST).await.status, 200);
        assert!(engine.served_from_cache());
    }

    #[tokio::test]
    async fn test_unsupported_command_is_not_cached() {
        let upstream = healthy_upstream();
        let mut config = test_config();
        config.allowed_commands.push("DELETE".into());
        let engine = engine_with(&config, upstream.clone(), Duration::from_secs(252));

        let response = engine.handle("DELETE: /resource-with-subscribers/42/").await;
        assert_eq!(response.status, 501);
        assert!(matches!(
            response.error,
            Some(ProxyError::Aggregation(AggregationError::UnsupportedOperation { .. }))
        ));
        assert!(upstream.calls().is_empty());
        assert!(engine.cache().is_empty());

        // The unsupported command must not poison the GET entry
        assert_eq!(engine.handle(REQUEST).await.status, 200);
        assert!(!engine.served_from_cache());
    }

    #[tokio::test]
    async fn test_allowed_endpoint_without_aggregator() {
        let upstream = healthy_upstream();
        let mut config = test_config();
        config.allowed_endpoints.push("people".into());
        let engine = engine_with(&config, upstream, Duration::from_secs(252));

        let response = engine.handle("GET: /people/1/").await;
        assert_eq!(response.status, 501);
        assert_eq!(response.error, Some(ProxyError::NoAggregator("people".into())));
    }

    #[tokio::test]
    async fn test_param_is_encoded_into_upstream_uris() {
        let upstream = Arc::new(MockUpstream::new());
        let engine = engine(upstream.clone());

        let response = engine.handle("GET: /resource-with-subscribers/..?x=1#/").await;
        assert_eq!(response.status, 401);

        let mut calls = upstream.calls();
        calls.sort();
        assert_eq!(
            calls,
            vec![
                "http://api/event-subscriptions/?event_ids=[..%3Fx%3D1%23]".to_string(),
                "http://api/events/..%3Fx%3D1%23/".to_string(),
            ]
        );

        assert_eq!(engine.handle("GET: /resource-with-subscribers/../").await.status, 400);
        assert_eq!(upstream.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_distinct_params_are_cached_separately() {
        let upstream = healthy_upstream();
        let engine = engine(upstream.clone());

        engine.handle(REQUEST).await;
        let other = engine.handle("GET: /resource-with-subscribers/43/").await;
        assert_eq!(other.status, 401);
        assert!(!engine.served_from_cache());
        assert_eq!(engine.cache().len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_requests() {
        let upstream = healthy_upstream();
        let engine = Arc::new(engine(upstream));
        engine.handle(REQUEST).await;

        let mut handles = Vec::new();
        for _ in 0..16 {
            let engine = engine.clone();
            handles.push(tokio::spawn(async move { engine.handle_detailed(REQUEST).await }));
        }
        for handle in handles {
            let dispatch = handle.await.unwrap();
            assert!(dispatch.served_from_cache);
            assert_eq!(dispatch.response.status, 200);
        }
    }
}
