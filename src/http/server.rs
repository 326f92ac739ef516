//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the proxy, health and admin handlers
//! - Wire up middleware (request ID, tracing, timeout)
//! - Apply configuration reloads by swapping in a freshly built engine,
//!   rebuilding the upstream client when its timeouts change
//! - Stop on the shutdown broadcast

use arc_swap::ArcSwap;
use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin::setup_admin_router;
use crate::cache::ResponseCache;
use crate::config::{ProxyConfig, UpstreamConfig};
use crate::http::request::{request_id, MakeRequestUuidV4};
use crate::proxy::ProxyEngine;
use crate::upstream::{HttpUpstream, Upstream};

/// Header reporting whether the response came from the cache.
pub const X_CACHE: &str = "x-cache";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ArcSwap<ProxyEngine>>,
    pub config: Arc<ArcSwap<ProxyConfig>>,
    pub upstream: Arc<Mutex<Arc<dyn Upstream>>>,
    /// Whether the upstream client was built here from `config.upstream`.
    managed_upstream: bool,
    pub request_count: Arc<AtomicUsize>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: ProxyConfig, upstream: Arc<dyn Upstream>) -> Self {
        Self::build(config, upstream, false)
    }

    fn build(config: ProxyConfig, upstream: Arc<dyn Upstream>, managed_upstream: bool) -> Self {
        let engine = Self::build_engine(&config, upstream.clone());
        Self {
            engine: Arc::new(ArcSwap::from_pointee(engine)),
            config: Arc::new(ArcSwap::from_pointee(config)),
            upstream: Arc::new(Mutex::new(upstream)),
            managed_upstream,
            request_count: Arc::new(AtomicUsize::new(0)),
            started_at: Instant::now(),
        }
    }

    fn build_engine(config: &ProxyConfig, upstream: Arc<dyn Upstream>) -> ProxyEngine {
        ProxyEngine::from_config(config, upstream, ResponseCache::from_config(&config.cache))
    }

    /// Current upstream client.
    pub fn upstream(&self) -> Arc<dyn Upstream> {
        self.upstream
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the running engine. The new engine starts with an empty cache
    /// so no response built from the old templates survives the reload.
    pub fn apply_config(&self, config: ProxyConfig) {
        let upstream = self.reload_upstream(&config.upstream);
        let engine = Self::build_engine(&config, upstream);
        self.engine.store(Arc::new(engine));
        self.config.store(Arc::new(config));
        tracing::info!("Configuration reloaded, engine replaced");
    }

    /// Rebuild the upstream client when its timeouts changed.
    fn reload_upstream(&self, next: &UpstreamConfig) -> Arc<dyn Upstream> {
        let previous = self.config.load();
        let mut current = self.upstream.lock().unwrap_or_else(PoisonError::into_inner);
        if !client_settings_changed(&previous.upstream, next) {
            return current.clone();
        }

        if !self.managed_upstream {
            tracing::warn!("Upstream timeouts changed but a custom upstream is in use, keeping it");
            return current.clone();
        }

        match HttpUpstream::new(next) {
            Ok(client) => {
                tracing::info!(
                    request_timeout_secs = next.request_timeout_secs,
                    connect_timeout_secs = next.connect_timeout_secs,
                    "Upstream client rebuilt"
                );
                *current = Arc::new(client);
            }
            Err(e) => tracing::error!(error = %e, "Failed to rebuild upstream client, keeping previous one"),
        }
        current.clone()
    }
}

fn client_settings_changed(previous: &UpstreamConfig, next: &UpstreamConfig) -> bool {
    previous.request_timeout_secs != next.request_timeout_secs
        || previous.connect_timeout_secs != next.connect_timeout_secs
}

/// HTTP server for the event proxy.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a server talking to the real upstream API.
    pub fn new(config: ProxyConfig) -> Result<Self, reqwest::Error> {
        let upstream = Arc::new(HttpUpstream::new(&config.upstream)?);
        Ok(Self::from_state(AppState::build(config, upstream, true)))
    }

    /// Create a server with a custom upstream implementation.
    pub fn with_upstream(config: ProxyConfig, upstream: Arc<dyn Upstream>) -> Self {
        Self::from_state(AppState::new(config, upstream))
    }

    fn from_state(state: AppState) -> Self {
        let router_config = state.config.load_full();
        let router = Self::build_router(&router_config, state.clone());
        Self { router, state }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let mut router = Router::new()
            .route("/request", post(proxy_handler))
            .route("/health", get(health_handler))
            .with_state(state.clone());

        if config.admin.enabled {
            router = router.merge(setup_admin_router(state));
        }

        router
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV4))
    }

    /// Run the server until a shutdown signal is broadcast.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<ProxyConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let state = self.state.clone();
        let mut reload_shutdown = shutdown.resubscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    update = config_updates.recv() => match update {
                        Some(config) => state.apply_config(config),
                        None => break,
                    },
                    _ = reload_shutdown.recv() => break,
                }
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server received shutdown signal");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Shared state, for embedding and tests.
    pub fn state(&self) -> &AppState {
        &self.state
    }
}

/// `POST /request`: the body is the request text.
async fn proxy_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let request_id = request_id(&headers);
    state.request_count.fetch_add(1, Ordering::Relaxed);

    let engine = state.engine.load_full();
    let dispatch = engine.handle_detailed(body.trim()).await;
    let response = dispatch.response;

    tracing::debug!(
        request_id = %request_id,
        status = response.status,
        from_cache = dispatch.served_from_cache,
        "Request handled"
    );

    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let cache = HeaderValue::from_static(if dispatch.served_from_cache { "HIT" } else { "MISS" });

    match response.payload {
        Some(payload) => (
            status,
            [
                (header::CONTENT_TYPE, HeaderValue::from_static("application/json")),
                (header::HeaderName::from_static(X_CACHE), cache),
            ],
            payload,
        )
            .into_response(),
        None => {
            let message = response
                .error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "request failed".to_string());
            (
                status,
                [(header::HeaderName::from_static(X_CACHE), cache)],
                Json(json!({ "error": message, "status": response.status })),
            )
                .into_response()
        }
    }
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
