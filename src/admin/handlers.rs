use axum::{
    extract::State,
    Json,
};
use serde::Serialize;
use std::sync::atomic::Ordering;
use crate::cache::CacheStats;
use crate::http::server::AppState;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub uptime_secs: u64,
    pub total_requests: usize,
    pub endpoints: Vec<String>,
}

#[derive(Serialize)]
pub struct CacheCleared {
    pub cleared: bool,
    pub entries_removed: usize,
}

pub async fn get_status(
    State(state): State<AppState>,
) -> Json<SystemStatus> {
    let engine = state.engine.load();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        uptime_secs: state.started_at.elapsed().as_secs(),
        total_requests: state.request_count.load(Ordering::Relaxed),
        endpoints: engine.registry().endpoints(),
    })
}

pub async fn get_cache(
    State(state): State<AppState>,
) -> Json<CacheStats> {
    Json(state.engine.load().cache().stats())
}

pub async fn clear_cache(
    State(state): State<AppState>,
) -> Json<CacheCleared> {
    let engine = state.engine.load();
    let entries_removed = engine.cache().len();
    engine.clear_cache();
    Json(CacheCleared {
        cleared: true,
        entries_removed,
    })
}
