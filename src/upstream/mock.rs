//! In-memory upstream used by unit tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::request::Headers;
use crate::upstream::client::Upstream;
use crate::upstream::types::UpstreamOutcome;

/// Answers from a fixed URI → outcome table and records every call.
#[derive(Default)]
pub struct MockUpstream {
    routes: Mutex<HashMap<String, UpstreamOutcome>>,
    calls: Mutex<Vec<(String, Headers)>>,
}

impl MockUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, uri: &str, outcome: UpstreamOutcome) -> Self {
        self.set_route(uri, outcome);
        self
    }

    pub fn set_route(&self, uri: &str, outcome: UpstreamOutcome) {
        self.routes.lock().unwrap().insert(uri.to_string(), outcome);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(uri, _)| uri.clone()).collect()
    }

    pub fn call_headers(&self) -> Vec<Headers> {
        self.calls.lock().unwrap().iter().map(|(_, h)| h.clone()).collect()
    }
}

#[async_trait]
impl Upstream for MockUpstream {
    async fn fetch(&self, uri: &str, headers: &Headers) -> UpstreamOutcome {
        self.calls.lock().unwrap().push((uri.to_string(), headers.clone()));
        self.routes
            .lock()
            .unwrap()
            .get(uri)
            .cloned()
            .unwrap_or(UpstreamOutcome::Http { status: 404, payload: None })
    }
}
