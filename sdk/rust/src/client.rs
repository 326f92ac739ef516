use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Reply to a proxied request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyReply {
    pub status: u16,
    /// `Some(true)` for `x-cache: HIT`, `Some(false)` for `MISS`.
    pub from_cache: Option<bool>,
    /// Payload on success, `{"error", "status"}` otherwise.
    pub body: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub live: usize,
    pub expired: usize,
    pub ttl_secs: u64,
}

pub struct ProxyClient {
    client: Client,
    proxy_url: String,
    admin_key: Option<String>,
}

impl ProxyClient {
    pub fn new(proxy_url: &str) -> Self {
        Self {
            client: Client::new(),
            proxy_url: proxy_url.trim_end_matches('/').to_string(),
            admin_key: None,
        }
    }

    /// Use `key` as the bearer token for admin calls.
    pub fn with_admin_key(mut self, key: &str) -> Self {
        self.admin_key = Some(key.to_string());
        self
    }

    /// Send request text such as `GET: /resource-with-subscribers/42/`.
    pub async fn request(&self, text: &str) -> Result<ProxyReply, Box<dyn std::error::Error>> {
        let resp = self.client
            .post(format!("{}/request", self.proxy_url))
            .body(text.to_string())
            .send()
            .await?;

        let status = resp.status().as_u16();
        let from_cache = resp
            .headers()
            .get("x-cache")
            .and_then(|v| v.to_str().ok())
            .map(|v| v == "HIT");
        let body = resp.json::<serde_json::Value>().await?;

        Ok(ProxyReply { status, from_cache, body })
    }

    /// Current cache occupancy.
    pub async fn cache_stats(&self) -> Result<CacheStats, Box<dyn std::error::Error>> {
        let resp = self.admin(self.client.get(format!("{}/admin/cache", self.proxy_url)))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(format!("Proxy returned error status {}", resp.status()).into());
        }
        Ok(resp.json().await?)
    }

    /// Drop every cached response; returns how many entries were removed.
    pub async fn clear_cache(&self) -> Result<usize, Box<dyn std::error::Error>> {
        let resp = self.admin(self.client.delete(format!("{}/admin/cache", self.proxy_url)))
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(format!("Proxy returned error status {}", status).into());
        }
        let body: serde_json::Value = resp.json().await?;
        Ok(body["entries_removed"].as_u64().unwrap_or(0) as usize)
    }

    fn admin(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.admin_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}
