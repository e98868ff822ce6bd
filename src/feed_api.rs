//! HTTP client for the feed backend.
//!
//! The snapshot endpoint is the only thing the refresh loop depends on, and
//! it does so through `SnapshotFetcher` so tests can plug in a fake.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use crate::config::Config;
use crate::types::{AppEvent, DetailKey, FeedItem, FeedSnapshot, SnapshotMeta};

#[async_trait]
pub trait SnapshotFetcher: Send + Sync {
    async fn fetch_snapshot(&self) -> Result<FeedSnapshot>;
}

#[async_trait]
pub trait DetailFetcher: Send + Sync {
    async fn fetch_detail(&self, key: &DetailKey) -> Result<Value>;
}

#[derive(Debug, Deserialize)]
struct SnapshotEnvelope {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    data: Option<Vec<FeedItem>>,
    #[serde(default)]
    meta: Option<SnapshotMeta>,
    #[serde(default, alias = "error")]
    message: Option<String>,
}

/// Decode a snapshot response body.
///
/// `success: false` is a failure carrying the backend's message. A body with
/// no `data` is an empty feed.
pub fn parse_snapshot(body: &[u8]) -> Result<FeedSnapshot> {
    let env: SnapshotEnvelope =
        serde_json::from_slice(body).map_err(|e| anyhow!("Failed to parse feed snapshot: {e}"))?;

    if env.success == Some(false) {
        return Err(anyhow!(
            "{}",
            env.message.unwrap_or_else(|| "feed backend reported failure".to_string())
        ));
    }

    Ok(FeedSnapshot {
        items: env.data.unwrap_or_default(),
        meta: env.meta.unwrap_or_default(),
    })
}

pub struct FeedClient {
    http: reqwest::Client,
    base_url: String,
    limit: u32,
    timeout: Duration,
}

impl FeedClient {
    pub fn new(cfg: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(4)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| anyhow!("Failed to build HTTP client: {e}"))?;
        Ok(Self {
            http,
            base_url: cfg.api_url.clone(),
            limit: cfg.feed_limit,
            timeout: cfg.http_timeout(),
        })
    }

    pub fn snapshot_url(&self) -> String {
        format!("{}/tweets?limit={}&offset=0", self.base_url, self.limit)
    }

    pub fn detail_url(&self, key: &DetailKey) -> String {
        match key {
            DetailKey::User(name) => format!("{}/user/{}", self.base_url, urlencoding::encode(name)),
            DetailKey::Token(ca) => format!("{}/token-analysis/{}", self.base_url, urlencoding::encode(ca)),
        }
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .http
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| anyhow!("Request to {url} failed: {e}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!("Feed API error ({status}): {error_text}"));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| anyhow!("Failed to read response from {url}: {e}"))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl SnapshotFetcher for FeedClient {
    async fn fetch_snapshot(&self) -> Result<FeedSnapshot> {
        let url = self.snapshot_url();
        log::debug!("[feed_api] GET {url}");
        let body = self.get_bytes(&url).await?;
        let snapshot = parse_snapshot(&body)?;
        log::info!("[feed_api] snapshot with {} items", snapshot.items.len());
        Ok(snapshot)
    }
}

#[async_trait]
impl DetailFetcher for FeedClient {
    async fn fetch_detail(&self, key: &DetailKey) -> Result<Value> {
        let url = self.detail_url(key);
        log::info!("[feed_api] fetching details for {key}");
        let body = self.get_bytes(&url).await?;
        let value: Value =
            serde_json::from_slice(&body).map_err(|e| anyhow!("Failed to parse details for {key}: {e}"))?;
        if value.get("success").and_then(Value::as_bool) == Some(false) {
            return Err(anyhow!("No details available for {key}"));
        }
        // Passed through untouched apart from unwrapping the envelope.
        Ok(value.get("data").cloned().unwrap_or(value))
    }
}

/// Background task serving detail lookups requested by the UI.
pub async fn run_detail_fetch<F: DetailFetcher + ?Sized>(
    fetcher: &F,
    mut requests: UnboundedReceiver<DetailKey>,
    events: UnboundedSender<AppEvent>,
) -> Result<()> {
    while let Some(key) = requests.recv().await {
        let result = fetcher.fetch_detail(&key).await.map_err(|e| {
            log::warn!("[feed_api] details for {key} failed: {e:#}");
            format!("{e:#}")
        });
        if events.send(AppEvent::Detail { key, result }).is_err() {
            break;
        }
    }
    log::debug!("[feed_api] detail task shutting down");
    Ok(())
}
