//! # Traffic Analytics
//!
//! External traffic analytics for the dashboard. The provider is an async
//! trait so the dashboard never knows whether real credentials exist: when
//! none are configured a stand-in serves all-zero metrics, and the dashboard
//! treats provider failures the same way. Traffic data degrades to zero,
//! it never fails a request.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use utoipa::ToSchema;

use crate::config::TrafficConfig;
use crate::dashboard::DateRange;

/// Aggregate traffic figures for one date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TrafficMetrics {
    pub sessions: u64,
    pub users: u64,
    pub page_views: u64,
    pub bounce_rate: f64,
    #[serde(default)]
    pub top_pages: Vec<TopPage>,
}

/// One entry of the most-viewed pages list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TopPage {
    pub path: String,
    pub views: u64,
}

impl TrafficMetrics {
    /// The all-zero structure substituted when no data is available.
    pub fn zero() -> Self {
        Self {
            sessions: 0,
            users: 0,
            page_views: 0,
            bounce_rate: 0.0,
            top_pages: Vec::new(),
        }
    }
}

/// Source of traffic metrics for the dashboard.
#[async_trait]
pub trait TrafficProvider: Send + Sync {
    /// Whether real credentials are configured. Callers substitute
    /// [`TrafficMetrics::zero`] without calling `fetch` when this is false.
    fn is_configured(&self) -> bool;

    /// Fetches metrics for the given range.
    async fn fetch(&self, range: &DateRange) -> Result<TrafficMetrics>;
}

/// HTTP-backed provider querying an external analytics service.
pub struct HttpTrafficProvider {
    http_client: Client,
    base_url: String,
    api_key: String,
}

impl HttpTrafficProvider {
    pub fn new(base_url: String, api_key: String, timeout_ms: u64) -> Self {
        let http_client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .expect("Failed to create HTTP client");
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            http_client,
            base_url,
            api_key,
        }
    }

    /// Builds a provider when the config carries both credentials.
    pub fn from_config(config: &TrafficConfig) -> Option<Self> {
        match (&config.base_url, &config.api_key) {
            (Some(base_url), Some(api_key)) => Some(Self::new(
                base_url.clone(),
                api_key.clone(),
                config.timeout_ms,
            )),
            _ => None,
        }
    }
}

#[async_trait]
impl TrafficProvider for HttpTrafficProvider {
    fn is_configured(&self) -> bool {
        true
    }

    async fn fetch(&self, range: &DateRange) -> Result<TrafficMetrics> {
        let response = self
            .http_client
            .get(format!("{}/v1/metrics", self.base_url))
            .bearer_auth(&self.api_key)
            .query(&[
                ("start_date", range.start.format("%Y-%m-%d").to_string()),
                ("end_date", range.end.format("%Y-%m-%d").to_string()),
            ])
            .send()
            .await
            .context("traffic provider request failed")?;

        let status = response.status();
        if !status.is_success() {
            bail!("traffic provider returned HTTP {}", status);
        }

        response
            .json::<TrafficMetrics>()
            .await
            .context("decoding traffic metrics response")
    }
}

/// Stand-in provider used when no credentials are configured.
pub struct UnconfiguredTrafficProvider;

#[async_trait]
impl TrafficProvider for UnconfiguredTrafficProvider {
    fn is_configured(&self) -> bool {
        false
    }

    async fn fetch(&self, _range: &DateRange) -> Result<TrafficMetrics> {
        Ok(TrafficMetrics::zero())
    }
}

/// Picks the provider the configuration calls for.
pub fn provider_from_config(config: &TrafficConfig) -> Arc<dyn TrafficProvider> {
    match HttpTrafficProvider::from_config(config) {
        Some(provider) => Arc::new(provider),
        None => Arc::new(UnconfiguredTrafficProvider),
    }
}
