//! HTTP-fed telemetry

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use fleetq_core::{FleetError, FleetResult, NodeSnapshot};

use crate::source::TelemetrySource;

/// Live feed polled over HTTP
///
/// The feed must answer GET with a JSON array of node snapshots.
pub struct HttpSource {
    /// HTTP client for feed requests
    client: reqwest::Client,
    /// Feed URL
    feed_url: String,
}

impl HttpSource {
    /// Create a source for the given feed
    pub fn new(feed_url: String, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, feed_url }
    }

    /// Feed URL this source polls
    pub fn feed_url(&self) -> &str {
        &self.feed_url
    }
}

#[async_trait]
impl TelemetrySource for HttpSource {
    async fn sample(&self) -> FleetResult<Vec<NodeSnapshot>> {
        let response = self
            .client
            .get(&self.feed_url)
            .send()
            .await
            .map_err(|e| FleetError::Telemetry(format!("Feed request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(FleetError::Telemetry(format!(
                "Feed returned {}",
                response.status()
            )));
        }

        let snapshots: Vec<NodeSnapshot> = response
            .json()
            .await
            .map_err(|e| FleetError::Telemetry(format!("Feed payload unreadable: {}", e)))?;

        debug!(feed = %self.feed_url, nodes = snapshots.len(), "Sampled telemetry feed");
        Ok(snapshots)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
