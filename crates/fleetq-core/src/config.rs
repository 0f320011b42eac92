//! Configuration types for fleetq

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::node::GpuAggregation;

/// Main daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// API server configuration
    #[serde(default)]
    pub api: ApiConfig,
    /// Telemetry ingestion configuration
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// Scheduling configuration
    #[serde(default)]
    pub scheduling: SchedulingConfig,
    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            telemetry: TelemetryConfig::default(),
            scheduling: SchedulingConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl DaemonConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &std::path::Path) -> Result<Self, crate::FleetError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::FleetError::Config(format!("Failed to read config file: {}", e))
        })?;
        toml::from_str(&content)
            .map_err(|e| crate::FleetError::Config(format!("Failed to parse config: {}", e)))
    }
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Address to bind the REST API server
    pub rest_address: String,
    /// Port for the REST API server
    pub rest_port: u16,
    /// Enable CORS
    pub cors_enabled: bool,
    /// Allowed CORS origins
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            rest_address: "0.0.0.0".to_string(),
            rest_port: 8080,
            cors_enabled: true,
            cors_origins: vec!["*".to_string()],
        }
    }
}

/// Telemetry ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Snapshot source kind (fixture or http)
    pub source: TelemetrySourceKind,
    /// Feed URL for the http source
    pub feed_url: Option<String>,
    /// Fixture file path for the fixture source
    pub fixture_path: Option<PathBuf>,
    /// Poll interval in seconds
    pub poll_interval_secs: u64,
    /// Per-request timeout in seconds (http source)
    pub request_timeout_secs: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            source: TelemetrySourceKind::Fixture,
            feed_url: None,
            fixture_path: None,
            poll_interval_secs: 30,
            request_timeout_secs: 5,
        }
    }
}

/// Telemetry source kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TelemetrySourceKind {
    /// Fixed fleet loaded from a JSON file
    Fixture,
    /// Live feed polled over HTTP
    Http,
}

/// Scheduling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulingConfig {
    /// Wait-time model for new-submission estimates
    pub wait_model: WaitModelKind,
    /// Jitter model: minimum added minutes
    pub jitter_floor_minutes: u64,
    /// Jitter model: size of the random band above the floor
    pub jitter_spread_minutes: u64,
    /// Throughput model: minutes to clear one queued GPU
    pub service_minutes_per_gpu: f64,
    /// How per-GPU usage rolls up to a node figure
    pub gpu_aggregation: GpuAggregation,
    /// Queue wait-minute advancement interval in seconds
    pub wait_tick_secs: u64,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            wait_model: WaitModelKind::Jitter,
            jitter_floor_minutes: 10,
            jitter_spread_minutes: 30,
            service_minutes_per_gpu: 7.5,
            gpu_aggregation: GpuAggregation::ActiveFraction,
            wait_tick_secs: 60,
        }
    }
}

/// Wait-time model kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitModelKind {
    /// Queue mean plus a bounded random jitter
    Jitter,
    /// Deterministic estimate from queued GPU demand
    Throughput,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the node state directory
    pub data_path: PathBuf,
    /// Persist node state to disk on every mutation
    pub persist: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("/var/lib/fleetq/nodes"),
            persist: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log format (json or text)
    pub format: String,
    /// Log file path (if any)
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
            file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_daemon_config() {
        let config = DaemonConfig::default();
        assert_eq!(config.api.rest_port, 8080);
        assert_eq!(config.telemetry.poll_interval_secs, 30);
        assert_eq!(config.scheduling.wait_model, WaitModelKind::Jitter);
        assert_eq!(
            config.scheduling.gpu_aggregation,
            GpuAggregation::ActiveFraction
        );
    }

    #[test]
    fn test_partial_config_parse() {
        let toml_str = r#"
[api]
rest_port = 9000

[telemetry]
source = "http"
feed_url = "http://fleet-agent:7070/snapshots"
poll_interval_secs = 10

[scheduling]
wait_model = "throughput"
gpu_aggregation = "mean-usage"
"#;
        let config: DaemonConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.api.rest_port, 9000);
        assert_eq!(config.api.rest_address, "0.0.0.0");
        assert_eq!(config.telemetry.source, TelemetrySourceKind::Http);
        assert_eq!(
            config.telemetry.feed_url.as_deref(),
            Some("http://fleet-agent:7070/snapshots")
        );
        assert_eq!(config.scheduling.wait_model, WaitModelKind::Throughput);
        assert_eq!(config.scheduling.gpu_aggregation, GpuAggregation::MeanUsage);
        assert!(config.storage.persist);
    }
}
