//! fleetq-telemetry: Snapshot sources for the fleetq registry
//!
//! This crate provides the telemetry seam and its implementations:
//! - Fixture source for development and tests
//! - HTTP source polling a live feed

pub mod fixture;
pub mod http;
pub mod source;

pub use fixture::FixtureSource;
pub use http::HttpSource;
pub use source::TelemetrySource;

use std::sync::Arc;

use fleetq_core::{FleetError, FleetResult, TelemetryConfig, TelemetrySourceKind};

/// Build the configured telemetry source
pub fn source_from_config(config: &TelemetryConfig) -> FleetResult<Arc<dyn TelemetrySource>> {
    match config.source {
        TelemetrySourceKind::Fixture => match &config.fixture_path {
            Some(path) => Ok(Arc::new(FixtureSource::from_file(path)?)),
            None => Ok(Arc::new(FixtureSource::demo())),
        },
        TelemetrySourceKind::Http => {
            let feed_url = config.feed_url.clone().ok_or_else(|| {
                FleetError::Config(
                    "telemetry.feed_url is required for the http source".to_string(),
                )
            })?;
            Ok(Arc::new(HttpSource::new(
                feed_url,
                config.request_timeout_secs,
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_from_config_defaults_to_demo_fixture() {
        let config = TelemetryConfig::default();
        let source = source_from_config(&config).unwrap();
        assert_eq!(source.name(), "fixture");
    }

    #[test]
    fn test_http_source_requires_feed_url() {
        let config = TelemetryConfig {
            source: TelemetrySourceKind::Http,
            ..TelemetryConfig::default()
        };
        assert!(source_from_config(&config).is_err());
    }
}
