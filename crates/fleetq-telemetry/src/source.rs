//! Telemetry source trait

use async_trait::async_trait;
use fleetq_core::{FleetResult, NodeSnapshot};

/// Source of fleet telemetry snapshots
///
/// The registry is fed from whatever implements this; the fleet data never
/// lives in the core itself.
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// Sample the current state of every node the source knows
    async fn sample(&self) -> FleetResult<Vec<NodeSnapshot>>;

    /// Source name for logs
    fn name(&self) -> &'static str;
}
