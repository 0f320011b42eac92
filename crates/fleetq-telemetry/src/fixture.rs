//! Fixture-backed telemetry
//!
//! A fixed fleet loaded from a JSON document, standing in for a live feed
//! during development and tests.

use async_trait::async_trait;
use std::path::Path;
use tracing::info;

use fleetq_core::{
    Allocation, FleetError, FleetResult, GpuType, GpuUnit, NodeSnapshot, NodeStatus,
};

use crate::source::TelemetrySource;

/// Telemetry source that always reports the same fleet
pub struct FixtureSource {
    snapshots: Vec<NodeSnapshot>,
}

impl FixtureSource {
    /// Wrap an in-memory snapshot list
    pub fn new(snapshots: Vec<NodeSnapshot>) -> Self {
        Self { snapshots }
    }

    /// Load a snapshot list from a JSON file
    pub fn from_file(path: &Path) -> FleetResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            FleetError::Telemetry(format!("Failed to read fixture {}: {}", path.display(), e))
        })?;
        let snapshots: Vec<NodeSnapshot> = serde_json::from_str(&content)?;
        info!(path = %path.display(), nodes = snapshots.len(), "Loaded telemetry fixture");
        Ok(Self::new(snapshots))
    }

    /// Small built-in fleet for running the daemon without a feed
    pub fn demo() -> Self {
        let busy_gpu = |index: u32, user: &str, team: &str, pct: u32, job: &str, mins: u64| {
            let mut gpu = GpuUnit::idle(index);
            gpu.usage_pct = pct;
            gpu.allocations.push(Allocation {
                user: user.to_string(),
                team: team.to_string(),
                percentage: pct,
                job_type: job.to_string(),
                minutes_running: mins,
            });
            gpu
        };

        let idle_gpus = |from: u32, to: u32| (from..to).map(GpuUnit::idle);

        let mut a100_02 = vec![busy_gpu(0, "kim", "Data Science", 85, "Training", 240)];
        a100_02.extend(idle_gpus(1, 8));

        let mut h100_01 = vec![
            busy_gpu(0, "lee", "AI Research", 70, "Training", 90),
            busy_gpu(1, "park", "ML Ops", 45, "Inference", 30),
        ];
        h100_01.extend(idle_gpus(2, 4));

        Self::new(vec![
            NodeSnapshot {
                name: "Node-A100-01".to_string(),
                gpu_type: GpuType::A100,
                status: NodeStatus::Online,
                cpu_allocation_pct: 25.0,
                gpus: idle_gpus(0, 8).collect(),
            },
            NodeSnapshot {
                name: "Node-A100-02".to_string(),
                gpu_type: GpuType::A100,
                status: NodeStatus::Online,
                cpu_allocation_pct: 45.0,
                gpus: a100_02,
            },
            NodeSnapshot {
                name: "Node-H100-01".to_string(),
                gpu_type: GpuType::H100,
                status: NodeStatus::Online,
                cpu_allocation_pct: 60.0,
                gpus: h100_01,
            },
            NodeSnapshot {
                name: "Node-A30-01".to_string(),
                gpu_type: GpuType::A30,
                status: NodeStatus::Maintenance,
                cpu_allocation_pct: 0.0,
                gpus: idle_gpus(0, 6).collect(),
            },
        ])
    }
}

#[async_trait]
impl TelemetrySource for FixtureSource {
    async fn sample(&self) -> FleetResult<Vec<NodeSnapshot>> {
        Ok(self.snapshots.clone())
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}
