//! Node, GPU unit, allocation, and queue entry definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::capacity::{GpuType, NodeCapacity};

/// Operational status of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    /// Accepting work
    Online,
    /// Temporarily withdrawn by operators
    Maintenance,
    /// Unreachable
    Offline,
}

impl NodeStatus {
    /// Whether the node is a scheduling candidate
    pub fn is_schedulable(self) -> bool {
        matches!(self, NodeStatus::Online)
    }
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeStatus::Online => write!(f, "online"),
            NodeStatus::Maintenance => write!(f, "maintenance"),
            NodeStatus::Offline => write!(f, "offline"),
        }
    }
}

/// Priority class of a queued request
///
/// The sole manual-override signal distinct from queue position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Normal,
    Urgent,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Normal => write!(f, "normal"),
            Priority::Urgent => write!(f, "urgent"),
        }
    }
}

/// One job's fractional claim on a GPU
///
/// Created when a job is admitted to a GPU and destroyed when it completes
/// or is evicted; never outlives the owning GPU unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    /// Owning user
    pub user: String,
    /// Owning team
    pub team: String,
    /// Share of the GPU, in (0, 100]
    pub percentage: u32,
    /// Free-form job label (Training, Inference, ...)
    pub job_type: String,
    /// Minutes the job has been running
    pub minutes_running: u64,
}

/// One physical GPU slot on a node
///
/// Multiple allocations model time/space-sharing of the same device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpuUnit {
    /// Position within the owning node
    pub index: u32,
    /// Usage percentage reported by telemetry, in [0, 100]
    pub usage_pct: u32,
    /// Current claims on this device
    #[serde(default)]
    pub allocations: Vec<Allocation>,
}

impl GpuUnit {
    /// An idle slot with no claims
    pub fn idle(index: u32) -> Self {
        Self {
            index,
            usage_pct: 0,
            allocations: Vec::new(),
        }
    }

    /// Whether any work is running on this device
    pub fn is_active(&self) -> bool {
        self.usage_pct > 0
    }

    /// Sum of allocation percentages
    ///
    /// May exceed 100: an oversubscribed GPU is a legitimate, detectable
    /// state signalling contention, and is never clamped.
    pub fn total_allocated_pct(&self) -> u32 {
        self.allocations.iter().map(|a| a.percentage).sum()
    }

    /// Consistency check against the reported usage
    ///
    /// Usage must cover the largest single allocation, and an idle device
    /// must carry no allocations. Violations are reported, not fixed:
    /// telemetry stays the source of truth.
    pub fn consistency_violation(&self) -> Option<String> {
        if self.usage_pct == 0 && !self.allocations.is_empty() {
            return Some(format!(
                "gpu {} reports zero usage but carries {} allocation(s)",
                self.index,
                self.allocations.len()
            ));
        }

        let max_single = self
            .allocations
            .iter()
            .map(|a| a.percentage)
            .max()
            .unwrap_or(0);
        if self.usage_pct < max_single {
            return Some(format!(
                "gpu {} usage {}% below largest allocation {}%",
                self.index, self.usage_pct, max_single
            ));
        }

        None
    }
}

/// One pending job request awaiting admission to a node's GPUs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Unique entry identifier
    pub id: Uuid,
    /// Requesting team
    pub team: String,
    /// Requesting user
    pub user: String,
    /// Total GPUs requested
    pub gpu_count: u32,
    /// Minutes spent waiting so far; increases monotonically while enqueued
    pub wait_minutes: u64,
    /// Priority class
    pub priority: Priority,
    /// Submission timestamp
    pub submitted_at: DateTime<Utc>,
}

impl QueueEntry {
    /// Create a fresh entry at wait zero
    pub fn new(team: String, user: String, gpu_count: u32, priority: Priority) -> Self {
        Self {
            id: Uuid::new_v4(),
            team,
            user,
            gpu_count,
            wait_minutes: 0,
            priority,
            submitted_at: Utc::now(),
        }
    }
}

/// How a node's aggregate GPU usage is derived from its units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GpuAggregation {
    /// Fraction of GPUs with usage > 0 (1 of 8 active = 12.5)
    ActiveFraction,
    /// Arithmetic mean of per-GPU usage
    MeanUsage,
}

impl Default for GpuAggregation {
    fn default() -> Self {
        GpuAggregation::ActiveFraction
    }
}

/// One host in the fleet
///
/// A node exclusively owns its GPU units and its queue. Queue order is the
/// scheduling priority signal fed downstream, not execution order itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Unique node identifier
    pub id: Uuid,
    /// Unique display name (e.g. "Node-A100-01")
    pub name: String,
    /// GPU class of this node
    pub gpu_type: GpuType,
    /// Fixed class capacity
    pub capacity: NodeCapacity,
    /// Operational status
    pub status: NodeStatus,
    /// Aggregate CPU allocation percentage
    pub cpu_allocation_pct: f64,
    /// GPU slots, indexed 0..capacity.total_gpus
    pub gpus: Vec<GpuUnit>,
    /// Pending requests, in priority order (front is next)
    pub queue: Vec<QueueEntry>,
    /// Last telemetry refresh
    pub last_updated: DateTime<Utc>,
}

impl Node {
    /// Create an idle node of the given class
    pub fn new(name: String, gpu_type: GpuType, status: NodeStatus) -> Self {
        let capacity = gpu_type.capacity();
        Self {
            id: Uuid::new_v4(),
            name,
            gpu_type,
            capacity,
            status,
            cpu_allocation_pct: 0.0,
            gpus: (0..capacity.total_gpus).map(GpuUnit::idle).collect(),
            queue: Vec::new(),
            last_updated: Utc::now(),
        }
    }

    /// Register a node from its first telemetry snapshot
    pub fn from_snapshot(snapshot: &NodeSnapshot) -> Self {
        let mut node = Node::new(snapshot.name.clone(), snapshot.gpu_type, snapshot.status);
        node.apply_snapshot(snapshot);
        node
    }

    /// Refresh telemetry-owned state, preserving identity and queue
    pub fn apply_snapshot(&mut self, snapshot: &NodeSnapshot) {
        self.status = snapshot.status;
        self.cpu_allocation_pct = snapshot.cpu_allocation_pct;
        self.gpus = snapshot.gpus.clone();
        self.last_updated = Utc::now();
    }

    /// Number of GPUs with usage > 0
    pub fn active_gpu_count(&self) -> u32 {
        self.gpus.iter().filter(|g| g.is_active()).count() as u32
    }

    /// Aggregate GPU usage percentage under the given mode
    ///
    /// The denominator is the class capacity, so GPU slots missing from a
    /// telemetry report count as idle.
    pub fn gpu_allocation_pct(&self, mode: GpuAggregation) -> f64 {
        let total = self.capacity.total_gpus;
        if total == 0 {
            return 0.0;
        }
        match mode {
            GpuAggregation::ActiveFraction => {
                self.active_gpu_count() as f64 / total as f64 * 100.0
            }
            GpuAggregation::MeanUsage => {
                let sum: u32 = self.gpus.iter().map(|g| g.usage_pct).sum();
                sum as f64 / total as f64
            }
        }
    }

    /// Whether this node is a scheduling candidate
    pub fn is_schedulable(&self) -> bool {
        self.status.is_schedulable()
    }
}

/// Telemetry-facing shape of a node
///
/// Queues are core-owned and never part of a snapshot; everything else is
/// refreshed wholesale on ingest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSnapshot {
    /// Unique display name
    pub name: String,
    /// GPU class
    pub gpu_type: GpuType,
    /// Operational status
    pub status: NodeStatus,
    /// Aggregate CPU allocation percentage
    pub cpu_allocation_pct: f64,
    /// GPU slots with their current allocations
    pub gpus: Vec<GpuUnit>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_with_one_active_gpu() -> Node {
        let mut node = Node::new("Node-A100-02".to_string(), GpuType::A100, NodeStatus::Online);
        node.gpus[0].usage_pct = 85;
        node.gpus[0].allocations.push(Allocation {
            user: "A".to_string(),
            team: "Data Science".to_string(),
            percentage: 85,
            job_type: "Training".to_string(),
            minutes_running: 120,
        });
        node
    }

    #[test]
    fn test_new_node_is_idle() {
        let node = Node::new("Node-H200-01".to_string(), GpuType::H200, NodeStatus::Online);
        assert_eq!(node.gpus.len(), 2);
        assert!(node.gpus.iter().all(|g| !g.is_active()));
        assert!(node.queue.is_empty());
        assert_eq!(node.capacity, GpuType::H200.capacity());
    }

    #[test]
    fn test_active_fraction_aggregation() {
        let node = node_with_one_active_gpu();
        let pct = node.gpu_allocation_pct(GpuAggregation::ActiveFraction);
        assert!((pct - 12.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_mean_usage_aggregation() {
        let node = node_with_one_active_gpu();
        let pct = node.gpu_allocation_pct(GpuAggregation::MeanUsage);
        assert!((pct - 85.0 / 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_oversubscription_is_not_clamped() {
        let mut gpu = GpuUnit::idle(0);
        gpu.usage_pct = 100;
        gpu.allocations = vec![
            Allocation {
                user: "a".to_string(),
                team: "t".to_string(),
                percentage: 70,
                job_type: "Training".to_string(),
                minutes_running: 10,
            },
            Allocation {
                user: "b".to_string(),
                team: "t".to_string(),
                percentage: 50,
                job_type: "Inference".to_string(),
                minutes_running: 5,
            },
        ];
        assert_eq!(gpu.total_allocated_pct(), 120);
        assert!(gpu.consistency_violation().is_none());
    }

    #[test]
    fn test_consistency_violations() {
        let mut idle_with_claims = GpuUnit::idle(3);
        idle_with_claims.allocations.push(Allocation {
            user: "a".to_string(),
            team: "t".to_string(),
            percentage: 10,
            job_type: "Testing".to_string(),
            minutes_running: 1,
        });
        assert!(idle_with_claims.consistency_violation().is_some());

        let mut under_reported = GpuUnit::idle(4);
        under_reported.usage_pct = 30;
        under_reported.allocations.push(Allocation {
            user: "a".to_string(),
            team: "t".to_string(),
            percentage: 60,
            job_type: "Training".to_string(),
            minutes_running: 1,
        });
        assert!(under_reported.consistency_violation().is_some());
    }

    #[test]
    fn test_queue_entry_new() {
        let entry = QueueEntry::new(
            "AI Research".to_string(),
            "kim".to_string(),
            4,
            Priority::Urgent,
        );
        assert_eq!(entry.wait_minutes, 0);
        assert_eq!(entry.gpu_count, 4);
        assert_eq!(entry.priority, Priority::Urgent);
    }

    #[test]
    fn test_snapshot_refresh_preserves_queue() {
        let mut node = node_with_one_active_gpu();
        node.queue.push(QueueEntry::new(
            "NLP Team".to_string(),
            "choi".to_string(),
            2,
            Priority::Normal,
        ));

        let snapshot = NodeSnapshot {
            name: node.name.clone(),
            gpu_type: node.gpu_type,
            status: NodeStatus::Maintenance,
            cpu_allocation_pct: 45.0,
            gpus: (0..8).map(GpuUnit::idle).collect(),
        };
        node.apply_snapshot(&snapshot);

        assert_eq!(node.status, NodeStatus::Maintenance);
        assert_eq!(node.queue.len(), 1);
        assert_eq!(node.active_gpu_count(), 0);
        assert!(!node.is_schedulable());
    }
}
