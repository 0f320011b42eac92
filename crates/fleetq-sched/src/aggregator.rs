//! Read-side fleet roll-ups

use serde::{Deserialize, Serialize};

use fleetq_core::{GpuAggregation, GpuType, Node, Priority};

use crate::estimator::{average_wait_minutes, WaitModel};

/// One row of the fleet overview
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSummary {
    /// Node display name
    pub node_name: String,
    /// GPU class
    pub gpu_type: GpuType,
    /// Aggregate CPU allocation percentage
    pub cpu_usage_pct: f64,
    /// Aggregate GPU usage percentage under the configured mode
    pub gpu_usage_pct: f64,
}

/// One job's share of a GPU, as displayed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobView {
    /// Owning user of the allocation
    pub job_name: String,
    /// Allocated percentage
    pub usage: u32,
}

/// Per-GPU breakdown within a node detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpuBreakdown {
    /// Device index
    pub gpu_index: u32,
    /// Sum of allocation percentages; over 100 means oversubscription
    pub total_usage_pct: u32,
    /// Classification of the total
    pub usage_class: UsageClass,
    /// Jobs on this device
    pub jobs: Vec<JobView>,
}

/// Per-GPU view of one node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDetail {
    /// Node display name
    pub node_name: String,
    /// Aggregate CPU allocation percentage
    pub cpu_usage_pct: f64,
    /// Breakdown per device
    pub gpus: Vec<GpuBreakdown>,
}

/// Classification of a GPU's summed allocation percentage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageClass {
    Nominal,
    Moderate,
    High,
    Saturated,
}

impl UsageClass {
    /// Fixed breakpoints at 50, 80, and 100
    pub fn from_pct(pct: u32) -> Self {
        match pct {
            p if p < 50 => UsageClass::Nominal,
            p if p < 80 => UsageClass::Moderate,
            p if p < 100 => UsageClass::High,
            _ => UsageClass::Saturated,
        }
    }
}

/// Queue figures for one node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStats {
    /// Entries currently queued
    pub length: usize,
    /// Entries with urgent priority
    pub urgent_count: usize,
    /// Mean accumulated wait across entries
    pub average_wait_minutes: u64,
    /// Estimated wait for a request submitted now
    pub estimated_new_wait_minutes: u64,
}

/// Fleet-wide totals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetStatus {
    /// Registered nodes
    pub nodes: usize,
    /// Nodes currently accepting work
    pub schedulable_nodes: usize,
    /// GPU slots across the fleet
    pub total_gpus: u32,
    /// GPU slots with usage > 0
    pub active_gpus: u32,
    /// Queued entries across the fleet
    pub queued_entries: usize,
}

/// One overview row per node; callers filter by type or status
pub fn summarize(nodes: &[Node], mode: GpuAggregation) -> Vec<NodeSummary> {
    nodes
        .iter()
        .map(|node| NodeSummary {
            node_name: node.name.clone(),
            gpu_type: node.gpu_type,
            cpu_usage_pct: node.cpu_allocation_pct,
            gpu_usage_pct: node.gpu_allocation_pct(mode),
        })
        .collect()
}

/// Per-GPU breakdown of one node
///
/// `total_usage_pct` is the raw allocation sum so oversubscription stays
/// visible; classification runs on that sum, not the telemetry usage.
pub fn detail(node: &Node) -> NodeDetail {
    let gpus = node
        .gpus
        .iter()
        .map(|gpu| {
            let total = gpu.total_allocated_pct();
            GpuBreakdown {
                gpu_index: gpu.index,
                total_usage_pct: total,
                usage_class: UsageClass::from_pct(total),
                jobs: gpu
                    .allocations
                    .iter()
                    .map(|a| JobView {
                        job_name: a.user.clone(),
                        usage: a.percentage,
                    })
                    .collect(),
            }
        })
        .collect();

    NodeDetail {
        node_name: node.name.clone(),
        cpu_usage_pct: node.cpu_allocation_pct,
        gpus,
    }
}

/// Queue figures for one node under the given wait model
pub fn queue_stats(node: &Node, model: &dyn WaitModel) -> QueueStats {
    QueueStats {
        length: node.queue.len(),
        urgent_count: node
            .queue
            .iter()
            .filter(|e| e.priority == Priority::Urgent)
            .count(),
        average_wait_minutes: average_wait_minutes(&node.queue),
        estimated_new_wait_minutes: model.estimate(&node.queue, &node.capacity),
    }
}

/// Totals across the fleet
pub fn fleet_status(nodes: &[Node]) -> FleetStatus {
    FleetStatus {
        nodes: nodes.len(),
        schedulable_nodes: nodes.iter().filter(|n| n.is_schedulable()).count(),
        total_gpus: nodes.iter().map(|n| n.capacity.total_gpus).sum(),
        active_gpus: nodes.iter().map(|n| n.active_gpu_count()).sum(),
        queued_entries: nodes.iter().map(|n| n.queue.len()).sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetq_core::{Allocation, NodeStatus, QueueEntry};

    fn create_test_node() -> Node {
        let mut node = Node::new(
            "Node-A100-01".to_string(),
            GpuType::A100,
            NodeStatus::Online,
        );
        node.gpus[0].usage_pct = 85;
        node.gpus[0].allocations.push(Allocation {
            user: "A".to_string(),
            team: "Data Science".to_string(),
            percentage: 85,
            job_type: "Training".to_string(),
            minutes_running: 240,
        });
        node
    }

    struct FixedWait(u64);

    impl WaitModel for FixedWait {
        fn estimate(&self, _: &[QueueEntry], _: &fleetq_core::NodeCapacity) -> u64 {
            self.0
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    #[test]
    fn test_usage_classification() {
        assert_eq!(UsageClass::from_pct(45), UsageClass::Nominal);
        assert_eq!(UsageClass::from_pct(65), UsageClass::Moderate);
        assert_eq!(UsageClass::from_pct(85), UsageClass::High);
        assert_eq!(UsageClass::from_pct(120), UsageClass::Saturated);
    }

    #[test]
    fn test_classification_breakpoints() {
        assert_eq!(UsageClass::from_pct(49), UsageClass::Nominal);
        assert_eq!(UsageClass::from_pct(50), UsageClass::Moderate);
        assert_eq!(UsageClass::from_pct(79), UsageClass::Moderate);
        assert_eq!(UsageClass::from_pct(80), UsageClass::High);
        assert_eq!(UsageClass::from_pct(99), UsageClass::High);
        assert_eq!(UsageClass::from_pct(100), UsageClass::Saturated);
    }

    #[test]
    fn test_summarize_single_active_gpu() {
        let node = create_test_node();
        let rows = summarize(&[node], GpuAggregation::ActiveFraction);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].node_name, "Node-A100-01");
        assert_eq!(rows[0].gpu_type, GpuType::A100);
        assert!((rows[0].gpu_usage_pct - 12.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_summarize_does_not_filter_by_status() {
        let mut offline = create_test_node();
        offline.status = NodeStatus::Offline;
        let rows = summarize(&[offline], GpuAggregation::ActiveFraction);
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_detail_reports_job_per_allocation() {
        let node = create_test_node();
        let detail = detail(&node);
        assert_eq!(detail.node_name, "Node-A100-01");
        assert_eq!(detail.gpus.len(), 8);

        let busy = &detail.gpus[0];
        assert_eq!(busy.jobs.len(), 1);
        assert_eq!(busy.jobs[0].job_name, "A");
        assert_eq!(busy.jobs[0].usage, 85);
        assert_eq!(busy.total_usage_pct, 85);
        assert_eq!(busy.usage_class, UsageClass::High);

        assert!(detail.gpus[1..].iter().all(|g| g.jobs.is_empty()));
    }

    #[test]
    fn test_detail_keeps_oversubscription_visible() {
        let mut node = create_test_node();
        node.gpus[0].allocations.push(Allocation {
            user: "B".to_string(),
            team: "NLP Team".to_string(),
            percentage: 35,
            job_type: "Inference".to_string(),
            minutes_running: 30,
        });
        let detail = detail(&node);
        assert_eq!(detail.gpus[0].total_usage_pct, 120);
        assert_eq!(detail.gpus[0].usage_class, UsageClass::Saturated);
    }

    #[test]
    fn test_queue_stats() {
        let mut node = create_test_node();
        let mut first = QueueEntry::new("a".to_string(), "u1".to_string(), 2, Priority::Urgent);
        first.wait_minutes = 10;
        let mut second = QueueEntry::new("b".to_string(), "u2".to_string(), 1, Priority::Normal);
        second.wait_minutes = 20;
        node.queue = vec![first, second];

        let stats = queue_stats(&node, &FixedWait(42));
        assert_eq!(stats.length, 2);
        assert_eq!(stats.urgent_count, 1);
        assert_eq!(stats.average_wait_minutes, 15);
        assert_eq!(stats.estimated_new_wait_minutes, 42);
    }

    #[test]
    fn test_fleet_status_totals() {
        let online = create_test_node();
        let mut maintenance = Node::new(
            "Node-H200-01".to_string(),
            GpuType::H200,
            NodeStatus::Maintenance,
        );
        maintenance
            .queue
            .push(QueueEntry::new("t".to_string(), "u".to_string(), 1, Priority::Normal));

        let status = fleet_status(&[online, maintenance]);
        assert_eq!(status.nodes, 2);
        assert_eq!(status.schedulable_nodes, 1);
        assert_eq!(status.total_gpus, 10);
        assert_eq!(status.active_gpus, 1);
        assert_eq!(status.queued_entries, 1);
    }
}
