//! Fleet state registry

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use fleetq_core::{
    FleetError, FleetResult, GpuAggregation, GpuType, Node, NodeSnapshot, Priority, QueueEntry,
    ResourceConfig,
};
use fleetq_store::FleetStore;

use crate::aggregator::{self, FleetStatus, NodeDetail, NodeSummary, QueueStats};
use crate::estimator::WaitModel;
use crate::queue;
use crate::validator;

type NodeRef = Arc<RwLock<Node>>;
type NodesMap = HashMap<Uuid, NodeRef>;
type NameIndex = HashMap<String, Uuid>;

/// A job submission as received from clients
///
/// Everything arrives optional; `submit` owns the required-field checks so
/// a violation surfaces as a structured rejection, not a parse failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubmitRequest {
    /// GPU class tag (required)
    pub gpu_type: Option<String>,
    /// Requested per-replica resources (required)
    pub resource_config: Option<ResourceConfig>,
    /// Replica count, defaults to 1
    pub node_count: Option<u32>,
    /// Container image (required)
    pub image: Option<String>,
    /// Priority class, defaults to normal
    pub priority: Option<Priority>,
    /// Justification, required when priority is urgent
    pub urgent_reason: Option<String>,
    /// Target node name; chosen automatically when absent
    pub node: Option<String>,
    /// Requesting team
    pub team: Option<String>,
    /// Requesting user
    pub user: Option<String>,
}

/// Reply to an accepted submission
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    /// Queue entry created for the request
    pub entry_id: Uuid,
    /// Node the request was queued on
    pub node_name: String,
    /// 1-based position in the target queue
    pub position: usize,
    /// Wait estimate from the configured model
    pub estimated_wait_minutes: u64,
}

/// One node's queue with its id and derived figures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueView {
    /// Node identifier (reorder commits are keyed by it)
    pub node_id: Uuid,
    /// Node display name
    pub node_name: String,
    /// Entries in queue order
    pub entries: Vec<QueueEntry>,
    /// Derived queue figures
    pub stats: QueueStats,
}

/// Keyed store of the fleet
///
/// The outer lock only guards map membership; each node carries its own
/// lock, so there is a single writer per node and never a cross-node lock.
/// Queue mutations persist a candidate state first and swap it in only
/// after the write lands; a failed write leaves memory and disk as they
/// were.
pub struct FleetRegistry {
    /// Nodes indexed by id
    nodes: RwLock<NodesMap>,
    /// Display name to id
    name_index: RwLock<NameIndex>,
    /// Durable state, if configured
    store: Option<FleetStore>,
    /// Estimator for new submissions
    wait_model: Arc<dyn WaitModel>,
    /// How per-GPU usage rolls up in summaries
    aggregation: GpuAggregation,
}

impl FleetRegistry {
    /// Create an empty registry
    pub fn new(
        aggregation: GpuAggregation,
        wait_model: Arc<dyn WaitModel>,
        store: Option<FleetStore>,
    ) -> Self {
        info!(
            wait_model = wait_model.name(),
            persistent = store.is_some(),
            "Fleet registry initialized"
        );

        Self {
            nodes: RwLock::new(HashMap::new()),
            name_index: RwLock::new(HashMap::new()),
            store,
            wait_model,
            aggregation,
        }
    }

    /// Restore nodes persisted by a previous run
    pub async fn load_from_store(&self) -> FleetResult<usize> {
        let Some(store) = &self.store else {
            return Ok(0);
        };

        let nodes = store.load_all().await?;
        let count = nodes.len();
        for node in nodes {
            info!(
                node = %node.name,
                node_id = %node.id,
                queued = node.queue.len(),
                "Node restored"
            );
            self.insert_node(node).await;
        }
        Ok(count)
    }

    /// Upsert a node from telemetry
    ///
    /// Unknown names register a new node with an empty queue; known names
    /// refresh status, CPU, and GPUs while the queue is preserved.
    pub async fn ingest(&self, snapshot: NodeSnapshot) -> FleetResult<()> {
        for gpu in &snapshot.gpus {
            if let Some(violation) = gpu.consistency_violation() {
                warn!(node = %snapshot.name, %violation, "Telemetry consistency check failed");
            }
        }

        match self.node_ref_by_name(&snapshot.name).await {
            Some(node_ref) => {
                let mut node = node_ref.write().await;
                if node.gpu_type != snapshot.gpu_type {
                    warn!(
                        node = %node.name,
                        registered = %node.gpu_type,
                        reported = %snapshot.gpu_type,
                        "Ignoring GPU class change from telemetry"
                    );
                }
                node.apply_snapshot(&snapshot);
                debug!(node = %node.name, status = %node.status, "Node refreshed");
            }
            None => {
                let node = Node::from_snapshot(&snapshot);
                info!(
                    node = %node.name,
                    node_id = %node.id,
                    gpu_type = %node.gpu_type,
                    gpus = node.capacity.total_gpus,
                    "Node registered"
                );
                self.persist(&node).await?;
                self.insert_node(node).await;
            }
        }

        Ok(())
    }

    /// Validate a submission and queue it on its target node
    ///
    /// Fleet state is untouched on any rejection.
    pub async fn submit(&self, request: SubmitRequest) -> FleetResult<SubmissionReceipt> {
        let gpu_type_raw = match request.gpu_type.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => s,
            _ => return Err(FleetError::MissingRequiredField("gpuType")),
        };
        let config = request
            .resource_config
            .ok_or(FleetError::MissingRequiredField("resourceConfig"))?;
        let image = match request.image.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => return Err(FleetError::MissingRequiredField("image")),
        };
        let priority = request.priority.unwrap_or_default();
        if priority == Priority::Urgent {
            let has_reason = request
                .urgent_reason
                .as_deref()
                .map(str::trim)
                .is_some_and(|s| !s.is_empty());
            if !has_reason {
                return Err(FleetError::MissingRequiredField("urgentReason"));
            }
        }

        let class: GpuType = gpu_type_raw.parse()?;
        if !config.is_cataloged() {
            return Err(FleetError::UnknownResourceConfig {
                gpu: config.gpu,
                cpu: config.cpu,
                memory: config.memory,
            });
        }

        let replicas = request.node_count.unwrap_or(1).max(1);
        validator::validate_request(&config, replicas, class)?;

        let node_ref = match request.node.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(name) => {
                let node_ref = self
                    .node_ref_by_name(name)
                    .await
                    .ok_or_else(|| FleetError::NodeNotFound(name.to_string()))?;
                {
                    let node = node_ref.read().await;
                    if node.gpu_type != class || !node.is_schedulable() {
                        return Err(FleetError::NoSchedulableNode(class));
                    }
                }
                node_ref
            }
            None => self
                .pick_target(class)
                .await
                .ok_or(FleetError::NoSchedulableNode(class))?,
        };

        let mut node = node_ref.write().await;

        // Estimate against the queue as the submitter saw it
        let estimate = self.wait_model.estimate(&node.queue, &node.capacity);

        let entry = QueueEntry::new(
            request.team.unwrap_or_else(|| "unassigned".to_string()),
            request.user.unwrap_or_else(|| "unknown".to_string()),
            config.gpu * replicas,
            priority,
        );

        let mut candidate = node.clone();
        candidate.queue.push(entry.clone());
        self.persist(&candidate).await?;
        node.queue = candidate.queue;

        info!(
            node = %node.name,
            entry_id = %entry.id,
            gpus = entry.gpu_count,
            priority = %entry.priority,
            image = %image,
            "Submission accepted"
        );

        Ok(SubmissionReceipt {
            entry_id: entry.id,
            node_name: node.name.clone(),
            position: node.queue.len(),
            estimated_wait_minutes: estimate,
        })
    }

    /// Commit a full queue ordering for one node
    ///
    /// The order must be a permutation of the current queue. The new order
    /// is persisted before the in-memory swap; on failure the prior order
    /// stays intact in both places.
    pub async fn reorder_queue(
        &self,
        node_id: Uuid,
        order: &[Uuid],
    ) -> FleetResult<Vec<QueueEntry>> {
        let node_ref = self
            .node_ref_by_id(node_id)
            .await
            .ok_or_else(|| FleetError::NodeNotFound(node_id.to_string()))?;

        let mut node = node_ref.write().await;
        let next = queue::apply_order(&node.queue, order)?;

        let mut candidate = node.clone();
        candidate.queue = next;
        self.persist(&candidate).await?;
        node.queue = candidate.queue;

        info!(node = %node.name, entries = node.queue.len(), "Queue order committed");
        Ok(node.queue.clone())
    }

    /// Remove one entry on admission or cancellation
    pub async fn remove_entry(&self, node_id: Uuid, entry_id: Uuid) -> FleetResult<QueueEntry> {
        let node_ref = self
            .node_ref_by_id(node_id)
            .await
            .ok_or_else(|| FleetError::NodeNotFound(node_id.to_string()))?;

        let mut node = node_ref.write().await;
        let position = node
            .queue
            .iter()
            .position(|e| e.id == entry_id)
            .ok_or(FleetError::EntryNotFound(entry_id))?;

        let mut candidate = node.clone();
        let removed = candidate.queue.remove(position);
        self.persist(&candidate).await?;
        node.queue = candidate.queue;

        info!(node = %node.name, entry_id = %entry_id, "Queue entry removed");
        Ok(removed)
    }

    /// Advance the accumulated wait of every queued entry
    pub async fn tick_wait(&self, minutes: u64) {
        let refs: Vec<NodeRef> = self.nodes.read().await.values().cloned().collect();
        for node_ref in refs {
            let mut node = node_ref.write().await;
            if node.queue.is_empty() {
                continue;
            }
            for entry in &mut node.queue {
                entry.wait_minutes += minutes;
            }
            if let Err(e) = self.persist(&node).await {
                warn!(node = %node.name, error = %e, "Failed to persist wait tick");
            }
        }
    }

    /// Overview rows for every node, sorted by name
    pub async fn summaries(&self) -> Vec<NodeSummary> {
        let nodes = self.cloned_nodes().await;
        aggregator::summarize(&nodes, self.aggregation)
    }

    /// Per-GPU breakdown for one node
    pub async fn detail_by_name(&self, name: &str) -> FleetResult<NodeDetail> {
        let node_ref = self
            .node_ref_by_name(name)
            .await
            .ok_or_else(|| FleetError::NodeNotFound(name.to_string()))?;
        let node = node_ref.read().await;
        Ok(aggregator::detail(&node))
    }

    /// Queue contents and figures for one node
    pub async fn queue_by_name(&self, name: &str) -> FleetResult<QueueView> {
        let node_ref = self
            .node_ref_by_name(name)
            .await
            .ok_or_else(|| FleetError::NodeNotFound(name.to_string()))?;
        let node = node_ref.read().await;
        Ok(QueueView {
            node_id: node.id,
            node_name: node.name.clone(),
            entries: node.queue.clone(),
            stats: aggregator::queue_stats(&node, self.wait_model.as_ref()),
        })
    }

    /// Fleet-wide totals
    pub async fn fleet_status(&self) -> FleetStatus {
        let nodes = self.cloned_nodes().await;
        aggregator::fleet_status(&nodes)
    }

    /// Schedulable node of the class with the shortest queue, ties by name
    async fn pick_target(&self, class: GpuType) -> Option<NodeRef> {
        let refs: Vec<NodeRef> = self.nodes.read().await.values().cloned().collect();

        let mut candidates = Vec::new();
        for node_ref in refs {
            let (eligible, len, name) = {
                let node = node_ref.read().await;
                (
                    node.gpu_type == class && node.is_schedulable(),
                    node.queue.len(),
                    node.name.clone(),
                )
            };
            if eligible {
                candidates.push((len, name, node_ref));
            }
        }

        candidates
            .into_iter()
            .min_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)))
            .map(|(_, _, node_ref)| node_ref)
    }

    async fn node_ref_by_id(&self, id: Uuid) -> Option<NodeRef> {
        self.nodes.read().await.get(&id).cloned()
    }

    async fn node_ref_by_name(&self, name: &str) -> Option<NodeRef> {
        let id = *self.name_index.read().await.get(name)?;
        self.nodes.read().await.get(&id).cloned()
    }

    async fn insert_node(&self, node: Node) {
        let id = node.id;
        let name = node.name.clone();
        self.nodes
            .write()
            .await
            .insert(id, Arc::new(RwLock::new(node)));
        self.name_index.write().await.insert(name, id);
    }

    async fn cloned_nodes(&self) -> Vec<Node> {
        let refs: Vec<NodeRef> = self.nodes.read().await.values().cloned().collect();
        let mut nodes = Vec::with_capacity(refs.len());
        for node_ref in refs {
            nodes.push(node_ref.read().await.clone());
        }
        nodes.sort_by(|a, b| a.name.cmp(&b.name));
        nodes
    }

    async fn persist(&self, node: &Node) -> FleetResult<()> {
        if let Some(store) = &self.store {
            store.save_node(node).await?;
        }
        Ok(())
    }
}
