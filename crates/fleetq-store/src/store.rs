//! Durable node state

use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

use fleetq_core::{FleetResult, Node};

/// One JSON document per node under a base path
///
/// A document holds the node's full tuple: capacity, GPU list with
/// allocations, and the queue in order. Writes land in a temp file and are
/// renamed into place, so a crashed write never leaves a torn document.
pub struct FleetStore {
    /// Base path for node documents
    base_path: PathBuf,
}

impl FleetStore {
    /// Create a store rooted at the given directory
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// Create the state directory if needed
    pub async fn init(&self) -> FleetResult<()> {
        if !self.base_path.exists() {
            fs::create_dir_all(&self.base_path).await?;
            info!(path = %self.base_path.display(), "Created node state directory");
        }
        Ok(())
    }

    fn node_path(&self, id: Uuid) -> PathBuf {
        self.base_path.join(format!("{id}.json"))
    }

    /// Persist one node's full state
    pub async fn save_node(&self, node: &Node) -> FleetResult<()> {
        let payload = serde_json::to_vec_pretty(node)?;
        let path = self.node_path(node.id);
        let tmp = path.with_extension("json.tmp");

        fs::write(&tmp, &payload).await?;
        fs::rename(&tmp, &path).await?;

        debug!(node = %node.name, path = %path.display(), "Node state saved");
        Ok(())
    }

    /// Load every node document under the base path
    ///
    /// Unreadable documents are skipped with a warning rather than failing
    /// the whole boot.
    pub async fn load_all(&self) -> FleetResult<Vec<Node>> {
        if !self.base_path.exists() {
            return Ok(Vec::new());
        }

        let mut nodes = Vec::new();
        let mut dir = fs::read_dir(&self.base_path).await?;
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let content = fs::read(&path).await?;
            match serde_json::from_slice::<Node>(&content) {
                Ok(node) => nodes.push(node),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable node document");
                }
            }
        }

        nodes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(nodes)
    }
}
