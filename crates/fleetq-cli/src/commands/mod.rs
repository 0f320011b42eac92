//! CLI commands implementation

use anyhow::Result;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// API client for communicating with the daemon
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Fleet overview row from API
#[derive(Debug, Deserialize)]
pub struct NodeRow {
    pub node_name: String,
    pub gpu_type: String,
    pub cpu_usage_pct: f64,
    pub gpu_usage_pct: f64,
}

/// One job on a GPU
#[derive(Debug, Deserialize)]
pub struct JobRow {
    pub job_name: String,
    pub usage: u32,
}

/// Per-GPU breakdown from API
#[derive(Debug, Deserialize)]
pub struct GpuRow {
    pub gpu_index: u32,
    pub total_usage_pct: u32,
    pub usage_class: String,
    pub jobs: Vec<JobRow>,
}

/// Node detail response
#[derive(Debug, Deserialize)]
pub struct NodeDetailResponse {
    pub node_name: String,
    pub cpu_usage_pct: f64,
    pub gpus: Vec<GpuRow>,
}

/// Queue entry from API
#[derive(Debug, Deserialize)]
pub struct QueueEntryRow {
    pub id: Uuid,
    pub team: String,
    pub user: String,
    pub gpu_count: u32,
    pub wait_minutes: u64,
    pub priority: String,
}

/// Queue figures from API
#[derive(Debug, Deserialize)]
pub struct QueueStatsResponse {
    pub length: usize,
    pub urgent_count: usize,
    pub average_wait_minutes: u64,
    pub estimated_new_wait_minutes: u64,
}

/// Queue view response
#[derive(Debug, Deserialize)]
pub struct QueueViewResponse {
    pub node_id: Uuid,
    #[allow(dead_code)]
    pub node_name: String,
    pub entries: Vec<QueueEntryRow>,
    pub stats: QueueStatsResponse,
}

/// Accepted-submission receipt
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptResponse {
    pub entry_id: Uuid,
    pub node_name: String,
    pub position: usize,
    pub estimated_wait_minutes: u64,
}

/// Structured rejection reason
#[derive(Debug, Deserialize)]
pub struct RejectionResponse {
    pub code: String,
    pub message: String,
}

/// Submission decision from API
#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SubmissionResponse {
    Accepted(ReceiptResponse),
    Rejected { reason: RejectionResponse },
}

/// Resource configuration catalog entry
#[derive(Debug, Deserialize)]
pub struct ConfigRow {
    pub gpu: u32,
    pub cpu: u32,
    pub memory: u32,
    pub max_replicas: Option<u32>,
}

/// Fleet totals
#[derive(Debug, Deserialize)]
pub struct FleetStatusResponse {
    pub nodes: usize,
    pub schedulable_nodes: usize,
    pub total_gpus: u32,
    pub active_gpus: u32,
    pub queued_entries: usize,
}

/// Status response
#[derive(Debug, Deserialize)]
pub struct StatusResponse {
    pub version: String,
    pub fleet: FleetStatusResponse,
}

/// Arguments to the submit command
pub struct SubmitArgs {
    pub gpu_type: String,
    pub gpus: u32,
    pub cpu: u32,
    pub memory: u32,
    pub nodes: u32,
    pub image: String,
    pub priority: String,
    pub reason: Option<String>,
    pub node: Option<String>,
    pub team: Option<String>,
    pub user: Option<String>,
}

/// List nodes in the fleet
pub async fn nodes(client: &ApiClient, gpu_type: Option<String>) -> Result<()> {
    let response = client.client.get(client.url("/api/v1/nodes")).send().await?;

    if response.status().is_success() {
        let mut rows: Vec<NodeRow> = response.json().await?;
        if let Some(filter) = &gpu_type {
            rows.retain(|r| r.gpu_type.eq_ignore_ascii_case(filter));
        }

        if rows.is_empty() {
            println!("No nodes found");
        } else {
            println!(
                "{:<20} {:<10} {:>10} {:>10}",
                "NAME", "GPU TYPE", "CPU %", "GPU %"
            );
            println!("{}", "-".repeat(54));
            for row in rows {
                println!(
                    "{:<20} {:<10} {:>10.1} {:>10.1}",
                    row.node_name, row.gpu_type, row.cpu_usage_pct, row.gpu_usage_pct
                );
            }
        }
    } else {
        let error = response.text().await?;
        eprintln!("Failed to list nodes: {}", error);
    }

    Ok(())
}

/// Show per-GPU detail for one node
pub async fn node(client: &ApiClient, name: &str) -> Result<()> {
    let response = client
        .client
        .get(client.url(&format!("/api/v1/nodes/{}", name)))
        .send()
        .await?;

    if response.status().is_success() {
        let detail: NodeDetailResponse = response.json().await?;

        println!("Node: {}", detail.node_name);
        println!("  CPU usage: {:.1}%", detail.cpu_usage_pct);
        println!();
        for gpu in detail.gpus {
            println!(
                "  GPU {} - {}% ({})",
                gpu.gpu_index, gpu.total_usage_pct, gpu.usage_class
            );
            for job in gpu.jobs {
                println!("    {} - {}%", job.job_name, job.usage);
            }
        }
    } else {
        let error = response.text().await?;
        eprintln!("Node not found: {}", error);
    }

    Ok(())
}

/// Show the wait queue for one node
pub async fn queue(client: &ApiClient, name: &str) -> Result<()> {
    let view = match fetch_queue(client, name).await? {
        Some(view) => view,
        None => return Ok(()),
    };

    if view.entries.is_empty() {
        println!("Queue for '{}' is empty", name);
    } else {
        println!(
            "{:<36} {:<16} {:<12} {:>6} {:>8} {:<8}",
            "ID", "TEAM", "USER", "GPUS", "WAIT", "PRIORITY"
        );
        println!("{}", "-".repeat(92));
        for entry in &view.entries {
            println!(
                "{:<36} {:<16} {:<12} {:>6} {:>6}m {:<8}",
                entry.id, entry.team, entry.user, entry.gpu_count, entry.wait_minutes,
                entry.priority
            );
        }
        println!();
        println!(
            "{} queued ({} urgent), average wait {}m, estimated new wait {}m",
            view.stats.length,
            view.stats.urgent_count,
            view.stats.average_wait_minutes,
            view.stats.estimated_new_wait_minutes
        );
    }

    Ok(())
}

/// Submit a job request
pub async fn submit(client: &ApiClient, args: SubmitArgs) -> Result<()> {
    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct ResourceConfigBody {
        gpu: u32,
        cpu: u32,
        memory: u32,
    }

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct SubmitBody {
        gpu_type: String,
        resource_config: ResourceConfigBody,
        node_count: u32,
        image: String,
        priority: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        urgent_reason: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        node: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        team: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        user: Option<String>,
    }

    let body = SubmitBody {
        gpu_type: args.gpu_type,
        resource_config: ResourceConfigBody {
            gpu: args.gpus,
            cpu: args.cpu,
            memory: args.memory,
        },
        node_count: args.nodes,
        image: args.image,
        priority: args.priority,
        urgent_reason: args.reason,
        node: args.node,
        team: args.team,
        user: args.user,
    };

    let response = client
        .client
        .post(client.url("/api/v1/jobs"))
        .json(&body)
        .send()
        .await?;

    if response.status().is_success() {
        match response.json().await? {
            SubmissionResponse::Accepted(receipt) => {
                println!("Submission accepted");
                println!("  Entry: {}", receipt.entry_id);
                println!("  Node: {}", receipt.node_name);
                println!("  Position: {}", receipt.position);
                println!("  Estimated wait: {}m", receipt.estimated_wait_minutes);
            }
            SubmissionResponse::Rejected { reason } => {
                eprintln!("Submission rejected ({}): {}", reason.code, reason.message);
            }
        }
    } else {
        let error = response.text().await?;
        eprintln!("Failed to submit: {}", error);
    }

    Ok(())
}

/// Move a queue entry to a new position and commit the full order
pub async fn move_entry(
    client: &ApiClient,
    node: &str,
    entry: Uuid,
    position: usize,
) -> Result<()> {
    let view = match fetch_queue(client, node).await? {
        Some(view) => view,
        None => return Ok(()),
    };

    let mut order: Vec<Uuid> = view.entries.iter().map(|e| e.id).collect();
    let Some(from) = order.iter().position(|id| *id == entry) else {
        anyhow::bail!("Entry '{}' not found in queue for '{}'", entry, node);
    };
    if position == 0 || position > order.len() {
        anyhow::bail!("Position must be between 1 and {}", order.len());
    }

    let moved = order.remove(from);
    order.insert(position - 1, moved);

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct ReorderBody {
        node_id: Uuid,
        queue: Vec<Uuid>,
    }

    let response = client
        .client
        .put(client.url("/api/v1/queues"))
        .json(&ReorderBody {
            node_id: view.node_id,
            queue: order,
        })
        .send()
        .await?;

    if response.status().is_success() {
        let committed: Vec<QueueEntryRow> = response.json().await?;
        println!("Queue order committed for '{}':", node);
        for (i, entry) in committed.iter().enumerate() {
            println!(
                "  {}. {} ({} - {} GPUs, {})",
                i + 1,
                entry.id,
                entry.team,
                entry.gpu_count,
                entry.priority
            );
        }
    } else {
        let error = response.text().await?;
        eprintln!("Failed to commit order: {}", error);
    }

    Ok(())
}

/// Cancel a queue entry
pub async fn cancel(client: &ApiClient, node: &str, entry: Uuid) -> Result<()> {
    let view = match fetch_queue(client, node).await? {
        Some(view) => view,
        None => return Ok(()),
    };

    let response = client
        .client
        .delete(client.url(&format!(
            "/api/v1/queues/{}/entries/{}",
            view.node_id, entry
        )))
        .send()
        .await?;

    if response.status().is_success() {
        println!("Entry '{}' cancelled", entry);
    } else {
        let error = response.text().await?;
        eprintln!("Failed to cancel entry: {}", error);
    }

    Ok(())
}

/// List the resource configuration catalog
pub async fn configs(client: &ApiClient, gpu_type: Option<String>) -> Result<()> {
    let mut request = client.client.get(client.url("/api/v1/resource-configs"));
    if let Some(class) = &gpu_type {
        request = request.query(&[("gpu_type", class)]);
    }
    let response = request.send().await?;

    if response.status().is_success() {
        let rows: Vec<ConfigRow> = response.json().await?;

        println!("{:>6} {:>8} {:>10} {:>14}", "GPUS", "CPU %", "MEMORY %", "MAX REPLICAS");
        println!("{}", "-".repeat(42));
        for row in rows {
            let ceiling = row
                .max_replicas
                .map(|m| m.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "{:>6} {:>8} {:>10} {:>14}",
                row.gpu, row.cpu, row.memory, ceiling
            );
        }
    } else {
        let error = response.text().await?;
        eprintln!("Failed to list resource configs: {}", error);
    }

    Ok(())
}

/// Show fleet status
pub async fn status(client: &ApiClient) -> Result<()> {
    let response = client
        .client
        .get(client.url("/api/v1/status"))
        .send()
        .await?;

    if response.status().is_success() {
        let status: StatusResponse = response.json().await?;

        println!("fleetq v{}", status.version);
        println!();
        println!(
            "Nodes: {} ({} schedulable)",
            status.fleet.nodes, status.fleet.schedulable_nodes
        );
        println!(
            "GPUs: {} total, {} active",
            status.fleet.total_gpus, status.fleet.active_gpus
        );
        println!("Queued entries: {}", status.fleet.queued_entries);
    } else {
        let error = response.text().await?;
        eprintln!("Failed to get status: {}", error);
    }

    Ok(())
}

/// Helper to fetch a node's queue view
async fn fetch_queue(client: &ApiClient, name: &str) -> Result<Option<QueueViewResponse>> {
    let response = client
        .client
        .get(client.url(&format!("/api/v1/nodes/{}/queue", name)))
        .send()
        .await?;

    if response.status().is_success() {
        Ok(Some(response.json().await?))
    } else {
        let error = response.text().await?;
        eprintln!("Failed to fetch queue for '{}': {}", name, error);
        Ok(None)
    }
}
