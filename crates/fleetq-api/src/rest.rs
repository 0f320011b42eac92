//! REST API handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use fleetq_core::{ApiConfig, FleetError, GpuType, QueueEntry, Rejection, ResourceConfig};
use fleetq_sched::{
    validator, FleetRegistry, FleetStatus, NodeDetail, NodeSummary, QueueView,
    SubmissionReceipt, SubmitRequest,
};

/// Application state shared across handlers
pub struct AppState {
    pub registry: Arc<FleetRegistry>,
}

/// Create the API router
pub fn create_router(registry: Arc<FleetRegistry>, config: &ApiConfig) -> Router {
    let state = Arc::new(AppState { registry });

    let mut router = Router::new()
        .route("/api/v1/nodes", get(list_nodes))
        .route("/api/v1/nodes/:name", get(get_node))
        .route("/api/v1/nodes/:name/queue", get(get_queue))
        .route("/api/v1/jobs", post(submit_job))
        .route("/api/v1/queues", put(commit_queue_order))
        .route(
            "/api/v1/queues/:node_id/entries/:entry_id",
            delete(cancel_entry),
        )
        .route("/api/v1/resource-configs", get(list_resource_configs))
        .route("/api/v1/status", get(get_status))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if config.cors_enabled {
        router = router.layer(build_cors(&config.cors_origins));
    }

    router
}

fn build_cors(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|o| o == "*") {
        cors.allow_origin(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        cors.allow_origin(AllowOrigin::list(origins))
    }
}

/// Fleet overview
async fn list_nodes(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<NodeSummary>>, (StatusCode, String)> {
    Ok(Json(state.registry.summaries().await))
}

/// Per-GPU breakdown of one node
async fn get_node(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<NodeDetail>, (StatusCode, String)> {
    let detail = state
        .registry
        .detail_by_name(&name)
        .await
        .map_err(|e| match e {
            FleetError::NodeNotFound(_) => (StatusCode::NOT_FOUND, e.to_string()),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        })?;

    Ok(Json(detail))
}

/// Queue contents and figures for one node
async fn get_queue(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<QueueView>, (StatusCode, String)> {
    let view = state
        .registry
        .queue_by_name(&name)
        .await
        .map_err(|e| match e {
            FleetError::NodeNotFound(_) => (StatusCode::NOT_FOUND, e.to_string()),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        })?;

    Ok(Json(view))
}

/// Submission decision, always HTTP 200
///
/// Accept and reject are both values; only malformed transport input or a
/// service-side failure surfaces as an HTTP error.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SubmissionResponse {
    Accepted(SubmissionReceipt),
    Rejected { reason: Rejection },
}

/// Submit a job request
async fn submit_job(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SubmitRequest>,
) -> Result<Json<SubmissionResponse>, (StatusCode, String)> {
    match state.registry.submit(request).await {
        Ok(receipt) => Ok(Json(SubmissionResponse::Accepted(receipt))),
        Err(e) if e.is_rejection() => Ok(Json(SubmissionResponse::Rejected {
            reason: e.to_rejection(),
        })),
        Err(e) => Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

/// Request to commit a full queue ordering
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderRequest {
    /// Node whose queue is replaced
    pub node_id: Uuid,
    /// Entry ids in their new order
    pub queue: Vec<Uuid>,
}

/// Commit a queue ordering
async fn commit_queue_order(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ReorderRequest>,
) -> Result<Json<Vec<QueueEntry>>, (StatusCode, String)> {
    info!(
        node_id = %request.node_id,
        entries = request.queue.len(),
        "Committing queue order"
    );

    let committed = state
        .registry
        .reorder_queue(request.node_id, &request.queue)
        .await
        .map_err(|e| match e {
            FleetError::NodeNotFound(_) | FleetError::EntryNotFound(_) => {
                (StatusCode::NOT_FOUND, e.to_string())
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        })?;

    Ok(Json(committed))
}

/// Remove a queue entry
async fn cancel_entry(
    State(state): State<Arc<AppState>>,
    Path((node_id, entry_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, (StatusCode, String)> {
    info!(node_id = %node_id, entry_id = %entry_id, "Cancelling queue entry");

    state
        .registry
        .remove_entry(node_id, entry_id)
        .await
        .map_err(|e| match e {
            FleetError::NodeNotFound(_) | FleetError::EntryNotFound(_) => {
                (StatusCode::NOT_FOUND, e.to_string())
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        })?;

    Ok(StatusCode::NO_CONTENT)
}

/// Filter for the resource configuration catalog
#[derive(Debug, Deserialize)]
pub struct ConfigsQuery {
    /// GPU class used to derive per-configuration replica ceilings
    pub gpu_type: Option<String>,
}

/// One catalog entry, with the replica ceiling when a class is given
#[derive(Debug, Serialize)]
pub struct ResourceConfigResponse {
    pub gpu: u32,
    pub cpu: u32,
    pub memory: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_replicas: Option<u32>,
}

/// List the resource configuration catalog
async fn list_resource_configs(
    Query(query): Query<ConfigsQuery>,
) -> Result<Json<Vec<ResourceConfigResponse>>, (StatusCode, String)> {
    let class = match query.gpu_type.as_deref() {
        Some(raw) => Some(
            raw.parse::<GpuType>()
                .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?,
        ),
        None => None,
    };

    let responses = ResourceConfig::catalog()
        .iter()
        .map(|c| ResourceConfigResponse {
            gpu: c.gpu,
            cpu: c.cpu,
            memory: c.memory,
            max_replicas: class.map(|class| validator::max_replicas(c, class)),
        })
        .collect();

    Ok(Json(responses))
}

/// Service status response
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub version: String,
    pub fleet: FleetStatus,
}

/// Get service status
async fn get_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatusResponse>, (StatusCode, String)> {
    Ok(Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        fleet: state.registry.fleet_status().await,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetq_core::GpuAggregation;
    use fleetq_sched::ThroughputWaitModel;

    fn create_test_registry() -> Arc<FleetRegistry> {
        Arc::new(FleetRegistry::new(
            GpuAggregation::ActiveFraction,
            Arc::new(ThroughputWaitModel {
                service_minutes_per_gpu: 8.0,
            }),
            None,
        ))
    }

    #[tokio::test]
    async fn test_create_router() {
        let _router = create_router(create_test_registry(), &ApiConfig::default());
    }

    #[tokio::test]
    async fn test_create_router_with_origin_list() {
        let config = ApiConfig {
            cors_origins: vec!["http://dashboard.local".to_string()],
            ..ApiConfig::default()
        };
        let _router = create_router(create_test_registry(), &config);
    }

    #[test]
    fn test_submission_response_wire_shape() {
        let accepted = SubmissionResponse::Accepted(SubmissionReceipt {
            entry_id: Uuid::nil(),
            node_name: "Node-A100-01".to_string(),
            position: 3,
            estimated_wait_minutes: 25,
        });
        let json = serde_json::to_value(&accepted).unwrap();
        assert_eq!(json["status"], "accepted");
        assert_eq!(json["nodeName"], "Node-A100-01");
        assert_eq!(json["estimatedWaitMinutes"], 25);

        let rejected = SubmissionResponse::Rejected {
            reason: FleetError::MissingRequiredField("gpuType").to_rejection(),
        };
        let json = serde_json::to_value(&rejected).unwrap();
        assert_eq!(json["status"], "rejected");
        assert_eq!(json["reason"]["code"], "missing_required_field");
        assert_eq!(json["reason"]["field"], "gpuType");
    }

    #[tokio::test]
    async fn test_list_resource_configs_with_class() {
        let Json(rows) = list_resource_configs(Query(ConfigsQuery {
            gpu_type: Some("A100".to_string()),
        }))
        .await
        .unwrap();

        assert_eq!(rows.len(), ResourceConfig::catalog().len());
        for row in &rows {
            // A100 ceiling is 8
            assert_eq!(row.max_replicas, Some(8 / row.gpu));
        }
    }

    #[tokio::test]
    async fn test_list_resource_configs_without_class() {
        let Json(rows) = list_resource_configs(Query(ConfigsQuery { gpu_type: None }))
            .await
            .unwrap();
        assert!(rows.iter().all(|r| r.max_replicas.is_none()));
    }

    #[tokio::test]
    async fn test_list_resource_configs_rejects_unknown_class() {
        let result = list_resource_configs(Query(ConfigsQuery {
            gpu_type: Some("B200".to_string()),
        }))
        .await;
        assert!(matches!(result, Err((StatusCode::BAD_REQUEST, _))));
    }

    #[test]
    fn test_reorder_request_parse() {
        let id = Uuid::new_v4();
        let entry = Uuid::new_v4();
        let body = format!(r#"{{"nodeId":"{id}","queue":["{entry}"]}}"#);
        let request: ReorderRequest = serde_json::from_str(&body).unwrap();
        assert_eq!(request.node_id, id);
        assert_eq!(request.queue, vec![entry]);
    }
}
