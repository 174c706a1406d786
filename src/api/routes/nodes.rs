//! Per-node agent endpoints
//!
//! Every `:address` route resolves its agent through the registry, so a
//! request for a node whose agent deactivated transparently lands on a fresh
//! agent.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::debug;

use crate::api::{
    error::{ApiError, ApiResult},
    state::ApiState,
    types::{
        CountersResponse, EnableRequest, NodeInfo, NodesResponse, PropertiesResponse,
        StatisticsResponse,
    },
};
use crate::{AgentSettings, NodeAddress, StatCounter};

fn parse_node(raw: &str) -> ApiResult<NodeAddress> {
    Ok(raw.parse::<NodeAddress>()?)
}

/// GET /api/v1/nodes
///
/// List every node with a running agent
pub async fn list_nodes(State(state): State<ApiState>) -> ApiResult<Json<NodesResponse>> {
    let mut nodes = Vec::new();

    for node in state.registry.active_nodes().await {
        let agent = state.registry.agent(&node).await;

        // skip agents that deactivated while we were listing
        if let Ok(status) = agent.status().await {
            nodes.push(NodeInfo {
                display_name: state.display_name(&node),
                node,
                status,
            });
        }
    }

    Ok(Json(NodesResponse {
        count: nodes.len(),
        nodes,
    }))
}

/// DELETE /api/v1/nodes/:address
///
/// Reads create agents on demand, so this is how a stray address is dropped
pub async fn remove_node(
    State(state): State<ApiState>,
    Path(address): Path<String>,
) -> ApiResult<StatusCode> {
    let node = parse_node(&address)?;

    if state.registry.remove(&node).await {
        debug!(node = %node, "agent removed");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("no agent for node {node}")))
    }
}

/// POST /api/v1/nodes/:address/init
///
/// A `null` body is rejected with 400
pub async fn init_node(
    State(state): State<ApiState>,
    Path(address): Path<String>,
    Json(settings): Json<Option<AgentSettings>>,
) -> ApiResult<StatusCode> {
    let node = parse_node(&address)?;
    debug!(node = %node, "init requested");

    state.registry.init(&node, settings).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/nodes/:address/enabled
pub async fn set_enabled(
    State(state): State<ApiState>,
    Path(address): Path<String>,
    Json(request): Json<EnableRequest>,
) -> ApiResult<StatusCode> {
    let node = parse_node(&address)?;

    state.registry.enable(&node, request.enabled).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/nodes/:address/stop
pub async fn stop_sampling(
    State(state): State<ApiState>,
    Path(address): Path<String>,
) -> ApiResult<StatusCode> {
    let node = parse_node(&address)?;

    state.registry.stop_sampling(&node).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/nodes/:address/statistics
pub async fn get_statistics(
    State(state): State<ApiState>,
    Path(address): Path<String>,
) -> ApiResult<Json<StatisticsResponse>> {
    let node = parse_node(&address)?;
    let history = state.registry.runtime_statistics(&node).await?;

    Ok(Json(StatisticsResponse { node, history }))
}

/// GET /api/v1/nodes/:address/counters
pub async fn get_counters(
    State(state): State<ApiState>,
    Path(address): Path<String>,
) -> ApiResult<Json<CountersResponse>> {
    let node = parse_node(&address)?;
    let counters = state.registry.counters(&node).await?;

    Ok(Json(CountersResponse { node, counters }))
}

/// POST /api/v1/nodes/:address/counters
///
/// One-way push; 202 only means the snapshot was queued
pub async fn report_counters(
    State(state): State<ApiState>,
    Path(address): Path<String>,
    Json(counters): Json<Vec<StatCounter>>,
) -> ApiResult<StatusCode> {
    let node = parse_node(&address)?;

    state.registry.report_counters(&node, counters).await?;

    Ok(StatusCode::ACCEPTED)
}

/// GET /api/v1/nodes/:address/properties
pub async fn get_properties(
    State(state): State<ApiState>,
    Path(address): Path<String>,
) -> ApiResult<Json<PropertiesResponse>> {
    let node = parse_node(&address)?;
    let properties = state.registry.extended_properties(&node).await?;

    Ok(Json(PropertiesResponse { node, properties }))
}
