//! HTTP handlers.

use super::error::{ApiError, ApiResult};
use super::AppState;
use crate::graph::{CoMention, Containment, MentionRecord, NodeId, NodeRecord, OwnerId, TaggedNode};
use crate::pipeline::{TagRequest, VocabularyStatus};
use crate::storage::GraphStore;
use crate::taxonomy::MentionType;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Run blocking store or pipeline work off the async runtime.
async fn blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::internal("Task failed").with_message(e.to_string()))?
}

fn parse_node_id(raw: &str) -> ApiResult<NodeId> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid node ID"))
}

fn parse_owner(raw: Option<&str>) -> ApiResult<Option<OwnerId>> {
    raw.map(|s| {
        s.trim()
            .parse()
            .map_err(|_| ApiError::bad_request("Invalid owner_id"))
    })
    .transpose()
}

#[derive(Debug, Default, Deserialize)]
pub struct NodeQuery {
    pub owner_id: Option<String>,
    #[serde(rename = "type")]
    pub node_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub engine: String,
    pub vocabulary: VocabularyStatus,
}

#[derive(Debug, Serialize)]
pub struct NodeLinks {
    pub links: Vec<CoMention>,
    pub relationships: Vec<Containment>,
}

/// POST /tag
pub async fn tag(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<Vec<TaggedNode>>> {
    let value: Value = serde_json::from_slice(&body)
        .map_err(|e| ApiError::bad_request("Invalid request").with_message(e.to_string()))?;
    let request = TagRequest::from_json(&value)?;

    let tagged = blocking(move || Ok(state.tag(&request)?)).await?;
    Ok(Json(tagged))
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let pipeline = state.pipeline()?;
    Ok(Json(HealthResponse {
        status: if pipeline.is_ready() { "ok" } else { "degraded" },
        version: crate::VERSION,
        engine: pipeline.engine_name().to_string(),
        vocabulary: pipeline.status(),
    }))
}

/// POST /admin/vocabulary/rebuild
pub async fn rebuild_vocabulary(
    State(state): State<AppState>,
) -> ApiResult<Json<VocabularyStatus>> {
    let status = blocking(move || Ok(state.rebuild()?)).await?;
    Ok(Json(status))
}

/// Load a node, hiding nodes of other owners when `owner` is given.
fn load_node(state: &AppState, id: NodeId, owner: Option<OwnerId>) -> ApiResult<NodeRecord> {
    state
        .store()
        .get_node(id)?
        .filter(|node| owner.map_or(true, |o| node.owner == o))
        .ok_or_else(|| ApiError::not_found("Node not found"))
}

/// GET /nodes/:id
pub async fn get_node(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<NodeQuery>,
) -> ApiResult<Json<NodeRecord>> {
    let id = parse_node_id(&id)?;
    let owner = parse_owner(query.owner_id.as_deref())?;
    let node = blocking(move || load_node(&state, id, owner)).await?;
    Ok(Json(node))
}

/// GET /nodes/:id/mentions
pub async fn node_mentions(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<NodeQuery>,
) -> ApiResult<Json<Vec<MentionRecord>>> {
    let id = parse_node_id(&id)?;
    let owner = parse_owner(query.owner_id.as_deref())?;
    let mentions = blocking(move || {
        load_node(&state, id, owner)?;
        Ok(state.store().mentions_for_node(id)?)
    })
    .await?;
    Ok(Json(mentions))
}

/// GET /nodes/:id/links
pub async fn node_links(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<NodeQuery>,
) -> ApiResult<Json<NodeLinks>> {
    let id = parse_node_id(&id)?;
    let owner = parse_owner(query.owner_id.as_deref())?;
    let links = blocking(move || {
        load_node(&state, id, owner)?;
        Ok(NodeLinks {
            links: state.store().links_from(id)?,
            relationships: state.store().relationships_for(id)?,
        })
    })
    .await?;
    Ok(Json(links))
}

/// GET /nodes/by-name/:name?owner_id=&type=
pub async fn node_by_name(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<NodeQuery>,
) -> ApiResult<Json<NodeRecord>> {
    let owner = parse_owner(query.owner_id.as_deref())?
        .ok_or_else(|| ApiError::bad_request("Missing owner_id"))?;
    let node_type = query.node_type.as_deref().map(MentionType::parse);

    let node = blocking(move || {
        state
            .store()
            .find_nodes_by_name(&name, owner, node_type.as_ref())?
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::not_found("Node not found"))
    })
    .await?;
    Ok(Json(node))
}
