//! REST endpoint handlers.
//!
//! Every `/api` handler builds a fresh [`RequestContext`] from the shared
//! [`AppState`], so loader caches live exactly as long as one request.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Server status (no auth) |
//! | `GET` | `/api/viewer` | The authenticated user's node |
//! | `GET` | `/api/nodes/{id}` | Single node lookup |
//! | `POST` | `/api/nodes` | Multi-node lookup |
//! | `GET` | `/api/users/{id}/posts` | A user's posts connection |
//! | `POST` | `/api/users/{id}/posts` | Create a post |
//! | `GET` | `/api/posts/{id}/comments` | A post's comments connection |
//! | `POST` | `/api/posts/{id}/comments` | Create a comment as the viewer |
//! | `GET` | `/api/feed` | Global feed, newest first |
//! | `GET` | `/api/counts` | Row counts per type |
//! | `GET`/`PUT` | `/api/nodes/{id}/value` | Diagnostic value store |
//!
//! [`RequestContext`]: relaynode_core::RequestContext

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use relaynode_core::{CommentInput, NodeCounts, PageArgs, PostInput, ResolveError, fields};
use relaynode_types::{Connection, Node, NodeRef};
use serde::{Deserialize, Serialize};

use crate::auth::Viewer;
use crate::error::ApiError;
use crate::state::AppState;

/// Server status.
#[derive(Debug, Serialize)]
pub struct Status {
    /// Service name.
    pub name: &'static str,
    /// Always `ok` while serving.
    pub status: &'static str,
    /// Crate version.
    pub version: &'static str,
    /// Active store backend.
    pub backend: &'static str,
}

/// Body of `POST /api/nodes`.
#[derive(Debug, Deserialize)]
pub struct NodesRequest {
    /// Global identifiers to look up.
    pub ids: Vec<String>,
}

/// Response of `POST /api/nodes`: one entry per requested id, `null` for
/// ids that name no row.
#[derive(Debug, Serialize)]
pub struct NodesResponse {
    /// Nodes in request order.
    pub nodes: Vec<Option<Node>>,
}

/// Body of `PUT /api/nodes/{id}/value`.
#[derive(Debug, Deserialize)]
pub struct ValueRequest {
    /// The value to store.
    pub value: String,
}

/// A stored diagnostic value.
#[derive(Debug, Serialize)]
pub struct ValueResponse {
    /// The node identifier the value is stored under.
    pub id: String,
    /// The stored value.
    pub value: String,
}

/// Query-string page arguments; a rejection becomes an [`ApiError`].
type PageQueryArgs = Result<Query<PageArgs>, QueryRejection>;

/// A JSON body; a rejection becomes an [`ApiError`].
type JsonBody<T> = Result<Json<T>, JsonRejection>;

fn found<T>(value: Option<T>, id: &str) -> Result<Json<T>, ApiError> {
    value
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(id.to_owned()))
}

/// `GET /` -- server status.
pub async fn index(State(state): State<Arc<AppState>>) -> Json<Status> {
    Json(Status {
        name: "relaynode",
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        backend: state.backend.name(),
    })
}

/// `GET /api/viewer` -- the authenticated user's node.
pub async fn viewer(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
) -> Result<Json<Node>, ApiError> {
    let ctx = state.request_context();
    let node = fields::viewer(&ctx, &viewer.username).await?;
    found(node, &viewer.node_id())
}

/// `GET /api/nodes/{id}` -- single node lookup.
pub async fn get_node(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Node>, ApiError> {
    let ctx = state.request_context();
    let node = fields::node(&ctx, &id).await?;
    found(node, &id)
}

/// `POST /api/nodes` -- multi-node lookup, batched per entity type.
pub async fn get_nodes(
    State(state): State<Arc<AppState>>,
    request: JsonBody<NodesRequest>,
) -> Result<Json<NodesResponse>, ApiError> {
    let Json(request) = request?;
    let ctx = state.request_context();
    let nodes = fields::nodes(&ctx, &request.ids).await?;
    tracing::debug!(
        request_id = %ctx.request_id(),
        requested = request.ids.len(),
        batches = ctx.batches_dispatched(),
        "Resolved nodes"
    );
    Ok(Json(NodesResponse { nodes }))
}

/// `GET /api/users/{id}/posts` -- a user's posts.
pub async fn user_posts(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    args: PageQueryArgs,
) -> Result<Json<Connection<Node>>, ApiError> {
    let Query(args) = args?;
    let ctx = state.request_context();
    let connection = fields::user_posts(&ctx, &id, &args).await?;
    found(connection, &id)
}

/// `GET /api/posts/{id}/comments` -- a post's comments.
pub async fn post_comments(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    args: PageQueryArgs,
) -> Result<Json<Connection<Node>>, ApiError> {
    let Query(args) = args?;
    let ctx = state.request_context();
    let connection = fields::post_comments(&ctx, &id, &args).await?;
    found(connection, &id)
}

/// `GET /api/feed` -- every post, newest first.
pub async fn feed(
    State(state): State<Arc<AppState>>,
    args: PageQueryArgs,
) -> Result<Json<Connection<Node>>, ApiError> {
    let Query(args) = args?;
    let ctx = state.request_context();
    Ok(Json(fields::feed(&ctx, &args).await?))
}

/// `GET /api/counts` -- row counts per entity type.
pub async fn counts(State(state): State<Arc<AppState>>) -> Result<Json<NodeCounts>, ApiError> {
    let ctx = state.request_context();
    Ok(Json(fields::counts(&ctx).await?))
}

/// `POST /api/users/{id}/posts` -- create a post by that user.
pub async fn create_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    input: JsonBody<PostInput>,
) -> Result<(StatusCode, Json<Node>), ApiError> {
    let Json(input) = input?;
    let ctx = state.request_context();
    let node = fields::create_post(&ctx, &id, input).await?;
    found(node, &id).map(|node| (StatusCode::CREATED, node))
}

/// `POST /api/posts/{id}/comments` -- comment on a post as the viewer.
pub async fn create_comment(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<String>,
    input: JsonBody<CommentInput>,
) -> Result<(StatusCode, Json<Node>), ApiError> {
    let Json(input) = input?;
    let ctx = state.request_context();
    let author = viewer.node_id();
    let node = fields::create_comment(&ctx, &id, &author, input).await?;
    found(node, &format!("{id} or {author}")).map(|node| (StatusCode::CREATED, node))
}

/// `PUT /api/nodes/{id}/value` -- store a diagnostic value under a node id.
pub async fn put_value(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    request: JsonBody<ValueRequest>,
) -> Result<Json<ValueResponse>, ApiError> {
    let Json(request) = request?;
    NodeRef::decode(&id).map_err(ResolveError::from)?;
    state
        .values
        .write()
        .await
        .insert(id.clone(), request.value.clone());
    tracing::debug!(%id, "Stored value");
    Ok(Json(ValueResponse {
        id,
        value: request.value,
    }))
}

/// `GET /api/nodes/{id}/value` -- read a stored diagnostic value.
pub async fn get_value(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ValueResponse>, ApiError> {
    let value = state.values.read().await.get(&id).cloned();
    let value = value.ok_or_else(|| ApiError::NotFound(format!("no value for {id}")))?;
    Ok(Json(ValueResponse { id, value }))
}
