//! Axum router construction.
//!
//! Assembles all routes into a single [`Router`] with CORS and request
//! tracing. Everything under `/api` sits behind basic auth.

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::require_basic_auth;
use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router.
///
/// The router includes:
/// - `GET /` -- status (unauthenticated)
/// - `GET /api/viewer` -- the viewer's node
/// - `GET /api/nodes/{id}`, `POST /api/nodes` -- node lookup
/// - `GET|POST /api/users/{id}/posts` -- posts connection, create post
/// - `GET|POST /api/posts/{id}/comments` -- comments connection, create comment
/// - `GET /api/feed` -- global feed
/// - `GET /api/counts` -- row counts
/// - `GET|PUT /api/nodes/{id}/value` -- diagnostic value store
///
/// CORS allows any origin.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/viewer", get(handlers::viewer))
        .route("/nodes", post(handlers::get_nodes))
        .route("/nodes/{id}", get(handlers::get_node))
        .route(
            "/nodes/{id}/value",
            get(handlers::get_value).put(handlers::put_value),
        )
        .route(
            "/users/{id}/posts",
            get(handlers::user_posts).post(handlers::create_post),
        )
        .route(
            "/posts/{id}/comments",
            get(handlers::post_comments).post(handlers::create_comment),
        )
        .route("/feed", get(handlers::feed))
        .route("/counts", get(handlers::counts))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            require_basic_auth,
        ));

    Router::new()
        .route("/", get(handlers::index))
        .nest("/api", api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
