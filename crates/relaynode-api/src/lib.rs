//! HTTP API server for relaynode.
//!
//! Exposes the node resolution core over JSON endpoints instead of a
//! query-language endpoint: each resolvable field (node lookup, the
//! viewer, the posts, comments and feed connections, counts) has a fixed
//! route. Connections use the standard shape:
//!
//! ```json
//! { "edges": [{ "cursor": "...", "node": { "__typename": "Post", "id": "posts:1", ... } }],
//!   "pageInfo": { "hasNextPage": true, "hasPreviousPage": false,
//!                 "startCursor": "...", "endCursor": "..." } }
//! ```
//!
//! # Architecture
//!
//! ```text
//! relaynode-server (main.rs)
//!   +-- RelaynodeConfig (relaynode.yaml + env)
//!   +-- Backend::connect  -> PgNodeStore | MemoryStore  (+ seed)
//!   +-- build_router
//!         +-- basic auth (/api)
//!         +-- handlers -> RequestContext per request -> fields::*
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;

// Re-export primary types for convenience.
pub use config::{ConfigError, RelaynodeConfig};
pub use error::ApiError;
pub use router::build_router;
pub use server::{ServerError, start_server};
pub use state::{AppState, Backend};
