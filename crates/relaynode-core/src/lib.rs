//! Node resolution core for relaynode.
//!
//! Resolves the user/post/comment graph through three cooperating parts:
//!
//! - **Identity** -- global [`NodeRef`](relaynode_types::NodeRef)s decode to
//!   an entity type and a store key.
//! - **Loading** -- per-request [`BatchLoader`]s coalesce every lookup made
//!   in one synchronous stretch into a single keyed fetch per entity type,
//!   and cache results for the rest of the request.
//! - **Pagination** -- the [`PaginationEngine`] reads ordered identity rows
//!   by keyset (or offset, for the feed) and the [`assembler`] joins them
//!   with loaded entities into a [`Connection`](relaynode_types::Connection).
//!
//! # Request flow
//!
//! ```text
//! handler
//!   +-- RequestContext::new(port, engine)     (fresh loaders, request id)
//!   +-- fields::user_posts(ctx, "users:1", args)
//!         |-- parent lookup      -> BatchLoader<users>
//!         |-- PaginationEngine   -> QueryPort::fetch_page
//!         +-- assemble           -> BatchLoader<posts> (one batch)
//! ```
//!
//! # Modules
//!
//! - [`loader`] -- Batching, caching per-request loader
//! - [`context`] -- The per-request [`RequestContext`]
//! - [`pagination`] -- Keyset and feed pagination
//! - [`assembler`] -- Connection assembly from page slices
//! - [`fields`] -- Field resolvers exposed by the API
//! - [`error`] -- [`ResolveError`] and [`BatchFetchError`]

pub mod assembler;
pub mod context;
pub mod error;
pub mod fields;
pub mod loader;
pub mod pagination;

#[cfg(test)]
pub(crate) mod testing;

pub use assembler::{EdgeOrder, assemble};
pub use context::RequestContext;
pub use error::{BatchFetchError, ResolveError};
pub use fields::{CommentInput, NodeCounts, PostInput};
pub use loader::{BatchLoader, LoadFuture};
pub use pagination::{
    DEFAULT_MAX_PAGE_SIZE, PageArgs, PageSlice, PageSpec, PageVariant, PaginationEngine,
};
