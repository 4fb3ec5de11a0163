//! Per-request resolution state.

use futures::future::{self, Either, Ready};
use relaynode_db::QueryPort;
use relaynode_types::{EntityType, Node, NodeRef};
use uuid::Uuid;

use crate::error::{BatchFetchError, ResolveError};
use crate::loader::{BatchLoader, LoadFuture};
use crate::pagination::PaginationEngine;

/// Everything a resolver needs for one request.
///
/// Owns one [`BatchLoader`] per [`EntityType`]. A context is built when a
/// request starts and dropped when it ends; caches never outlive it and
/// are never shared with another request.
#[derive(Debug)]
pub struct RequestContext<Q: QueryPort> {
    request_id: Uuid,
    port: Q,
    pagination: PaginationEngine,
    users: BatchLoader<Q>,
    posts: BatchLoader<Q>,
    comments: BatchLoader<Q>,
}

impl<Q: QueryPort> RequestContext<Q> {
    /// Start a request with fresh, empty loaders and a new request id.
    pub fn new(port: Q, pagination: PaginationEngine) -> Self {
        Self {
            request_id: Uuid::now_v7(),
            users: BatchLoader::new(EntityType::User, port.clone()),
            posts: BatchLoader::new(EntityType::Post, port.clone()),
            comments: BatchLoader::new(EntityType::Comment, port.clone()),
            port,
            pagination,
        }
    }

    /// Unique id of this request, for log correlation.
    pub const fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// The store handle.
    pub const fn port(&self) -> &Q {
        &self.port
    }

    /// The pagination engine configured for this request.
    pub const fn pagination(&self) -> &PaginationEngine {
        &self.pagination
    }

    /// The loader for `entity`.
    pub const fn loader(&self, entity: EntityType) -> &BatchLoader<Q> {
        match entity {
            EntityType::User => &self.users,
            EntityType::Post => &self.posts,
            EntityType::Comment => &self.comments,
        }
    }

    /// Load the row a decoded identifier names.
    ///
    /// The load is registered before this returns. An identifier whose
    /// local key is not a store key resolves to `Ok(None)` without a fetch.
    pub fn load_ref(
        &self,
        node_ref: &NodeRef,
    ) -> Either<LoadFuture, Ready<Result<Option<Node>, BatchFetchError>>> {
        match node_ref.store_key() {
            Some(key) => Either::Left(self.loader(node_ref.entity()).load(key)),
            None => Either::Right(future::ready(Ok(None))),
        }
    }

    /// Decode `id` and load the row it names.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::InvalidIdentifier`] for a malformed or
    /// unknown-type identifier and [`ResolveError::BatchFetch`] if the
    /// batch fails. A valid identifier with no row is `Ok(None)`.
    pub async fn node(&self, id: &str) -> Result<Option<Node>, ResolveError> {
        let node_ref = NodeRef::decode(id)?;
        Ok(self.load_ref(&node_ref).await?)
    }

    /// Total batches dispatched by this request's loaders.
    pub fn batches_dispatched(&self) -> u64 {
        EntityType::ALL
            .iter()
            .map(|&entity| self.loader(entity).batches_dispatched())
            .fold(0, u64::saturating_add)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::seeded_port;

    #[tokio::test]
    async fn node_lookup_decodes_and_loads() {
        let port = seeded_port().await;
        let ctx = RequestContext::new(port, PaginationEngine::default());

        let post = ctx.node("posts:4").await.unwrap().unwrap();
        assert_eq!(post.node_ref().to_string(), "posts:4");

        let user = ctx.node("users:2").await.unwrap().unwrap();
        assert_eq!(user.entity_type(), EntityType::User);
    }

    #[tokio::test]
    async fn absent_rows_are_not_errors() {
        let port = seeded_port().await;
        let ctx = RequestContext::new(port.clone(), PaginationEngine::default());

        assert_eq!(ctx.node("posts:999").await.unwrap(), None);
        assert_eq!(ctx.node("posts:abc").await.unwrap(), None);
        // A non-integer key never reaches the store.
        assert_eq!(port.batches(), vec![vec![999]]);
    }

    #[tokio::test]
    async fn malformed_identifiers_are_rejected() {
        let port = seeded_port().await;
        let ctx = RequestContext::new(port.clone(), PaginationEngine::default());

        for bad in ["posts", "widgets:1", ":1", "posts:", "posts:1:2"] {
            assert!(
                matches!(ctx.node(bad).await, Err(ResolveError::InvalidIdentifier(_))),
                "{bad} should be rejected"
            );
        }
        assert_eq!(port.fetch_calls(), 0);
    }

    #[tokio::test]
    async fn contexts_do_not_share_caches() {
        let port = seeded_port().await;
        let first = RequestContext::new(port.clone(), PaginationEngine::default());
        let second = RequestContext::new(port.clone(), PaginationEngine::default());

        first.node("posts:1").await.unwrap();
        first.node("posts:1").await.unwrap();
        second.node("posts:1").await.unwrap();

        assert_eq!(port.fetch_calls(), 2);
        assert_ne!(first.request_id(), second.request_id());
        assert_eq!(first.batches_dispatched(), 1);
    }

    #[tokio::test]
    async fn each_entity_type_batches_separately() {
        let port = seeded_port().await;
        let ctx = RequestContext::new(port.clone(), PaginationEngine::default());

        let refs: Vec<NodeRef> = ["posts:1", "users:1", "posts:2", "comments:3", "users:2"]
            .into_iter()
            .map(|id| NodeRef::decode(id).unwrap())
            .collect();
        let loads: Vec<_> = refs.iter().map(|r| ctx.load_ref(r)).collect();
        let nodes = futures::future::try_join_all(loads).await.unwrap();

        assert!(nodes.iter().all(Option::is_some));
        let mut batches = port.batches();
        batches.sort();
        assert_eq!(batches, vec![vec![1, 2], vec![1, 2], vec![3]]);
        assert_eq!(ctx.batches_dispatched(), 3);
    }
}
