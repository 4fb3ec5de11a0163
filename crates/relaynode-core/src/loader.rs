//! Per-request batching and caching loader.
//!
//! A [`BatchLoader`] serves one entity type for one request. Every
//! [`load`](BatchLoader::load) call registers its key synchronously and
//! returns a shared future. The first load of a batch spawns the batch
//! task, which yields once and then seals the batch; keys registered
//! before that are coalesced into a single [`QueryPort::fetch_by_keys`]
//! call. A batch is scheduled when it opens, not when a caller awaits it,
//! so loads issued after the caller suspends always start a new batch.
//!
//! # Batch lifecycle
//!
//! ```text
//! Collecting --(yield)--> Dispatched --+--> Resolved (rows distributed by key)
//!      ^                               |
//!      |                               +--> Failed (same error to every waiter,
//!      +-- next load opens a new batch           keys evicted from the cache)
//! ```
//!
//! The batch task holds only a [`Weak`] handle on the loader state, so a
//! dropped loader never outlives its request through a pending batch.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Instant;

use futures::future::{self, BoxFuture, Shared};
use futures::{FutureExt, TryFutureExt};
use relaynode_db::{DbError, QueryPort};
use relaynode_types::{EntityType, Node};

use crate::error::BatchFetchError;

/// The shared result of loading one key.
pub type LoadFuture = Shared<BoxFuture<'static, Result<Option<Node>, BatchFetchError>>>;

type BatchFuture = Shared<BoxFuture<'static, Result<Arc<HashMap<i64, Node>>, BatchFetchError>>>;

struct CacheEntry {
    /// Batch that produced the entry; `None` for primed rows.
    batch_id: Option<u64>,
    load: LoadFuture,
}

struct CollectingBatch {
    id: u64,
    keys: Vec<i64>,
    fetch: BatchFuture,
}

#[derive(Default)]
struct LoaderState {
    cache: HashMap<i64, CacheEntry>,
    collecting: Option<CollectingBatch>,
    next_batch_id: u64,
    dispatched: u64,
}

fn lock(state: &Mutex<LoaderState>) -> MutexGuard<'_, LoaderState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Request-scoped loader for one entity type.
pub struct BatchLoader<Q: QueryPort> {
    entity: EntityType,
    port: Q,
    state: Arc<Mutex<LoaderState>>,
}

impl<Q: QueryPort> std::fmt::Debug for BatchLoader<Q> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("BatchLoader")
            .field("entity", &self.entity)
            .field("cached", &state.cache.len())
            .field("dispatched", &state.dispatched)
            .finish_non_exhaustive()
    }
}

impl<Q: QueryPort> BatchLoader<Q> {
    /// Create an empty loader for `entity`.
    pub fn new(entity: EntityType, port: Q) -> Self {
        Self {
            entity,
            port,
            state: Arc::new(Mutex::new(LoaderState::default())),
        }
    }

    /// The entity type this loader serves.
    pub const fn entity(&self) -> EntityType {
        self.entity
    }

    /// Load one row by store key.
    ///
    /// The key is registered before this returns. A key already pending or
    /// resolved in this loader yields the same shared future; a key with no
    /// row resolves to `Ok(None)`. Opening a batch spawns its task, so this
    /// must run inside a Tokio runtime.
    pub fn load(&self, key: i64) -> LoadFuture {
        let mut state = lock(&self.state);
        if let Some(entry) = state.cache.get(&key) {
            return entry.load.clone();
        }

        let (batch_id, fetch) = self.join_batch(&mut state, key);
        let load = fetch
            .map_ok(move |rows| rows.get(&key).cloned())
            .boxed()
            .shared();
        state.cache.insert(
            key,
            CacheEntry {
                batch_id: Some(batch_id),
                load: load.clone(),
            },
        );
        load
    }

    /// Load several keys, issuing every load before awaiting any.
    ///
    /// Results are in `keys` order.
    pub async fn load_many(&self, keys: &[i64]) -> Result<Vec<Option<Node>>, BatchFetchError> {
        let loads: Vec<LoadFuture> = keys.iter().map(|&key| self.load(key)).collect();
        future::try_join_all(loads).await
    }

    /// Seed the cache with a row that is already in hand.
    ///
    /// Returns `false` without touching the cache when the row belongs to
    /// another entity type or its key is already cached.
    pub fn prime(&self, node: Node) -> bool {
        if node.entity_type() != self.entity {
            return false;
        }
        let mut state = lock(&self.state);
        let key = node.key();
        if state.cache.contains_key(&key) {
            return false;
        }
        let load = future::ready(Ok(Some(node))).boxed().shared();
        state.cache.insert(
            key,
            CacheEntry {
                batch_id: None,
                load,
            },
        );
        true
    }

    /// Count every row of this loader's entity type.
    ///
    /// Goes straight to the store; neither batched nor cached.
    pub async fn get_count(&self) -> Result<i64, DbError> {
        self.port.count(self.entity).await
    }

    /// Number of batches this loader has sent to the store.
    pub fn batches_dispatched(&self) -> u64 {
        lock(&self.state).dispatched
    }

    /// Add `key` to the collecting batch, opening one if needed.
    ///
    /// Must be called from within a Tokio runtime.
    fn join_batch(&self, state: &mut LoaderState, key: i64) -> (u64, BatchFuture) {
        if let Some(batch) = state.collecting.as_mut() {
            batch.keys.push(key);
            return (batch.id, batch.fetch.clone());
        }

        let id = state.next_batch_id;
        state.next_batch_id = id.wrapping_add(1);
        let entity = self.entity;
        let task = tokio::spawn(dispatch(
            entity,
            self.port.clone(),
            Arc::downgrade(&self.state),
            id,
        ));
        let fetch = task
            .map(move |joined| {
                joined.unwrap_or_else(|e| {
                    Err(BatchFetchError {
                        entity,
                        message: Arc::from(format!("batch task failed: {e}")),
                    })
                })
            })
            .boxed()
            .shared();
        state.collecting = Some(CollectingBatch {
            id,
            keys: vec![key],
            fetch: fetch.clone(),
        });
        (id, fetch)
    }
}

/// Drive one batch: yield once so sibling loads can join, seal the batch,
/// then fetch every collected key in a single call.
async fn dispatch<Q: QueryPort>(
    entity: EntityType,
    port: Q,
    state: Weak<Mutex<LoaderState>>,
    batch_id: u64,
) -> Result<Arc<HashMap<i64, Node>>, BatchFetchError> {
    tokio::task::yield_now().await;

    let keys = {
        let Some(state) = state.upgrade() else {
            return Ok(Arc::default());
        };
        let mut guard = lock(&state);
        let sealed = guard.collecting.take_if(|batch| batch.id == batch_id);
        if sealed.is_some() {
            guard.dispatched = guard.dispatched.saturating_add(1);
        }
        sealed.map(|batch| batch.keys).unwrap_or_default()
    };

    if keys.is_empty() {
        return Ok(Arc::default());
    }

    let started = Instant::now();
    match port.fetch_by_keys(entity, &keys).await {
        Ok(nodes) => {
            tracing::debug!(
                %entity,
                batch_id,
                keys = keys.len(),
                rows = nodes.len(),
                elapsed_ms = started.elapsed().as_millis(),
                "Dispatched batch"
            );
            Ok(Arc::new(
                nodes.into_iter().map(|node| (node.key(), node)).collect(),
            ))
        }
        Err(source) => {
            let err = BatchFetchError::new(entity, &source);
            tracing::warn!(
                %entity,
                batch_id,
                keys = keys.len(),
                error = %err,
                "Batch fetch failed"
            );
            if let Some(state) = state.upgrade() {
                lock(&state)
                    .cache
                    .retain(|_, entry| entry.batch_id != Some(batch_id));
            }
            Err(err)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::{CountingPort, seeded_port};

    #[tokio::test]
    async fn coalesces_loads_into_one_fetch() {
        let port = seeded_port().await;
        let loader = BatchLoader::new(EntityType::Post, port.clone());

        let a = loader.load(1);
        let b = loader.load(3);
        let c = loader.load(5);
        let (a, b, c) = futures::try_join!(a, b, c).unwrap();

        assert_eq!(a.unwrap().key(), 1);
        assert_eq!(b.unwrap().key(), 3);
        assert_eq!(c.unwrap().key(), 5);
        assert_eq!(port.fetch_calls(), 1);
        assert_eq!(port.batches(), vec![vec![1, 3, 5]]);
        assert_eq!(loader.batches_dispatched(), 1);
    }

    #[tokio::test]
    async fn repeated_key_is_fetched_once() {
        let port = seeded_port().await;
        let loader = BatchLoader::new(EntityType::Post, port.clone());

        let first = loader.load(2).await.unwrap();
        let second = loader.load(2).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(port.fetch_calls(), 1);
    }

    #[tokio::test]
    async fn loads_after_a_suspension_start_a_new_batch() {
        let port = seeded_port().await;
        let loader = BatchLoader::new(EntityType::Post, port.clone());

        loader.load(1).await.unwrap();
        loader.load(2).await.unwrap();

        assert_eq!(port.batches(), vec![vec![1], vec![2]]);
    }

    #[tokio::test]
    async fn pending_batch_is_not_joined_after_caller_suspends() {
        let port = seeded_port().await;
        let loader = BatchLoader::new(EntityType::Post, port.clone());

        let a = loader.load(1);
        port.count(EntityType::User).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let b = loader.load(2);
        let (a, b) = futures::try_join!(a, b).unwrap();

        assert_eq!(a.unwrap().key(), 1);
        assert_eq!(b.unwrap().key(), 2);
        assert_eq!(port.batches(), vec![vec![1], vec![2]]);
        assert_eq!(loader.batches_dispatched(), 2);
    }

    #[tokio::test]
    async fn missing_key_resolves_to_none_for_that_caller_only() {
        let port = seeded_port().await;
        let loader = BatchLoader::new(EntityType::Post, port.clone());

        let rows = loader.load_many(&[4, 404, 1]).await.unwrap();

        assert_eq!(rows.iter().map(Option::is_some).collect::<Vec<_>>(), vec![true, false, true]);
        assert_eq!(port.fetch_calls(), 1);
    }

    #[tokio::test]
    async fn failed_batch_fails_every_waiter_and_is_evicted() {
        let port = seeded_port().await;
        let loader = BatchLoader::new(EntityType::Post, port.clone());

        port.fail_next_fetch();
        let a = loader.load(1);
        let b = loader.load(2);
        let (a, b) = futures::join!(a, b);
        let err = a.unwrap_err();
        assert_eq!(b.unwrap_err(), err);
        assert_eq!(err.entity, EntityType::Post);

        // No automatic retry; a fresh load starts a new batch.
        let again = loader.load(1).await.unwrap();
        assert_eq!(again.unwrap().key(), 1);
        assert_eq!(port.fetch_calls(), 2);
    }

    #[tokio::test]
    async fn primed_rows_resolve_without_a_fetch() {
        let port = seeded_port().await;
        let loader = BatchLoader::new(EntityType::Post, port.clone());
        let fetched = BatchLoader::new(EntityType::Post, port.clone())
            .load(3)
            .await
            .unwrap()
            .unwrap();
        let calls = port.fetch_calls();

        assert!(loader.prime(fetched.clone()));
        assert!(!loader.prime(fetched.clone()));
        assert_eq!(loader.load(3).await.unwrap(), Some(fetched));
        assert_eq!(port.fetch_calls(), calls);
    }

    #[tokio::test]
    async fn prime_rejects_other_entity_types() {
        let port = seeded_port().await;
        let users = BatchLoader::new(EntityType::User, port.clone());
        let post = users_post(&port).await;
        assert!(!users.prime(post));
    }

    #[tokio::test]
    async fn count_bypasses_the_cache() {
        let port = seeded_port().await;
        let loader = BatchLoader::new(EntityType::Post, port.clone());
        assert_eq!(loader.get_count().await.unwrap(), 5);
        assert_eq!(port.fetch_calls(), 0);
    }

    async fn users_post(port: &CountingPort) -> Node {
        port.fetch_by_keys(EntityType::Post, &[1])
            .await
            .unwrap()
            .pop()
            .unwrap()
    }
}
