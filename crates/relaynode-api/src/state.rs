//! Shared application state for the API server.
//!
//! [`AppState`] holds the store [`Backend`], the pagination limits, the
//! basic auth password, and the process-wide diagnostic value store.
//! Request-scoped loaders are never stored here: every handler builds a
//! fresh [`RequestContext`] from the state.

use std::collections::BTreeMap;
use std::sync::Arc;

use relaynode_core::{PaginationEngine, RequestContext};
use relaynode_db::{
    DbError, MemoryStore, PageQuery, PageRow, PgNodeStore, PostgresConfig, PostgresPool,
    QueryPort,
};
use relaynode_types::{EntityType, NewRecord, Node};
use tokio::sync::RwLock;

use crate::config::{RelaynodeConfig, StoreBackend, StoreConfig};

/// The store behind the server.
///
/// Dispatches each [`QueryPort`] operation to the selected backend.
#[derive(Clone)]
pub enum Backend {
    /// `PostgreSQL` tables.
    Postgres(PgNodeStore),
    /// In-process tables.
    Memory(MemoryStore),
}

impl Backend {
    /// Open the backend described by `config`.
    ///
    /// For `PostgreSQL` this connects the pool and applies pending
    /// migrations.
    ///
    /// # Errors
    ///
    /// Returns a [`DbError`] if the connection or a migration fails.
    pub async fn connect(config: &StoreConfig) -> Result<Self, DbError> {
        match config.backend {
            StoreBackend::Memory => Ok(Self::Memory(MemoryStore::new())),
            StoreBackend::Postgres => {
                let pool = PostgresPool::connect(
                    &PostgresConfig::new(&config.postgres_url)
                        .with_max_connections(config.max_connections),
                )
                .await?;
                pool.run_migrations().await?;
                Ok(Self::Postgres(pool.node_store()))
            }
        }
    }

    /// Release the backend's connections. A no-op for the memory store.
    pub async fn close(&self) {
        if let Self::Postgres(store) = self {
            store.close().await;
        }
    }

    /// Short backend name for status output.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Postgres(_) => "postgres",
            Self::Memory(_) => "memory",
        }
    }
}

impl QueryPort for Backend {
    async fn fetch_by_keys(&self, entity: EntityType, keys: &[i64]) -> Result<Vec<Node>, DbError> {
        match self {
            Self::Postgres(store) => store.fetch_by_keys(entity, keys).await,
            Self::Memory(store) => store.fetch_by_keys(entity, keys).await,
        }
    }

    async fn fetch_page(&self, query: &PageQuery) -> Result<Vec<PageRow>, DbError> {
        match self {
            Self::Postgres(store) => store.fetch_page(query).await,
            Self::Memory(store) => store.fetch_page(query).await,
        }
    }

    async fn count(&self, entity: EntityType) -> Result<i64, DbError> {
        match self {
            Self::Postgres(store) => store.count(entity).await,
            Self::Memory(store) => store.count(entity).await,
        }
    }

    async fn insert(&self, record: NewRecord) -> Result<i64, DbError> {
        match self {
            Self::Postgres(store) => store.insert(record).await,
            Self::Memory(store) => store.insert(record).await,
        }
    }
}

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// The store every request reads through.
    pub backend: Backend,
    /// Pagination limits applied to every request.
    pub pagination: PaginationEngine,
    /// Password required by basic auth.
    pub password: Arc<str>,
    /// Diagnostic values written by `PUT /api/nodes/{id}/value`.
    ///
    /// Process-wide; writers are serialized, last write wins per id.
    pub values: Arc<RwLock<BTreeMap<String, String>>>,
}

impl AppState {
    /// Create state over `backend` with the limits and password from
    /// `config`.
    pub fn new(backend: Backend, config: &RelaynodeConfig) -> Self {
        Self {
            backend,
            pagination: PaginationEngine::new(config.pagination.max_page_size),
            password: Arc::from(config.auth.password.as_str()),
            values: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// State over an empty in-memory store with default configuration.
    pub fn memory() -> Self {
        Self::new(
            Backend::Memory(MemoryStore::new()),
            &RelaynodeConfig::default(),
        )
    }

    /// Start a request: fresh loaders over the shared backend.
    pub fn request_context(&self) -> RequestContext<Backend> {
        RequestContext::new(self.backend.clone(), self.pagination)
    }
}
