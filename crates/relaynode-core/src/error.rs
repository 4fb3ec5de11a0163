//! Error types for node resolution.
//!
//! [`ResolveError`] separates the three domain failures (bad identifier,
//! failed batch, bad pagination arguments) from generic store failures.
//! A valid identifier that names no row is not an error at all: lookups
//! return `Ok(None)` for it.

use std::sync::Arc;

use relaynode_db::DbError;
use relaynode_types::{EntityType, IdentifierError};

/// The batched fetch behind a set of `load` calls failed.
///
/// Every caller waiting on the batch receives a clone of the same error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("batch fetch of {entity} failed: {message}")]
pub struct BatchFetchError {
    /// The entity type of the failed batch.
    pub entity: EntityType,
    /// The store's failure message.
    pub message: Arc<str>,
}

impl BatchFetchError {
    /// Wrap a store failure for distribution to every waiter of a batch.
    pub fn new(entity: EntityType, source: &DbError) -> Self {
        Self {
            entity,
            message: Arc::from(source.to_string()),
        }
    }
}

/// Errors that can occur while resolving nodes and connections.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// A node identifier was malformed or named an unknown type.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(IdentifierError),

    /// A batched fetch failed.
    #[error(transparent)]
    BatchFetch(#[from] BatchFetchError),

    /// A cursor was malformed or pagination arguments conflict.
    #[error("pagination error: {0}")]
    Pagination(String),

    /// A direct store operation (page read, count, insert) failed.
    #[error("store error: {0}")]
    Store(#[from] DbError),
}

impl From<IdentifierError> for ResolveError {
    fn from(err: IdentifierError) -> Self {
        match err {
            IdentifierError::InvalidCursor(_) => Self::Pagination(err.to_string()),
            other => Self::InvalidIdentifier(other),
        }
    }
}
