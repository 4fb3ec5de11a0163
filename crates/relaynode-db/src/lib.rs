//! Data layer for relaynode.
//!
//! The resolution core reaches the relational store only through the
//! [`QueryPort`] trait: keyed fetches, ordered page reads described as
//! structured [`PageQuery`] values, counts and inserts. Two backends
//! implement it.
//!
//! # Architecture
//!
//! ```text
//! relaynode-core (loaders, pagination)
//!     |
//!     +-- QueryPort
//!         |-- PgNodeStore   (PostgreSQL via sqlx, PostgresPool)
//!         +-- MemoryStore   (in-process tables, tests and demos)
//! ```
//!
//! # Modules
//!
//! - [`port`] -- The [`QueryPort`] trait and structured query types
//! - [`postgres`] -- `PostgreSQL` connection pool, configuration, migrations
//! - [`node_store`] -- `PostgreSQL` query port implementation
//! - [`memory`] -- In-memory query port implementation
//! - [`seed`] -- Deterministic demo data set
//! - [`error`] -- Shared error types

pub mod error;
pub mod memory;
pub mod node_store;
pub mod port;
pub mod postgres;
pub mod seed;

// Re-export primary types for convenience.
pub use error::DbError;
pub use memory::MemoryStore;
pub use node_store::{CommentRow, PgNodeStore, PostRow, UserRow};
pub use port::{Filter, FilterColumn, PageQuery, PageRow, QueryPort, SortDirection};
pub use postgres::{PostgresConfig, PostgresPool};
pub use seed::{SeedSummary, seed};
