//! Shared type definitions for relaynode.
//!
//! This crate is the single source of truth for the values that cross
//! crate boundaries: node identity, pagination cursors, entity rows, and
//! the connection response shape. Types flow downstream to `TypeScript`
//! via `ts-rs` for API clients.
//!
//! # Modules
//!
//! - [`enums`] -- The closed [`EntityType`] set and its table mapping
//! - [`ids`] -- Global node identifiers and typed store keys
//! - [`cursor`] -- Keyset pagination cursors
//! - [`structs`] -- Entity rows (users, posts, comments) and insert records
//! - [`connection`] -- Connection, edge, and page info shapes

pub mod connection;
pub mod cursor;
pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use connection::{Connection, Edge, PageInfo};
pub use cursor::Cursor;
pub use enums::EntityType;
pub use ids::{CommentKey, IdentifierError, NodeRef, PostKey, UserKey};
pub use structs::{Comment, NewComment, NewPost, NewRecord, NewUser, Node, Post, User};
