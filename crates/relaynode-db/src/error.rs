//! Error types for the data layer.
//!
//! All errors are propagated via [`DbError`] which wraps the underlying
//! [`sqlx`] errors with additional context about which operation failed.

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A structured query asked for something the collection cannot do
    /// (e.g. ordering users, filtering posts by post).
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// An insert referenced a row that does not exist.
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}
