//! The query port: the only way the resolution core talks to a store.
//!
//! Callers describe what they want with structured values ([`PageQuery`],
//! [`Filter`], [`SortDirection`]) and never build query text. Each backend
//! ([`PgNodeStore`](crate::node_store::PgNodeStore),
//! [`MemoryStore`](crate::memory::MemoryStore)) translates the description
//! into its own access path.

use std::future::Future;

use relaynode_types::{Cursor, EntityType, NewRecord, Node};

use crate::error::DbError;

/// A column that can take part in an equality filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterColumn {
    /// `posted_by_user_id` on posts and comments.
    PostedByUserId,
    /// `post_id` on comments.
    PostId,
}

impl FilterColumn {
    /// The column name in the backing table.
    pub const fn column_name(self) -> &'static str {
        match self {
            Self::PostedByUserId => "posted_by_user_id",
            Self::PostId => "post_id",
        }
    }

    /// Whether the column exists on the given entity's table.
    pub const fn applies_to(self, entity: EntityType) -> bool {
        matches!(
            (self, entity),
            (Self::PostedByUserId, EntityType::Post | EntityType::Comment)
                | (Self::PostId, EntityType::Comment)
        )
    }
}

/// `column = value` equality filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Filter {
    /// The filtered column.
    pub column: FilterColumn,
    /// The required store key.
    pub value: i64,
}

impl Filter {
    /// Build an equality filter.
    pub const fn eq(column: FilterColumn, value: i64) -> Self {
        Self { column, value }
    }
}

/// Direction of the `(created_at, id)` ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortDirection {
    /// Oldest first.
    #[default]
    Ascending,
    /// Newest first.
    Descending,
}

impl SortDirection {
    /// SQL keyword for this direction.
    pub const fn sql(self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

/// Structured description of one page read over an ordered collection.
///
/// Rows are ordered by `(created_at, id)` in `direction`. When `after` is
/// set only rows strictly beyond that tuple in `direction` are returned.
/// `offset` rows are skipped before `limit` rows are taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    /// The collection to read.
    pub entity: EntityType,
    /// Equality filters, all of which must hold.
    pub filters: Vec<Filter>,
    /// Ordering direction.
    pub direction: SortDirection,
    /// Keyset predicate: only rows strictly after this position.
    pub after: Option<Cursor>,
    /// Rows to skip after filtering and ordering.
    pub offset: u64,
    /// Maximum number of rows to return.
    pub limit: u64,
}

impl PageQuery {
    /// Check that every filter column exists on the collection and that
    /// the collection carries the ordering columns.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidQuery`] describing the first violation.
    pub fn validate(&self) -> Result<(), DbError> {
        if self.entity == EntityType::User {
            return Err(DbError::InvalidQuery(format!(
                "{} has no (created_at, id) ordering",
                self.entity
            )));
        }
        if let Some(filter) = self.filters.iter().find(|f| !f.column.applies_to(self.entity)) {
            return Err(DbError::InvalidQuery(format!(
                "{} has no column {}",
                self.entity,
                filter.column.column_name()
            )));
        }
        Ok(())
    }
}

/// One row of a page read: identity and ordering data only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageRow {
    /// The collection the row came from.
    pub entity: EntityType,
    /// The row's `(created_at, id)` position.
    pub cursor: Cursor,
}

impl PageRow {
    /// The row's store key.
    pub const fn key(&self) -> i64 {
        self.cursor.key
    }
}

/// Structured access to the relational store.
///
/// Implementations must be cheap to clone (a pool handle or an `Arc`), so
/// that request-scoped loaders can move a handle into a detached future.
pub trait QueryPort: Clone + Send + Sync + 'static {
    /// Fetch the rows of `entity` whose primary key is in `keys`.
    ///
    /// Keys with no row are simply absent from the result; order is
    /// unspecified.
    fn fetch_by_keys(
        &self,
        entity: EntityType,
        keys: &[i64],
    ) -> impl Future<Output = Result<Vec<Node>, DbError>> + Send;

    /// Read one ordered page of identity rows.
    fn fetch_page(
        &self,
        query: &PageQuery,
    ) -> impl Future<Output = Result<Vec<PageRow>, DbError>> + Send;

    /// Count every row of `entity`.
    fn count(&self, entity: EntityType) -> impl Future<Output = Result<i64, DbError>> + Send;

    /// Insert a record and return its new store key.
    fn insert(&self, record: NewRecord) -> impl Future<Output = Result<i64, DbError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(entity: EntityType, filters: Vec<Filter>) -> PageQuery {
        PageQuery {
            entity,
            filters,
            direction: SortDirection::Ascending,
            after: None,
            offset: 0,
            limit: 3,
        }
    }

    #[test]
    fn users_cannot_be_paged() {
        assert!(query(EntityType::User, Vec::new()).validate().is_err());
    }

    #[test]
    fn filters_must_exist_on_the_collection() {
        let by_post = Filter::eq(FilterColumn::PostId, 1);
        let by_author = Filter::eq(FilterColumn::PostedByUserId, 1);
        assert!(query(EntityType::Post, vec![by_post]).validate().is_err());
        assert!(query(EntityType::Post, vec![by_author]).validate().is_ok());
        assert!(query(EntityType::Comment, vec![by_post, by_author]).validate().is_ok());
    }
}
