//! In-process implementation of the [`QueryPort`].
//!
//! [`MemoryStore`] keeps the three tables in ordered maps behind a
//! [`tokio::sync::RwLock`]. It evaluates [`PageQuery`] descriptions with
//! the same semantics as the `PostgreSQL` backend and enforces the same
//! foreign keys on insert. Used for development, demos and tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use relaynode_types::{Comment, Cursor, EntityType, NewRecord, Node, Post, User};
use tokio::sync::RwLock;

use crate::error::DbError;
use crate::port::{Filter, FilterColumn, PageQuery, PageRow, QueryPort, SortDirection};

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    posts: BTreeMap<i64, Post>,
    comments: BTreeMap<i64, Comment>,
    sequences: BTreeMap<EntityType, i64>,
}

impl Tables {
    fn get(&self, entity: EntityType, key: i64) -> Option<Node> {
        match entity {
            EntityType::User => self.users.get(&key).cloned().map(Node::User),
            EntityType::Post => self.posts.get(&key).cloned().map(Node::Post),
            EntityType::Comment => self.comments.get(&key).cloned().map(Node::Comment),
        }
    }

    fn len(&self, entity: EntityType) -> usize {
        match entity {
            EntityType::User => self.users.len(),
            EntityType::Post => self.posts.len(),
            EntityType::Comment => self.comments.len(),
        }
    }

    /// Advance a table's key sequence. Keys start at 1 and are never
    /// reused, even after a delete.
    fn next_key(&mut self, entity: EntityType) -> Result<i64, DbError> {
        let last = self.sequences.entry(entity).or_insert(0);
        *last = last
            .checked_add(1)
            .ok_or_else(|| DbError::Constraint(format!("{entity} key space exhausted")))?;
        Ok(*last)
    }

    /// Ordering position plus filterable columns of every row in a
    /// collection.
    fn ordered_rows(&self, entity: EntityType) -> Vec<(Cursor, i64, Option<i64>)> {
        match entity {
            EntityType::User => Vec::new(),
            EntityType::Post => self
                .posts
                .values()
                .map(|p| {
                    (
                        Cursor::new(p.created_at, p.id.get()),
                        p.posted_by_user_id.get(),
                        None,
                    )
                })
                .collect(),
            EntityType::Comment => self
                .comments
                .values()
                .map(|c| {
                    (
                        Cursor::new(c.created_at, c.id.get()),
                        c.posted_by_user_id.get(),
                        Some(c.post_id.get()),
                    )
                })
                .collect(),
        }
    }
}

fn matches_filters(filters: &[Filter], posted_by: i64, post_id: Option<i64>) -> bool {
    filters.iter().all(|f| match f.column {
        FilterColumn::PostedByUserId => posted_by == f.value,
        FilterColumn::PostId => post_id == Some(f.value),
    })
}

/// Shared in-memory tables.
///
/// Clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove a row. Used to simulate rows disappearing between a page
    /// read and entity resolution.
    pub async fn delete(&self, entity: EntityType, key: i64) -> bool {
        let mut tables = self.tables.write().await;
        match entity {
            EntityType::User => tables.users.remove(&key).is_some(),
            EntityType::Post => tables.posts.remove(&key).is_some(),
            EntityType::Comment => tables.comments.remove(&key).is_some(),
        }
    }
}

impl QueryPort for MemoryStore {
    async fn fetch_by_keys(&self, entity: EntityType, keys: &[i64]) -> Result<Vec<Node>, DbError> {
        let tables = self.tables.read().await;
        Ok(keys.iter().filter_map(|&k| tables.get(entity, k)).collect())
    }

    async fn fetch_page(&self, query: &PageQuery) -> Result<Vec<PageRow>, DbError> {
        query.validate()?;
        let offset = usize::try_from(query.offset)
            .map_err(|e| DbError::InvalidQuery(format!("offset out of range: {e}")))?;
        let limit = usize::try_from(query.limit)
            .map_err(|e| DbError::InvalidQuery(format!("limit out of range: {e}")))?;

        let tables = self.tables.read().await;
        let mut rows: Vec<Cursor> = tables
            .ordered_rows(query.entity)
            .into_iter()
            .filter(|(_, posted_by, post_id)| matches_filters(&query.filters, *posted_by, *post_id))
            .map(|(cursor, _, _)| cursor)
            .filter(|cursor| match (query.after, query.direction) {
                (None, _) => true,
                (Some(after), SortDirection::Ascending) => *cursor > after,
                (Some(after), SortDirection::Descending) => *cursor < after,
            })
            .collect();

        rows.sort_unstable();
        if query.direction == SortDirection::Descending {
            rows.reverse();
        }

        Ok(rows
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|cursor| PageRow {
                entity: query.entity,
                cursor,
            })
            .collect())
    }

    async fn count(&self, entity: EntityType) -> Result<i64, DbError> {
        let tables = self.tables.read().await;
        i64::try_from(tables.len(entity))
            .map_err(|e| DbError::InvalidQuery(format!("count out of range: {e}")))
    }

    async fn insert(&self, record: NewRecord) -> Result<i64, DbError> {
        let mut tables = self.tables.write().await;
        let entity = record.entity_type();

        let missing_user = |key: i64, tables: &Tables| {
            (!tables.users.contains_key(&key))
                .then(|| DbError::Constraint(format!("no users row with id {key}")))
        };
        match &record {
            NewRecord::User(_) => {}
            NewRecord::Post(p) => {
                if let Some(err) = missing_user(p.posted_by_user_id.get(), &*tables) {
                    return Err(err);
                }
            }
            NewRecord::Comment(c) => {
                if let Some(err) = missing_user(c.posted_by_user_id.get(), &*tables) {
                    return Err(err);
                }
                if !tables.posts.contains_key(&c.post_id.get()) {
                    return Err(DbError::Constraint(format!(
                        "no posts row with id {}",
                        c.post_id.get()
                    )));
                }
            }
        }

        let key = tables.next_key(entity)?;
        match record.into_node(key) {
            Node::User(u) => {
                tables.users.insert(key, u);
            }
            Node::Post(p) => {
                tables.posts.insert(key, p);
            }
            Node::Comment(c) => {
                tables.comments.insert(key, c);
            }
        }

        tracing::debug!(%entity, key, "Inserted row (memory)");
        Ok(key)
    }
}
