//! `PostgreSQL` implementation of the [`QueryPort`].
//!
//! Table and column names come from the closed [`EntityType`] and
//! [`FilterColumn`](crate::port::FilterColumn) mappings; every value is a
//! bound parameter.

use chrono::{DateTime, Utc};
use relaynode_types::{
    Comment, CommentKey, Cursor, EntityType, NewRecord, Node, Post, PostKey, User, UserKey,
};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::error::DbError;
use crate::port::{PageQuery, PageRow, QueryPort, SortDirection};

/// Query port over a `PostgreSQL` pool.
#[derive(Clone)]
pub struct PgNodeStore {
    pool: PgPool,
}

impl PgNodeStore {
    /// Create a store bound to a connection pool.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Close all connections in the pool gracefully.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("PostgreSQL pool closed");
    }
}

impl QueryPort for PgNodeStore {
    async fn fetch_by_keys(&self, entity: EntityType, keys: &[i64]) -> Result<Vec<Node>, DbError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let nodes = match entity {
            EntityType::User => sqlx::query_as::<_, UserRow>(
                r"SELECT id, name, role FROM users WHERE id = ANY($1)",
            )
            .bind(keys)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|row| Node::User(row.into()))
            .collect(),
            EntityType::Post => sqlx::query_as::<_, PostRow>(
                r#"SELECT id, posted_by_user_id, created_at, title, body, "timestamp", last_modified_by_user_id
                   FROM posts WHERE id = ANY($1)"#,
            )
            .bind(keys)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|row| Node::Post(row.into()))
            .collect(),
            EntityType::Comment => sqlx::query_as::<_, CommentRow>(
                r#"SELECT id, post_id, posted_by_user_id, created_at, body, "timestamp", last_modified_by_user_id
                   FROM comments WHERE id = ANY($1)"#,
            )
            .bind(keys)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|row| Node::Comment(row.into()))
            .collect(),
        };

        Ok(nodes)
    }

    async fn fetch_page(&self, query: &PageQuery) -> Result<Vec<PageRow>, DbError> {
        query.validate()?;
        let limit = i64::try_from(query.limit)
            .map_err(|e| DbError::InvalidQuery(format!("limit out of range: {e}")))?;
        let offset = i64::try_from(query.offset)
            .map_err(|e| DbError::InvalidQuery(format!("offset out of range: {e}")))?;

        let mut builder = QueryBuilder::<Postgres>::new("SELECT id, created_at FROM ");
        builder.push(query.entity.table()).push(" WHERE TRUE");

        for filter in &query.filters {
            builder
                .push(" AND ")
                .push(filter.column.column_name())
                .push(" = ")
                .push_bind(filter.value);
        }

        if let Some(after) = query.after {
            // Row-value comparison keeps the (created_at, id) tie-break exact.
            let op = match query.direction {
                SortDirection::Ascending => " > ",
                SortDirection::Descending => " < ",
            };
            builder
                .push(" AND (created_at, id)")
                .push(op)
                .push("(")
                .push_bind(after.created_at)
                .push(", ")
                .push_bind(after.key)
                .push(")");
        }

        let dir = query.direction.sql();
        builder
            .push(" ORDER BY created_at ")
            .push(dir)
            .push(", id ")
            .push(dir)
            .push(" LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows: Vec<(i64, DateTime<Utc>)> =
            builder.build_query_as().fetch_all(&self.pool).await?;

        tracing::debug!(
            entity = %query.entity,
            rows = rows.len(),
            limit,
            offset,
            "Fetched page"
        );

        Ok(rows
            .into_iter()
            .map(|(id, created_at)| PageRow {
                entity: query.entity,
                cursor: Cursor::new(created_at, id),
            })
            .collect())
    }

    async fn count(&self, entity: EntityType) -> Result<i64, DbError> {
        let sql = format!("SELECT COUNT(*) FROM {}", entity.table());
        let count = sqlx::query_scalar::<_, i64>(&sql)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn insert(&self, record: NewRecord) -> Result<i64, DbError> {
        let entity = record.entity_type();
        let key = match record {
            NewRecord::User(user) => {
                sqlx::query_scalar::<_, i64>(
                    r"INSERT INTO users (name, role) VALUES ($1, $2) RETURNING id",
                )
                .bind(user.name)
                .bind(user.role)
                .fetch_one(&self.pool)
                .await?
            }
            NewRecord::Post(post) => {
                sqlx::query_scalar::<_, i64>(
                    r#"INSERT INTO posts (posted_by_user_id, created_at, title, body, "timestamp", last_modified_by_user_id)
                       VALUES ($1, $2, $3, $4, $2, $1) RETURNING id"#,
                )
                .bind(post.posted_by_user_id.get())
                .bind(post.created_at)
                .bind(post.title)
                .bind(post.body)
                .fetch_one(&self.pool)
                .await?
            }
            NewRecord::Comment(comment) => {
                sqlx::query_scalar::<_, i64>(
                    r#"INSERT INTO comments (post_id, posted_by_user_id, created_at, body, "timestamp", last_modified_by_user_id)
                       VALUES ($1, $2, $3, $4, $3, $2) RETURNING id"#,
                )
                .bind(comment.post_id.get())
                .bind(comment.posted_by_user_id.get())
                .bind(comment.created_at)
                .bind(comment.body)
                .fetch_one(&self.pool)
                .await?
            }
        };

        tracing::debug!(%entity, key, "Inserted row");
        Ok(key)
    }
}

/// A row from the `users` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    /// Primary key.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Role label.
    pub role: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: UserKey(row.id),
            name: row.name,
            role: row.role,
        }
    }
}

/// A row from the `posts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostRow {
    /// Primary key.
    pub id: i64,
    /// Author key.
    pub posted_by_user_id: i64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Title.
    pub title: String,
    /// Body.
    pub body: String,
    /// Last modification time.
    pub timestamp: DateTime<Utc>,
    /// Last modifier key.
    pub last_modified_by_user_id: i64,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Self {
            id: PostKey(row.id),
            posted_by_user_id: UserKey(row.posted_by_user_id),
            created_at: row.created_at,
            title: row.title,
            body: row.body,
            timestamp: row.timestamp,
            last_modified_by_user_id: UserKey(row.last_modified_by_user_id),
        }
    }
}

/// A row from the `comments` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CommentRow {
    /// Primary key.
    pub id: i64,
    /// Parent post key.
    pub post_id: i64,
    /// Author key.
    pub posted_by_user_id: i64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Body.
    pub body: String,
    /// Last modification time.
    pub timestamp: DateTime<Utc>,
    /// Last modifier key.
    pub last_modified_by_user_id: i64,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Self {
            id: CommentKey(row.id),
            post_id: PostKey(row.post_id),
            posted_by_user_id: UserKey(row.posted_by_user_id),
            created_at: row.created_at,
            body: row.body,
            timestamp: row.timestamp,
            last_modified_by_user_id: UserKey(row.last_modified_by_user_id),
        }
    }
}
