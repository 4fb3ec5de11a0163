//! Core entity structs for the object graph.
//!
//! Each struct mirrors one backing table. Primary and foreign keys use the
//! typed key wrappers from [`crate::ids`], so they serialize as global node
//! identifiers rather than raw integers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cursor::Cursor;
use crate::enums::EntityType;
use crate::ids::{CommentKey, NodeRef, PostKey, UserKey};

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct User {
    /// Global identifier.
    #[ts(as = "String")]
    pub id: UserKey,
    /// Display name.
    pub name: String,
    /// Free-form role label.
    pub role: String,
}

/// A post written by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Post {
    /// Global identifier.
    #[ts(as = "String")]
    pub id: PostKey,
    /// Author of the post.
    #[ts(as = "String")]
    pub posted_by_user_id: UserKey,
    /// Creation time; the primary ordering column for pagination.
    pub created_at: DateTime<Utc>,
    /// Post title.
    pub title: String,
    /// Post body.
    pub body: String,
    /// Last modification time.
    pub timestamp: DateTime<Utc>,
    /// User who last modified the post.
    #[ts(as = "String")]
    pub last_modified_by_user_id: UserKey,
}

/// A comment on a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Comment {
    /// Global identifier.
    #[ts(as = "String")]
    pub id: CommentKey,
    /// The post this comment belongs to.
    #[ts(as = "String")]
    pub post_id: PostKey,
    /// Author of the comment.
    #[ts(as = "String")]
    pub posted_by_user_id: UserKey,
    /// Creation time; the primary ordering column for pagination.
    pub created_at: DateTime<Utc>,
    /// Comment body.
    pub body: String,
    /// Last modification time.
    pub timestamp: DateTime<Utc>,
    /// User who last modified the comment.
    #[ts(as = "String")]
    pub last_modified_by_user_id: UserKey,
}

/// A row fetched from the store, tagged with the entity type it came from.
///
/// Serializes with a `__typename` discriminator so clients can tell the
/// concrete type of a node returned from a generic lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "__typename")]
pub enum Node {
    /// A user row.
    User(User),
    /// A post row.
    Post(Post),
    /// A comment row.
    Comment(Comment),
}

impl Node {
    /// The entity type of this row.
    pub const fn entity_type(&self) -> EntityType {
        match self {
            Self::User(_) => EntityType::User,
            Self::Post(_) => EntityType::Post,
            Self::Comment(_) => EntityType::Comment,
        }
    }

    /// The store-local primary key.
    pub const fn key(&self) -> i64 {
        match self {
            Self::User(u) => u.id.get(),
            Self::Post(p) => p.id.get(),
            Self::Comment(c) => c.id.get(),
        }
    }

    /// The global identifier of this row.
    pub fn node_ref(&self) -> NodeRef {
        NodeRef::encode(self.entity_type(), self.key())
    }

    /// Creation time, for entity types that have one.
    pub const fn created_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::User(_) => None,
            Self::Post(p) => Some(p.created_at),
            Self::Comment(c) => Some(c.created_at),
        }
    }

    /// The `(created_at, id)` cursor of this row, for ordered entity types.
    pub fn cursor(&self) -> Option<Cursor> {
        self.created_at().map(|t| Cursor::new(t, self.key()))
    }
}

/// Fields of a user to insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    /// Display name.
    pub name: String,
    /// Role label.
    pub role: String,
}

/// Fields of a post to insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPost {
    /// Author.
    pub posted_by_user_id: UserKey,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Title.
    pub title: String,
    /// Body.
    pub body: String,
}

/// Fields of a comment to insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewComment {
    /// Parent post.
    pub post_id: PostKey,
    /// Author.
    pub posted_by_user_id: UserKey,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Body.
    pub body: String,
}

/// A record to insert, tagged with its entity type.
///
/// New rows start with `timestamp = created_at` and are last modified by
/// their author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewRecord {
    /// Insert into `users`.
    User(NewUser),
    /// Insert into `posts`.
    Post(NewPost),
    /// Insert into `comments`.
    Comment(NewComment),
}

impl NewRecord {
    /// The entity type the record is inserted as.
    pub const fn entity_type(&self) -> EntityType {
        match self {
            Self::User(_) => EntityType::User,
            Self::Post(_) => EntityType::Post,
            Self::Comment(_) => EntityType::Comment,
        }
    }

    /// Materialize the record as a stored row with the given key.
    pub fn into_node(self, key: i64) -> Node {
        match self {
            Self::User(u) => Node::User(User {
                id: UserKey(key),
                name: u.name,
                role: u.role,
            }),
            Self::Post(p) => Node::Post(Post {
                id: PostKey(key),
                posted_by_user_id: p.posted_by_user_id,
                created_at: p.created_at,
                title: p.title,
                body: p.body,
                timestamp: p.created_at,
                last_modified_by_user_id: p.posted_by_user_id,
            }),
            Self::Comment(c) => Node::Comment(Comment {
                id: CommentKey(key),
                post_id: c.post_id,
                posted_by_user_id: c.posted_by_user_id,
                created_at: c.created_at,
                body: c.body,
                timestamp: c.created_at,
                last_modified_by_user_id: c.posted_by_user_id,
            }),
        }
    }
}
