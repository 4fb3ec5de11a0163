//! Enumeration types for the relaynode object graph.
//!
//! [`EntityType`] is the closed set of node kinds. Every kind is bound to
//! exactly one backing table and one primary-key column, and every place
//! that dispatches on the kind does so with an exhaustive `match`.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::IdentifierError;

/// The kind of a node in the object graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum EntityType {
    /// A registered user (`users` table).
    #[serde(rename = "users")]
    User,
    /// A post written by a user (`posts` table).
    #[serde(rename = "posts")]
    Post,
    /// A comment on a post (`comments` table).
    #[serde(rename = "comments")]
    Comment,
}

impl EntityType {
    /// Every entity type, in declaration order.
    pub const ALL: [Self; 3] = [Self::User, Self::Post, Self::Comment];

    /// The type tag used in node identifiers (`users`, `posts`, `comments`).
    ///
    /// The tag doubles as the backing table name.
    pub const fn tag(self) -> &'static str {
        match self {
            Self::User => "users",
            Self::Post => "posts",
            Self::Comment => "comments",
        }
    }

    /// The backing table for this entity type.
    pub const fn table(self) -> &'static str {
        self.tag()
    }

    /// The primary-key column of the backing table.
    pub const fn key_column(self) -> &'static str {
        match self {
            Self::User | Self::Post | Self::Comment => "id",
        }
    }

    /// The externally visible type name (`User`, `Post`, `Comment`).
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Post => "Post",
            Self::Comment => "Comment",
        }
    }

    /// Look up an entity type by its identifier tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.tag() == tag)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for EntityType {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s).ok_or_else(|| IdentifierError::UnknownType(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_match_tables() {
        for entity in EntityType::ALL {
            assert_eq!(entity.tag(), entity.table());
            assert_eq!(EntityType::from_tag(entity.tag()), Some(entity));
        }
    }

    #[test]
    fn unknown_tag_is_rejected() {
        assert!(EntityType::from_tag("groups").is_none());
        assert!("Users".parse::<EntityType>().is_err());
    }

    #[test]
    fn serde_uses_tag() {
        let json = serde_json::to_string(&EntityType::Comment).ok();
        assert_eq!(json.as_deref(), Some("\"comments\""));
    }
}
