//! Opaque global node identifiers.
//!
//! A [`NodeRef`] addresses any node regardless of its backing table. The
//! wire format is `<tag>:<local key>`, e.g. `posts:42`. The separator may
//! appear in neither part, so every identifier splits back into exactly
//! the pair it was built from.
//!
//! The typed key wrappers ([`UserKey`], [`PostKey`], [`CommentKey`]) carry
//! the store-local integer key of one entity type and serialize as the
//! full global identifier.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::enums::EntityType;

/// Separator between the type tag and the local key.
pub const NODE_REF_SEPARATOR: char = ':';

/// Errors produced when decoding identifiers and cursors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentifierError {
    /// The token does not split into exactly two non-empty parts.
    #[error("malformed node identifier: {0:?}")]
    Malformed(String),

    /// The type tag is not one of the known entity types.
    #[error("unknown node type: {0:?}")]
    UnknownType(String),

    /// The identifier names a different entity type than required.
    #[error("expected a {expected} identifier, got {found:?}")]
    WrongType {
        /// The entity type the caller required.
        expected: EntityType,
        /// The identifier that was supplied.
        found: String,
    },

    /// The local key part is not a valid key for the entity type.
    #[error("invalid local key in {0:?}")]
    InvalidKey(String),

    /// A pagination cursor could not be decoded.
    #[error("malformed cursor: {0:?}")]
    InvalidCursor(String),
}

/// An opaque global identifier: entity type plus store-local key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeRef {
    entity: EntityType,
    local_key: String,
}

impl NodeRef {
    /// Build an identifier from a type and an arbitrary local key.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::Malformed`] if the key is empty or
    /// contains the separator.
    pub fn new(entity: EntityType, local_key: impl Into<String>) -> Result<Self, IdentifierError> {
        let local_key = local_key.into();
        if local_key.is_empty() || local_key.contains(NODE_REF_SEPARATOR) {
            return Err(IdentifierError::Malformed(format!(
                "{}{NODE_REF_SEPARATOR}{local_key}",
                entity.tag()
            )));
        }
        Ok(Self { entity, local_key })
    }

    /// Encode an integer store key. Integer keys never contain the
    /// separator, so this cannot fail.
    pub fn encode(entity: EntityType, key: i64) -> Self {
        Self {
            entity,
            local_key: key.to_string(),
        }
    }

    /// Decode a wire-format identifier.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::Malformed`] when the token is not exactly
    /// two non-empty parts, or [`IdentifierError::UnknownType`] when the tag
    /// is not in the closed type set.
    pub fn decode(token: &str) -> Result<Self, IdentifierError> {
        let mut parts = token.split(NODE_REF_SEPARATOR);
        let (Some(tag), Some(local_key), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(IdentifierError::Malformed(token.to_owned()));
        };
        if tag.is_empty() || local_key.is_empty() {
            return Err(IdentifierError::Malformed(token.to_owned()));
        }
        let entity = EntityType::from_tag(tag)
            .ok_or_else(|| IdentifierError::UnknownType(tag.to_owned()))?;
        Ok(Self {
            entity,
            local_key: local_key.to_owned(),
        })
    }

    /// The entity type this identifier addresses.
    pub const fn entity(&self) -> EntityType {
        self.entity
    }

    /// The opaque local key part.
    pub fn local_key(&self) -> &str {
        &self.local_key
    }

    /// The local key as an integer store key, if it is one.
    ///
    /// A well-formed identifier whose key is not an integer names no row.
    pub fn store_key(&self) -> Option<i64> {
        self.local_key.parse().ok()
    }

    /// Require this identifier to address `expected` and return its
    /// integer store key.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::WrongType`] for another entity type and
    /// [`IdentifierError::InvalidKey`] for a non-integer key.
    pub fn expect_key(&self, expected: EntityType) -> Result<i64, IdentifierError> {
        if self.entity != expected {
            return Err(IdentifierError::WrongType {
                expected,
                found: self.to_string(),
            });
        }
        self.store_key()
            .ok_or_else(|| IdentifierError::InvalidKey(self.to_string()))
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{NODE_REF_SEPARATOR}{}",
            self.entity.tag(),
            self.local_key
        )
    }
}

impl FromStr for NodeRef {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

impl Serialize for NodeRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NodeRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let token = String::deserialize(deserializer)?;
        Self::decode(&token).map_err(serde::de::Error::custom)
    }
}

/// Generates a typed store-key wrapper bound to one [`EntityType`].
macro_rules! define_key {
    (
        $(#[$meta:meta])*
        $name:ident => $entity:expr
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub i64);

        impl $name {
            /// The entity type this key belongs to.
            pub const ENTITY: EntityType = $entity;

            /// Return the inner store key.
            pub const fn get(self) -> i64 {
                self.0
            }

            /// Encode this key as a global identifier.
            pub fn node_ref(self) -> NodeRef {
                NodeRef::encode(Self::ENTITY, self.0)
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.node_ref())
            }
        }

        impl From<i64> for $name {
            fn from(key: i64) -> Self {
                Self(key)
            }
        }

        impl From<$name> for i64 {
            fn from(key: $name) -> Self {
                key.0
            }
        }

        impl TryFrom<&NodeRef> for $name {
            type Error = IdentifierError;

            fn try_from(node_ref: &NodeRef) -> Result<Self, Self::Error> {
                node_ref.expect_key(Self::ENTITY).map(Self)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let node_ref = NodeRef::deserialize(deserializer)?;
                Self::try_from(&node_ref).map_err(serde::de::Error::custom)
            }
        }
    };
}

define_key! {
    /// Store key of a user.
    UserKey => EntityType::User
}

define_key! {
    /// Store key of a post.
    PostKey => EntityType::Post
}

define_key! {
    /// Store key of a comment.
    CommentKey => EntityType::Comment
}
