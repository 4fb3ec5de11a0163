//! Pagination cursors.
//!
//! A [`Cursor`] encodes the ordering tuple of the row it was taken from:
//! the primary sort value (`created_at`) and the tie-break key (`id`).
//! Wire format: `<RFC 3339 timestamp>:<key>`. The timestamp itself contains
//! the separator, so decoding splits on the last one.
//!
//! Cursors compare by their ordering tuple. Two cursors are only
//! meaningfully comparable when they come from the same ordering.

use core::fmt;
use core::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ids::IdentifierError;

/// Separator between the ordering value and the tie-break key.
pub const CURSOR_SEPARATOR: char = ':';

/// Position of a row in a `(created_at, id)` ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cursor {
    /// Primary ordering value.
    pub created_at: DateTime<Utc>,
    /// Tie-break key (the row's store key).
    pub key: i64,
}

impl Cursor {
    /// Build a cursor from an ordering tuple.
    pub const fn new(created_at: DateTime<Utc>, key: i64) -> Self {
        Self { created_at, key }
    }

    /// Decode a wire-format cursor.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::InvalidCursor`] if either part is
    /// missing or unparseable.
    pub fn decode(token: &str) -> Result<Self, IdentifierError> {
        let invalid = || IdentifierError::InvalidCursor(token.to_owned());
        let (ordering, key) = token.rsplit_once(CURSOR_SEPARATOR).ok_or_else(invalid)?;
        let created_at = DateTime::parse_from_rfc3339(ordering)
            .map_err(|_parse| invalid())?
            .with_timezone(&Utc);
        let key = key.parse::<i64>().map_err(|_parse| invalid())?;
        Ok(Self { created_at, key })
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // AutoSi keeps every sub-second digit so decoding is exact.
        write!(
            f,
            "{}{CURSOR_SEPARATOR}{}",
            self.created_at.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            self.key
        )
    }
}

impl FromStr for Cursor {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

impl Serialize for Cursor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Cursor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let token = String::deserialize(deserializer)?;
        Self::decode(&token).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(secs: i64, nanos: u32) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, nanos)
            .single()
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }

    #[test]
    fn wire_format_is_timestamp_then_key() {
        let cursor = Cursor::new(at(1_700_000_000, 0), 2);
        assert_eq!(cursor.to_string(), "2023-11-14T22:13:20Z:2");
    }

    #[test]
    fn roundtrip_keeps_sub_second_precision() {
        for nanos in [0, 1_000, 123_456_000, 999_999_999] {
            let cursor = Cursor::new(at(1_700_000_000, nanos), 99);
            assert_eq!(Cursor::decode(&cursor.to_string()), Ok(cursor));
        }
    }

    #[test]
    fn malformed_cursors_are_rejected() {
        for token in ["", "42", "yesterday:4", "2023-11-14T22:13:20Z:", "2023-11-14T22:13:20Z:x"] {
            assert_eq!(
                Cursor::decode(token),
                Err(IdentifierError::InvalidCursor(token.to_owned())),
                "{token}"
            );
        }
    }

    #[test]
    fn ordering_is_by_time_then_key() {
        let a = Cursor::new(at(10, 0), 5);
        let b = Cursor::new(at(10, 0), 6);
        let c = Cursor::new(at(11, 0), 1);
        assert!(a < b);
        assert!(b < c);
    }
}
