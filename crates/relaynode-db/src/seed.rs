//! Deterministic demo data set.
//!
//! Rows are inserted through the [`QueryPort`] in dependency order (users,
//! then posts, then comments) so the same data set loads into any backend.
//! Foreign keys use the keys the store hands back.
//!
//! On an empty store the keys come out as:
//!
//! | Table | Keys | Notes |
//! |-------|------|-------|
//! | users | 1..=3 | |
//! | posts | 1..=6 | 1..=5 by user 1, 6 by user 2, one hour apart |
//! | comments | 1..=4 | 1..=3 on post 1, 4 on post 2 |

use chrono::{DateTime, Duration, TimeZone, Utc};
use relaynode_types::{NewComment, NewPost, NewRecord, NewUser, PostKey, UserKey};

use crate::error::DbError;
use crate::port::QueryPort;

const USERS: [(&str, &str); 3] = [
    ("Ada Lovelace", "admin"),
    ("Grace Hopper", "editor"),
    ("Alan Turing", "member"),
];

/// (author index, title, body)
const POSTS: [(usize, &str, &str); 6] = [
    (0, "Notes on the engine", "The engine weaves algebraic patterns."),
    (0, "On loops", "A cycle of operations may be repeated."),
    (0, "Bernoulli numbers", "A worked table of the computation."),
    (0, "Punched cards", "Borrowed from the Jacquard loom."),
    (0, "Beyond numbers", "The engine might compose music."),
    (1, "First bug", "Found a moth in relay 70."),
];

/// (post index, author index, body)
const COMMENTS: [(usize, usize, &str); 4] = [
    (0, 1, "Fascinating."),
    (0, 2, "Could it think?"),
    (0, 0, "It originates nothing."),
    (1, 2, "Loops are the heart of it."),
];

/// Keys produced by a seed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedSummary {
    /// Inserted user keys, in data set order.
    pub users: Vec<UserKey>,
    /// Inserted post keys, in data set order.
    pub posts: Vec<PostKey>,
    /// Number of inserted comments.
    pub comments: usize,
}

/// Creation time of the `n`th seeded row: one hour apart from 2016-01-01.
fn seeded_at(n: usize) -> Result<DateTime<Utc>, DbError> {
    let base = Utc
        .with_ymd_and_hms(2016, 1, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| DbError::Config(String::from("invalid seed epoch")))?;
    let hours = i64::try_from(n).map_err(|e| DbError::Config(format!("seed offset: {e}")))?;
    Duration::try_hours(hours)
        .and_then(|d| base.checked_add_signed(d))
        .ok_or_else(|| DbError::Config(format!("seed offset {n} out of range")))
}

/// Insert the demo data set.
///
/// # Errors
///
/// Returns the first [`DbError`] the store reports; rows inserted before
/// the failure are kept.
pub async fn seed<Q: QueryPort>(port: &Q) -> Result<SeedSummary, DbError> {
    let mut summary = SeedSummary::default();

    for (name, role) in USERS {
        let key = port
            .insert(NewRecord::User(NewUser {
                name: name.to_owned(),
                role: role.to_owned(),
            }))
            .await?;
        summary.users.push(UserKey(key));
    }

    for (n, (author, title, body)) in POSTS.into_iter().enumerate() {
        let author = lookup(&summary.users, author)?;
        let key = port
            .insert(NewRecord::Post(NewPost {
                posted_by_user_id: author,
                created_at: seeded_at(n)?,
                title: title.to_owned(),
                body: body.to_owned(),
            }))
            .await?;
        summary.posts.push(PostKey(key));
    }

    for (n, (post, author, body)) in COMMENTS.into_iter().enumerate() {
        let post_id = lookup(&summary.posts, post)?;
        let author = lookup(&summary.users, author)?;
        port.insert(NewRecord::Comment(NewComment {
            post_id,
            posted_by_user_id: author,
            created_at: seeded_at(n)?,
            body: body.to_owned(),
        }))
        .await?;
        summary.comments = summary.comments.saturating_add(1);
    }

    tracing::info!(
        users = summary.users.len(),
        posts = summary.posts.len(),
        comments = summary.comments,
        "Seeded demo data"
    );
    Ok(summary)
}

fn lookup<K: Copy>(keys: &[K], index: usize) -> Result<K, DbError> {
    keys.get(index)
        .copied()
        .ok_or_else(|| DbError::Config(format!("seed references missing row {index}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use relaynode_types::EntityType;

    use super::*;
    use crate::memory::MemoryStore;

    #[tokio::test]
    async fn seeds_every_table() {
        let store = MemoryStore::new();
        let summary = seed(&store).await.unwrap();
        assert_eq!(summary.users, vec![UserKey(1), UserKey(2), UserKey(3)]);
        assert_eq!(summary.posts.len(), 6);
        assert_eq!(store.count(EntityType::User).await.unwrap(), 3);
        assert_eq!(store.count(EntityType::Post).await.unwrap(), 6);
        assert_eq!(store.count(EntityType::Comment).await.unwrap(), 4);
    }

    #[test]
    fn seeded_rows_are_an_hour_apart() {
        let a = seeded_at(0).unwrap();
        let b = seeded_at(1).unwrap();
        assert_eq!(b.signed_duration_since(a), Duration::hours(1));
    }
}
