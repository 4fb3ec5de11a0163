//! Test support: an instrumented query port over the in-memory store.

#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use relaynode_db::{DbError, MemoryStore, PageQuery, PageRow, QueryPort};
use relaynode_types::{EntityType, NewComment, NewPost, NewRecord, NewUser, Node, PostKey, UserKey};

/// Records every keyed fetch and can fail the next one on request.
#[derive(Debug, Clone, Default)]
pub struct CountingPort {
    store: MemoryStore,
    batches: Arc<Mutex<Vec<Vec<i64>>>>,
    page_reads: Arc<Mutex<Vec<PageQuery>>>,
    fail_fetch: Arc<AtomicBool>,
    fail_page: Arc<AtomicBool>,
}

impl CountingPort {
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// Keys of every `fetch_by_keys` call, in call order.
    pub fn batches(&self) -> Vec<Vec<i64>> {
        self.batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn fetch_calls(&self) -> usize {
        self.batches().len()
    }

    pub fn page_reads(&self) -> Vec<PageQuery> {
        self.page_reads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn fail_next_fetch(&self) {
        self.fail_fetch.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_page(&self) {
        self.fail_page.store(true, Ordering::SeqCst);
    }
}

impl QueryPort for CountingPort {
    async fn fetch_by_keys(&self, entity: EntityType, keys: &[i64]) -> Result<Vec<Node>, DbError> {
        self.batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(keys.to_vec());
        if self.fail_fetch.swap(false, Ordering::SeqCst) {
            return Err(DbError::InvalidQuery(String::from("injected failure")));
        }
        self.store.fetch_by_keys(entity, keys).await
    }

    async fn fetch_page(&self, query: &PageQuery) -> Result<Vec<PageRow>, DbError> {
        self.page_reads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(query.clone());
        if self.fail_page.swap(false, Ordering::SeqCst) {
            return Err(DbError::InvalidQuery(String::from("injected failure")));
        }
        self.store.fetch_page(query).await
    }

    async fn count(&self, entity: EntityType) -> Result<i64, DbError> {
        self.store.count(entity).await
    }

    async fn insert(&self, record: NewRecord) -> Result<i64, DbError> {
        self.store.insert(record).await
    }
}

/// `hours` after the Unix epoch.
pub fn at(hours: i64) -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH + Duration::hours(hours)
}

/// Two users; user 1 wrote posts 1..=5 an hour apart; post 1 has
/// comments 1..=3.
pub async fn seeded_port() -> CountingPort {
    let port = CountingPort::default();
    for name in ["ada", "grace"] {
        port.insert(NewRecord::User(NewUser {
            name: name.to_owned(),
            role: String::from("member"),
        }))
        .await
        .unwrap();
    }
    for hour in 1..=5 {
        port.insert(NewRecord::Post(NewPost {
            posted_by_user_id: UserKey(1),
            created_at: at(hour),
            title: format!("post {hour}"),
            body: String::new(),
        }))
        .await
        .unwrap();
    }
    for hour in 1..=3 {
        port.insert(NewRecord::Comment(NewComment {
            post_id: PostKey(1),
            posted_by_user_id: UserKey(2),
            created_at: at(hour + 10),
            body: format!("comment {hour}"),
        }))
        .await
        .unwrap();
    }
    port
}
