//! Operation interface for memory-storage implementations under test, and
//! the in-process candidate store.
//!
//! The harness only ever talks to an implementation through [`MemoryStore`];
//! what happens behind it is opaque to the timing code.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BenchError, Result};

pub type RecordId = u64;

/// One stored memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: RecordId,
    pub user_id: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    pub created_at: DateTime<Utc>,
}

/// Narrow operation interface every benchmarked implementation exposes.
pub trait MemoryStore {
    /// Human-readable implementation name, used in logs.
    fn name(&self) -> &str;

    /// Insert one record and return its id.
    fn add(&mut self, user_id: &str, content: String) -> Result<RecordId>;

    /// Insert one record carrying an embedding vector.
    fn add_with_embedding(
        &mut self,
        user_id: &str,
        content: String,
        embedding: Vec<f32>,
    ) -> Result<RecordId>;

    /// Fetch a record by id.
    fn get(&self, id: RecordId) -> Result<Option<MemoryRecord>>;

    /// All records owned by `user_id`, in insertion order.
    fn list_for_user(&self, user_id: &str) -> Result<Vec<MemoryRecord>>;

    /// Drop every record. Used between suites so fixtures do not leak.
    fn reset(&mut self) -> Result<()>;
}

/// Hash-map backed store; the Rust candidate implementation.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    next_id: RecordId,
    records: HashMap<RecordId, MemoryRecord>,
    by_user: HashMap<String, Vec<RecordId>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn insert(&mut self, user_id: &str, content: String, embedding: Option<Vec<f32>>) -> RecordId {
        self.next_id += 1;
        let id = self.next_id;
        self.records.insert(
            id,
            MemoryRecord {
                id,
                user_id: user_id.to_string(),
                content,
                embedding,
                created_at: Utc::now(),
            },
        );
        self.by_user.entry(user_id.to_string()).or_default().push(id);
        id
    }
}

impl MemoryStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    fn add(&mut self, user_id: &str, content: String) -> Result<RecordId> {
        Ok(self.insert(user_id, content, None))
    }

    fn add_with_embedding(
        &mut self,
        user_id: &str,
        content: String,
        embedding: Vec<f32>,
    ) -> Result<RecordId> {
        if embedding.is_empty() {
            return Err(BenchError::Store("embedding must not be empty".to_string()));
        }
        Ok(self.insert(user_id, content, Some(embedding)))
    }

    fn get(&self, id: RecordId) -> Result<Option<MemoryRecord>> {
        Ok(self.records.get(&id).cloned())
    }

    fn list_for_user(&self, user_id: &str) -> Result<Vec<MemoryRecord>> {
        Ok(self
            .by_user
            .get(user_id)
            .map(|ids| ids.iter().filter_map(|id| self.records.get(id)).cloned().collect())
            .unwrap_or_default())
    }

    fn reset(&mut self) -> Result<()> {
        self.records.clear();
        self.by_user.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_then_get_roundtrips_content() {
        let mut store = InMemoryStore::new();
        let id = store.add("alice", "hello".to_string()).expect("add");
        let record = store.get(id).expect("get").expect("present");
        assert_eq!(record.content, "hello");
        assert_eq!(record.user_id, "alice");
        assert!(record.embedding.is_none());
    }

    #[test]
    fn list_for_user_keeps_insertion_order_and_isolates_users() {
        let mut store = InMemoryStore::new();
        store.add("alice", "a1".to_string()).expect("add");
        store.add("bob", "b1".to_string()).expect("add");
        store.add("alice", "a2".to_string()).expect("add");

        let contents: Vec<_> = store
            .list_for_user("alice")
            .expect("list")
            .into_iter()
            .map(|r| r.content)
            .collect();
        assert_eq!(contents, vec!["a1", "a2"]);
        assert!(store.list_for_user("carol").expect("list").is_empty());
    }

    #[test]
    fn empty_embedding_is_rejected() {
        let mut store = InMemoryStore::new();
        let err = store
            .add_with_embedding("alice", "x".to_string(), Vec::new())
            .expect_err("empty embedding");
        assert!(matches!(err, BenchError::Store(_)));
    }

    #[test]
    fn reset_clears_everything() {
        let mut store = InMemoryStore::new();
        let id = store
            .add_with_embedding("alice", "x".to_string(), vec![0.5; 4])
            .expect("add");
        store.reset().expect("reset");
        assert!(store.is_empty());
        assert!(store.get(id).expect("get").is_none());
        assert!(store.list_for_user("alice").expect("list").is_empty());
    }
}
