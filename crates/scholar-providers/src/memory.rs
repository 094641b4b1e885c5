//! In-memory document store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use scholar_core::{Error, IgnoreLock as _, Persistence, Result};
use serde_json::Value;
use uuid::Uuid;

/// In-process `Persistence` implementation.
///
/// Collections are plain record lists; `find` matches records whose top-level
/// fields all equal the filter's fields. Cloning the store shares the
/// underlying collections, so a handle given to the engine and a handle kept
/// by a test observe the same records. Durable external stores live behind
/// the same trait on the host side of the boundary.
#[derive(Clone, Default)]
pub struct MemoryStore {
    /// Records grouped by collection name.
    collections: Arc<Mutex<HashMap<String, Vec<Value>>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records in a collection.
    #[must_use]
    pub fn collection_len(&self, collection: &str) -> usize {
        let collections = self.collections.lock_ignore_poison();
        collections.get(collection).map_or(0, Vec::len)
    }

    /// Whether a record matches a conjunctive top-level filter.
    fn matches(record: &Value, filter: &Value) -> bool {
        let Some(filter_fields) = filter.as_object() else {
            return false;
        };
        filter_fields
            .iter()
            .all(|(key, expected)| record.get(key) == Some(expected))
    }
}

#[async_trait]
impl Persistence for MemoryStore {
    async fn save(&self, collection: &str, record: Value) -> Result<String> {
        let mut record = record;
        let Some(fields) = record.as_object_mut() else {
            return Err(Error::Persistence(
                "records must be JSON objects".to_owned(),
            ));
        };

        let id = match fields.get("id").and_then(Value::as_str) {
            Some(existing) => existing.to_owned(),
            None => {
                let id = Uuid::new_v4().to_string();
                fields.insert("id".to_owned(), Value::String(id.clone()));
                id
            }
        };

        let mut collections = self.collections.lock_ignore_poison();
        collections
            .entry(collection.to_owned())
            .or_default()
            .push(record);
        Ok(id)
    }

    async fn find(&self, collection: &str, filter: &Value) -> Result<Vec<Value>> {
        let collections = self.collections.lock_ignore_poison();
        let Some(records) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        Ok(records
            .iter()
            .filter(|record| Self::matches(record, filter))
            .cloned()
            .collect())
    }
}

/// Persistence wrapper that fails a scripted number of saves before
/// delegating, for exercising bounded-retry paths.
#[derive(Clone)]
pub struct FlakyStore {
    /// Store that serves requests once failures are exhausted.
    inner: MemoryStore,
    /// Remaining saves to fail.
    failures_left: Arc<Mutex<usize>>,
}

impl FlakyStore {
    /// Wraps a store, failing the first `failures` save calls.
    #[must_use]
    pub fn failing(inner: MemoryStore, failures: usize) -> Self {
        Self {
            inner,
            failures_left: Arc::new(Mutex::new(failures)),
        }
    }
}

#[async_trait]
impl Persistence for FlakyStore {
    async fn save(&self, collection: &str, record: Value) -> Result<String> {
        {
            let mut failures_left = self.failures_left.lock_ignore_poison();
            if *failures_left > 0 {
                *failures_left -= 1;
                return Err(Error::Persistence("simulated write failure".to_owned()));
            }
        }
        self.inner.save(collection, record).await
    }

    async fn find(&self, collection: &str, filter: &Value) -> Result<Vec<Value>> {
        self.inner.find(collection, filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn save_assigns_ids_and_find_filters() {
        let store = MemoryStore::new();

        let saved = store
            .save("quizzes", json!({"user_id": "u1", "topic": "algebra"}))
            .await;
        assert!(saved.is_ok(), "save failed");

        let other = store
            .save("quizzes", json!({"user_id": "u2", "topic": "geometry"}))
            .await;
        assert!(other.is_ok());

        let found = store.find("quizzes", &json!({"user_id": "u1"})).await;
        assert!(found.is_ok());
        if let Ok(records) = found {
            assert_eq!(records.len(), 1);
            assert_eq!(records[0]["topic"], json!("algebra"));
            assert!(records[0]["id"].is_string(), "id should be generated");
        }
    }

    #[tokio::test]
    async fn find_on_missing_collection_is_empty() {
        let store = MemoryStore::new();
        let found = store.find("nothing", &json!({})).await;
        assert!(found.is_ok());
        assert_eq!(found.map(|records| records.len()).unwrap_or(99), 0);
    }

    #[tokio::test]
    async fn empty_filter_matches_everything() {
        let store = MemoryStore::new();
        let first = store.save("responses", json!({"topic": "a"})).await;
        let second = store.save("responses", json!({"topic": "b"})).await;
        assert!(first.is_ok() && second.is_ok());

        let found = store.find("responses", &json!({})).await;
        assert_eq!(found.map(|records| records.len()).unwrap_or(0), 2);
    }

    #[tokio::test]
    async fn non_object_records_are_rejected() {
        let store = MemoryStore::new();
        let saved = store.save("quizzes", json!("just a string")).await;
        assert!(matches!(saved, Err(Error::Persistence(_))));
    }

    #[tokio::test]
    async fn clones_share_collections() {
        let store = MemoryStore::new();
        let handle = store.clone();

        let saved = handle.save("quizzes", json!({"user_id": "u1"})).await;
        assert!(saved.is_ok());
        assert_eq!(store.collection_len("quizzes"), 1);
    }

    #[tokio::test]
    async fn flaky_store_recovers_after_scripted_failures() {
        let inner = MemoryStore::new();
        let flaky = FlakyStore::failing(inner.clone(), 2);

        let first = flaky.save("quizzes", json!({"n": 1})).await;
        let second = flaky.save("quizzes", json!({"n": 2})).await;
        let third = flaky.save("quizzes", json!({"n": 3})).await;

        assert!(matches!(first, Err(Error::Persistence(_))));
        assert!(matches!(second, Err(Error::Persistence(_))));
        assert!(third.is_ok());
        assert_eq!(inner.collection_len("quizzes"), 1);
    }
}
