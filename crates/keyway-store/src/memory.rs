//! In-memory document store for testing.

use crate::{insert_into, path, DocumentStore, StoreError, StoreResult, Updates};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::RwLock;

/// In-memory document.
///
/// This stores the document in memory and is not persistent.
pub struct MemoryStore {
    doc: RwLock<Value>,
}

impl MemoryStore {
    /// Create an empty in-memory document.
    pub fn new() -> Self {
        Self::with_document(Value::Object(Map::new()))
    }

    /// Create an in-memory document with initial contents.
    pub fn with_document(doc: Value) -> Self {
        Self {
            doc: RwLock::new(doc),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn read(&self) -> StoreResult<Value> {
        let doc = self
            .doc
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
        Ok(doc.clone())
    }

    async fn update(&self, updates: Updates) -> StoreResult<Value> {
        let mut doc = self
            .doc
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;

        // Apply to a copy so a bad path leaves the document unchanged.
        let mut next = doc.clone();
        path::apply(&mut next, updates)?;
        *doc = next.clone();

        Ok(next)
    }

    async fn insert(&self, path: &str, value: Value) -> StoreResult<()> {
        let mut doc = self
            .doc
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
        insert_into(&mut doc, path, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::updates;
    use serde_json::json;

    #[tokio::test]
    async fn test_memory_store_update_and_read() {
        let store = MemoryStore::new();

        let written = store
            .update(updates([
                ("auth_servers.x.issuer", json!("i")),
                ("auth_servers.x.client_id", json!("c")),
            ]))
            .await
            .unwrap();

        assert_eq!(written, store.read().await.unwrap());
        assert_eq!(written["auth_servers"]["x"]["client_id"], "c");
    }

    #[tokio::test]
    async fn test_memory_store_default_is_empty() {
        let store = MemoryStore::default();
        assert_eq!(store.read().await.unwrap(), json!({}));
    }

    #[tokio::test]
    async fn test_memory_store_failed_update_is_atomic() {
        let store = MemoryStore::with_document(json!({"a": 1}));

        let result = store
            .update(updates([("b", json!(2)), ("a.c", json!(3))]))
            .await;

        assert!(matches!(result, Err(StoreError::PathConflict(_))));
        assert_eq!(store.read().await.unwrap(), json!({"a": 1}));
    }

    #[tokio::test]
    async fn test_memory_store_insert() {
        let store = MemoryStore::new();

        store.insert("credentials.a", json!({"x": 1})).await.unwrap();
        assert!(matches!(
            store.insert("credentials.a", json!({"x": 2})).await,
            Err(StoreError::AlreadyExists(_))
        ));
        store.insert("credentials.b", json!({"x": 3})).await.unwrap();

        let doc = store.read().await.unwrap();
        assert_eq!(doc["credentials"]["a"]["x"], 1);
        assert_eq!(doc["credentials"]["b"]["x"], 3);
    }
}
