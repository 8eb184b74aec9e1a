//! Document storage for keyway.
//!
//! keyway keeps two JSON documents: non-secret settings and secrets. Both
//! are accessed through [`DocumentStore`], which supports a full read and
//! point updates addressed by dotted path:
//! - JSON file storage (default)
//! - In-memory storage (for testing)

pub mod error;
pub mod json;
pub mod memory;
pub mod path;

pub use error::{StoreError, StoreResult};
pub use json::JsonFileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;

/// A batch of point updates, keyed by dotted path.
///
/// `BTreeMap` keeps application order deterministic.
pub type Updates = BTreeMap<String, Value>;

/// A single JSON document with path-based updates.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read the whole document.
    ///
    /// A document that has never been written reads as an empty object.
    async fn read(&self) -> StoreResult<Value>;

    /// Merge the given updates into the document in one write.
    ///
    /// Returns the document as written.
    async fn update(&self, updates: Updates) -> StoreResult<Value>;

    /// Write `value` at `path` only if nothing is stored there yet.
    ///
    /// Fails with [`StoreError::AlreadyExists`] otherwise. The check and the
    /// write happen under the same lock.
    async fn insert(&self, path: &str, value: Value) -> StoreResult<()>;
}

/// Build an [`Updates`] batch from `(path, value)` pairs.
pub fn updates<I, K>(pairs: I) -> Updates
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

/// Apply an insert-if-absent against an in-memory document.
pub(crate) fn insert_into(doc: &mut Value, path: &str, value: Value) -> StoreResult<()> {
    if path::get(doc, path)?.is_some() {
        return Err(StoreError::already_exists(path));
    }
    path::set(doc, path, value)
}
