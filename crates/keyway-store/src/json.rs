//! JSON file-backed document store.
//!
//! The whole document lives in one file. Every mutation rewrites it through
//! a temporary file followed by a rename, so readers never observe a
//! half-written document.

use crate::{insert_into, path, DocumentStore, StoreError, StoreResult, Updates};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

/// A document stored as a single pretty-printed JSON file.
pub struct JsonFileStore {
    path: PathBuf,
    /// Restrict the file to its owner (0600 on Unix).
    owner_only: bool,
    /// Serializes read-modify-write cycles within the process.
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Create a store for the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            owner_only: false,
            write_lock: Mutex::new(()),
        }
    }

    /// Create a store whose file is readable only by its owner.
    ///
    /// Used for the secrets document.
    pub fn owner_only(path: impl Into<PathBuf>) -> Self {
        Self {
            owner_only: true,
            ..Self::new(path)
        }
    }

    /// Get the path to the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> StoreResult<Value> {
        debug!(path = %self.path.display(), "Reading document");

        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Value::Object(Map::new()))
            }
            Err(e) => return Err(StoreError::Io(e)),
        };

        if content.trim().is_empty() {
            return Ok(Value::Object(Map::new()));
        }

        Ok(serde_json::from_str(&content)?)
    }

    async fn save(&self, doc: &Value) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(doc)?;

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, &content).await?;

        #[cfg(unix)]
        {
            if self.owner_only {
                use std::os::unix::fs::PermissionsExt;
                let perms = std::fs::Permissions::from_mode(0o600);
                fs::set_permissions(&temp_path, perms).await.map_err(|e| {
                    StoreError::Permissions(format!("{}: {e}", temp_path.display()))
                })?;
            }
        }

        fs::rename(&temp_path, &self.path).await?;

        debug!(path = %self.path.display(), "Wrote document");
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for JsonFileStore {
    async fn read(&self) -> StoreResult<Value> {
        self.load().await
    }

    async fn update(&self, updates: Updates) -> StoreResult<Value> {
        let _guard = self.write_lock.lock().await;

        let mut doc = self.load().await?;
        path::apply(&mut doc, updates)?;
        self.save(&doc).await?;

        Ok(doc)
    }

    async fn insert(&self, path: &str, value: Value) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;

        let mut doc = self.load().await?;
        insert_into(&mut doc, path, value)?;
        self.save(&doc).await
    }
}

impl std::fmt::Debug for JsonFileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonFileStore")
            .field("path", &self.path)
            .field("owner_only", &self.owner_only)
            .finish()
    }
}
