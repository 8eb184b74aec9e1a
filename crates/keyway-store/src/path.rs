//! Dotted-path addressing into JSON documents.
//!
//! A path such as `auth_servers.example-com.issuer` names a value nested
//! inside objects. Writes create missing intermediate objects; they never
//! overwrite a non-object value on the way down.

use crate::{StoreError, StoreResult, Updates};
use serde_json::{Map, Value};

/// Split a dotted path into its segments.
pub fn segments(path: &str) -> StoreResult<Vec<&str>> {
    if path.is_empty() {
        return Err(StoreError::invalid_path("path cannot be empty"));
    }

    let parts: Vec<&str> = path.split('.').collect();
    if parts.iter().any(|s| s.is_empty()) {
        return Err(StoreError::invalid_path(format!(
            "empty segment in '{path}'"
        )));
    }

    Ok(parts)
}

/// Get the value at a dotted path, if present.
pub fn get<'a>(root: &'a Value, path: &str) -> StoreResult<Option<&'a Value>> {
    let mut current = root;
    for segment in segments(path)? {
        match current.get(segment) {
            Some(next) => current = next,
            None => return Ok(None),
        }
    }
    Ok(Some(current))
}

/// Set the value at a dotted path, creating intermediate objects.
pub fn set(root: &mut Value, path: &str, value: Value) -> StoreResult<()> {
    let parts = segments(path)?;
    let (last, parents) = parts
        .split_last()
        .ok_or_else(|| StoreError::invalid_path("path cannot be empty"))?;

    if root.is_null() {
        *root = Value::Object(Map::new());
    }

    let mut current = root;
    for (depth, segment) in parents.iter().enumerate() {
        let map = current
            .as_object_mut()
            .ok_or_else(|| StoreError::PathConflict(parts[..depth].join(".")))?;
        current = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    let map = current
        .as_object_mut()
        .ok_or_else(|| StoreError::PathConflict(parents.join(".")))?;
    map.insert(last.to_string(), value);
    Ok(())
}

/// Apply a batch of updates in path order.
pub fn apply(root: &mut Value, updates: Updates) -> StoreResult<()> {
    for (path, value) in updates {
        set(root, &path, value)?;
    }
    Ok(())
}
