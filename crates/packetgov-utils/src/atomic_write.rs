//! Atomic JSON file writes.
//!
//! Writes go to a temp file in the target directory, get fsynced, then
//! rename over the destination. Readers may race a writer and observe the
//! prior or the new file, never a torn one.

use anyhow::{Context, Result};
use camino::Utf8Path;
use serde::Serialize;
use std::io::Write;
use tempfile::NamedTempFile;

use crate::lock::{FileLock, LockOptions};
use crate::paths::ensure_dir_all;

/// Atomically write `payload` as pretty JSON under the target's file lock.
pub fn atomic_write_json<T: Serialize>(path: &Utf8Path, payload: &T) -> Result<()> {
    let _lock = FileLock::acquire(path, LockOptions::default())
        .with_context(|| format!("failed to lock {path} for writing"))?;
    atomic_write_json_locked(path, payload)
}

/// Atomically write `payload` when the caller already holds the target lock.
pub fn atomic_write_json_locked<T: Serialize>(path: &Utf8Path, payload: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir_all(parent).with_context(|| format!("failed to create directory: {parent}"))?;
    }

    let mut content =
        serde_json::to_string_pretty(payload).with_context(|| "failed to serialize JSON")?;
    content.push('\n');

    let temp_dir = path.parent().unwrap_or_else(|| Utf8Path::new("."));
    let mut temp_file = NamedTempFile::new_in(temp_dir)
        .with_context(|| format!("failed to create temp file in: {temp_dir}"))?;
    temp_file
        .write_all(content.as_bytes())
        .with_context(|| "failed to write temp file")?;
    temp_file
        .as_file()
        .sync_all()
        .with_context(|| "failed to fsync temp file")?;
    temp_file
        .persist(path.as_std_path())
        .map_err(|e| anyhow::anyhow!(e.error))
        .with_context(|| format!("failed to atomically replace: {path}"))?;

    Ok(())
}

/// Read a JSON file, returning `Ok(None)` when it does not exist.
pub fn read_json_opt<T: serde::de::DeserializeOwned>(path: &Utf8Path) -> Result<Option<T>> {
    match std::fs::read_to_string(path.as_std_path()) {
        Ok(content) => {
            let value = serde_json::from_str(&content)
                .with_context(|| format!("failed to parse JSON: {path}"))?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("failed to read: {path}")),
    }
}
