//! Durable mirrors for the chat transcript.
//!
//! - **snapshot** — whole JSON array, rewritten on every append (temp file + rename)
//! - **journal** — one JSON record per line, appended and fsynced, replayed on load
//! - **memory** — nothing is written

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::io::AsyncWriteExt;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::{PersistenceError, RecoveryError};
use crate::models::Message;
use crate::store::recovery;

/// Where the in-memory sequence is mirrored to.
#[async_trait]
pub trait Mirror: Send + Sync {
    /// Read back prior history. A missing mirror is `Ok(vec![])`.
    async fn load(&self) -> Result<Vec<Message>, RecoveryError>;

    /// Make one attempt to persist after `appended` was pushed onto `log`.
    /// `log` already ends with `appended`.
    async fn persist(&self, log: &[Message], appended: &Message) -> Result<(), PersistenceError>;

    /// Backend name for logging and `/health`.
    fn name(&self) -> &str;
}

/// Build the mirror selected by `[storage] backend`.
pub fn create_mirror(config: &StorageConfig) -> Box<dyn Mirror> {
    match config.backend {
        StorageBackend::Snapshot => Box::new(SnapshotMirror::new(&config.chat_path)),
        StorageBackend::Journal => Box::new(JournalMirror::new(&config.chat_path)),
        StorageBackend::Memory => Box::new(NullMirror),
    }
}

async fn read_if_exists(path: &Path) -> Result<Option<String>, RecoveryError> {
    match tokio::fs::read_to_string(path).await {
        Ok(raw) => Ok(Some(raw)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => tokio::fs::create_dir_all(dir).await,
        _ => Ok(()),
    }
}

// ============================================================================
// Snapshot
// ============================================================================

#[derive(Debug, Clone)]
pub struct SnapshotMirror {
    path: PathBuf,
}

impl SnapshotMirror {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Mirror for SnapshotMirror {
    async fn load(&self) -> Result<Vec<Message>, RecoveryError> {
        let Some(raw) = read_if_exists(&self.path).await? else {
            return Ok(Vec::new());
        };

        let parsed: Value = serde_json::from_str(&raw)?;
        match parsed {
            Value::Array(records) => Ok(recovery::recover_records(records, Utc::now())),
            _ => Err(RecoveryError::NotAnArray),
        }
    }

    async fn persist(&self, log: &[Message], _appended: &Message) -> Result<(), PersistenceError> {
        ensure_parent(&self.path).await?;

        let contents = serde_json::to_string_pretty(log)?;
        let temp = self.path.with_extension("tmp");
        tokio::fs::write(&temp, contents).await?;

        // Readers only ever see a complete array
        tokio::fs::rename(&temp, &self.path).await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "snapshot"
    }
}

// ============================================================================
// Journal
// ============================================================================

#[derive(Debug, Clone)]
pub struct JournalMirror {
    path: PathBuf,
}

impl JournalMirror {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Mirror for JournalMirror {
    async fn load(&self) -> Result<Vec<Message>, RecoveryError> {
        let Some(raw) = read_if_exists(&self.path).await? else {
            return Ok(Vec::new());
        };

        let mut records = Vec::new();
        let complete = raw.rfind('\n').map_or(0, |i| i + 1);
        for (lineno, line) in raw[..complete].lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Value>(line) {
                Ok(v) => records.push(v),
                // A hand-edited line only costs that one record
                Err(e) => tracing::warn!(line = lineno + 1, error = %e, "Skipping corrupt journal line"),
            }
        }

        // Bytes after the last newline: either a record missing its terminator
        // or a torn write. The next append must start on a line of its own.
        let tail = &raw[complete..];
        if !tail.trim().is_empty() {
            match serde_json::from_str::<Value>(tail) {
                Ok(v) => {
                    records.push(v);
                    if let Err(e) = append_bytes(&self.path, b"\n").await {
                        tracing::warn!(error = %e, "Failed to terminate journal tail");
                    }
                }
                Err(e) => {
                    tracing::warn!(torn_bytes = tail.len(), error = %e, "Truncating torn journal tail");
                    if let Err(e) = truncate_to(&self.path, complete as u64).await {
                        tracing::warn!(error = %e, "Failed to truncate torn journal tail");
                    }
                }
            }
        }

        Ok(recovery::recover_records(records, Utc::now()))
    }

    async fn persist(&self, _log: &[Message], appended: &Message) -> Result<(), PersistenceError> {
        ensure_parent(&self.path).await?;

        let mut line = serde_json::to_vec(appended)?;
        line.push(b'\n');

        append_bytes(&self.path, &line).await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "journal"
    }
}

async fn append_bytes(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(bytes).await?;
    file.sync_all().await
}

async fn truncate_to(path: &Path, len: u64) -> std::io::Result<()> {
    let file = tokio::fs::OpenOptions::new().write(true).open(path).await?;
    file.set_len(len).await?;
    file.sync_all().await
}

// ============================================================================
// Memory
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct NullMirror;

#[async_trait]
impl Mirror for NullMirror {
    async fn load(&self) -> Result<Vec<Message>, RecoveryError> {
        Ok(Vec::new())
    }

    async fn persist(&self, _log: &[Message], _appended: &Message) -> Result<(), PersistenceError> {
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
