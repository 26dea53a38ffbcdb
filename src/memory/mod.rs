//! Memory Store
//!
//! Keeps the latest result of every `(workflow, task)` pair so that later
//! runs, tools or a front end can look them up. The store is shared between
//! worker threads behind an `Arc` and can be saved to and loaded from a JSON
//! snapshot.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors from saving or loading a snapshot.
#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("Failed to access memory snapshot {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid memory snapshot: {0}")]
    Json(#[from] serde_json::Error),
}

/// One recorded task result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryEntry {
    pub workflow_id: String,
    pub task_id: String,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
}

/// Summary counters for a store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStats {
    pub total_entries: usize,
    pub total_workflows: usize,
    /// Size in bytes of the entries serialized as JSON
    pub memory_size: usize,
    pub created_at: DateTime<Utc>,
    pub total_writes: u64,
    pub total_reads: u64,
}

/// On-disk form of a store.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MemorySnapshot {
    created_at: DateTime<Utc>,
    total_writes: u64,
    total_reads: u64,
    entries: Vec<MemoryEntry>,
}

/// Thread-safe store of task results keyed by workflow and task id.
///
/// Entries keep their first insertion position; storing the same pair again
/// replaces the entry in place.
#[derive(Debug)]
pub struct MemoryStore {
    entries: RwLock<Vec<MemoryEntry>>,
    created_at: DateTime<Utc>,
    total_writes: AtomicU64,
    total_reads: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            created_at: Utc::now(),
            total_writes: AtomicU64::new(0),
            total_reads: AtomicU64::new(0),
        }
    }

    /// Records `data` for a task, replacing any earlier entry for the pair.
    pub fn store(&self, workflow_id: &str, task_id: &str, data: Value) -> MemoryEntry {
        let entry = MemoryEntry {
            workflow_id: workflow_id.to_string(),
            task_id: task_id.to_string(),
            data,
            timestamp: Utc::now(),
        };

        let mut entries = self.write_entries();
        match entries
            .iter_mut()
            .find(|e| e.workflow_id == workflow_id && e.task_id == task_id)
        {
            Some(existing) => *existing = entry.clone(),
            None => entries.push(entry.clone()),
        }
        drop(entries);

        self.total_writes.fetch_add(1, Ordering::Relaxed);
        debug!("Stored result of {}:{}", workflow_id, task_id);
        entry
    }

    /// Returns the entry for one task.
    pub fn retrieve(&self, workflow_id: &str, task_id: &str) -> Option<MemoryEntry> {
        self.total_reads.fetch_add(1, Ordering::Relaxed);
        self.read_entries()
            .iter()
            .find(|e| e.workflow_id == workflow_id && e.task_id == task_id)
            .cloned()
    }

    /// Returns every entry of a workflow in insertion order.
    pub fn retrieve_all(&self, workflow_id: &str) -> Vec<MemoryEntry> {
        self.total_reads.fetch_add(1, Ordering::Relaxed);
        self.read_entries()
            .iter()
            .filter(|e| e.workflow_id == workflow_id)
            .cloned()
            .collect()
    }

    /// Removes every entry of a workflow and returns how many were removed.
    pub fn clear(&self, workflow_id: &str) -> usize {
        let mut entries = self.write_entries();
        let before = entries.len();
        entries.retain(|e| e.workflow_id != workflow_id);
        before - entries.len()
    }

    /// Removes everything and returns how many entries were removed.
    pub fn clear_all(&self) -> usize {
        let mut entries = self.write_entries();
        let removed = entries.len();
        entries.clear();
        removed
    }

    /// Case-insensitive substring search over each entry's JSON form.
    pub fn search(&self, query: &str) -> Vec<MemoryEntry> {
        let needle = query.to_lowercase();
        self.read_entries()
            .iter()
            .filter(|e| {
                serde_json::to_string(e)
                    .map(|json| json.to_lowercase().contains(&needle))
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_entries().is_empty()
    }

    pub fn stats(&self) -> MemoryStats {
        let entries = self.read_entries();
        let workflows: HashSet<&str> = entries.iter().map(|e| e.workflow_id.as_str()).collect();
        let memory_size = serde_json::to_vec(&*entries).map(|v| v.len()).unwrap_or(0);

        MemoryStats {
            total_entries: entries.len(),
            total_workflows: workflows.len(),
            memory_size,
            created_at: self.created_at,
            total_writes: self.total_writes.load(Ordering::Relaxed),
            total_reads: self.total_reads.load(Ordering::Relaxed),
        }
    }

    /// Writes the store to `path` as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), MemoryError> {
        let path = path.as_ref();
        let snapshot = MemorySnapshot {
            created_at: self.created_at,
            total_writes: self.total_writes.load(Ordering::Relaxed),
            total_reads: self.total_reads.load(Ordering::Relaxed),
            entries: self.read_entries().clone(),
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        fs::write(path, json).map_err(|source| MemoryError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        info!("Saved {} memory entries to {}", snapshot.entries.len(), path.display());
        Ok(())
    }

    /// Reads a store previously written by [`save`](Self::save).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MemoryError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| MemoryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let snapshot: MemorySnapshot = serde_json::from_str(&content)?;

        info!("Loaded {} memory entries from {}", snapshot.entries.len(), path.display());
        Ok(Self {
            entries: RwLock::new(snapshot.entries),
            created_at: snapshot.created_at,
            total_writes: AtomicU64::new(snapshot.total_writes),
            total_reads: AtomicU64::new(snapshot.total_reads),
        })
    }

    /// Loads `path` if it exists, otherwise starts empty.
    pub fn load_or_new(path: impl AsRef<Path>) -> Result<Self, MemoryError> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::new())
        }
    }

    // A panicking writer cannot leave an entry half-written, so a poisoned
    // lock is still safe to use.
    fn read_entries(&self) -> std::sync::RwLockReadGuard<'_, Vec<MemoryEntry>> {
        self.entries.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_entries(&self) -> std::sync::RwLockWriteGuard<'_, Vec<MemoryEntry>> {
        self.entries.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}
