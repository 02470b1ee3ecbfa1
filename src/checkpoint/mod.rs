//! Per-node checkpoint records.
//!
//! A checkpoint is the unit of idempotency: a node whose checkpoint records
//! a tracker key has been created and is never submitted again. Records are
//! small TOML files, one per node, under the workspace `data/` directory:
//!
//! ```toml
//! [tracker]
//! key = "PRJ-12"
//! is_linked = false
//! submitted_payload = '{"Summary":"Epic A", ...}'
//! created_at = "2026-01-01T00:00:00Z"
//! ```

use crate::error::{MmjError, Result, ResultExt};
use crate::util::write_atomic;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Key value older tools wrote when creation never returned a key.
const UNSET_SENTINEL: &str = "None";

/// Durable state of one outline node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default)]
    pub is_linked: bool,
    /// JSON snapshot of the field map that was submitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_payload: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CheckpointFile {
    tracker: Checkpoint,
}

impl Checkpoint {
    /// A fresh record for a node that was just created as `key`.
    #[must_use]
    pub fn created(key: impl Into<String>, submitted_payload: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            is_linked: false,
            submitted_payload: Some(submitted_payload.into()),
            created_at: Some(Utc::now()),
        }
    }

    /// The recorded tracker key, if it is usable.
    #[must_use]
    pub fn tracker_key(&self) -> Option<&str> {
        self.key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty() && *k != UNSET_SENTINEL)
    }

    /// A record that exists but holds no usable key.
    #[must_use]
    pub fn is_corrupt(&self) -> bool {
        self.tracker_key().is_none()
    }
}

/// Storage for checkpoints, keyed by node id.
pub trait CheckpointStore {
    /// Whether a record exists for `node_id`.
    fn exists(&self, node_id: &str) -> bool;

    /// Read the record for `node_id`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the record exists but cannot be read.
    fn load(&self, node_id: &str) -> Result<Option<Checkpoint>>;

    /// Replace the record for `node_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    fn save(&self, node_id: &str, checkpoint: &Checkpoint) -> Result<()>;

    /// Where the record for `node_id` lives, for diagnostics.
    fn location(&self, node_id: &str) -> PathBuf;

    /// Read a record and require a usable key.
    ///
    /// # Errors
    ///
    /// Returns `CorruptCheckpoint` if the record exists without a usable key,
    /// or any read error.
    fn load_valid(&self, node_id: &str) -> Result<Option<Checkpoint>> {
        match self.load(node_id)? {
            Some(checkpoint) if checkpoint.is_corrupt() => Err(MmjError::CorruptCheckpoint {
                path: self.location(node_id),
            }),
            other => Ok(other),
        }
    }
}

/// Checkpoints stored as `<dir>/<node id>.toml`.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    dir: PathBuf,
}

impl FileCheckpointStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn exists(&self, node_id: &str) -> bool {
        self.location(node_id).is_file()
    }

    fn load(&self, node_id: &str) -> Result<Option<Checkpoint>> {
        let path = self.location(node_id);
        if !path.is_file() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path)?;
        let file: CheckpointFile = toml::from_str(&contents)
            .with_context(|| format!("reading checkpoint {}", path.display()))?;
        Ok(Some(file.tracker))
    }

    fn save(&self, node_id: &str, checkpoint: &Checkpoint) -> Result<()> {
        let path = self.location(node_id);
        let body = toml::to_string(&CheckpointFile {
            tracker: checkpoint.clone(),
        })?;
        write_atomic(&path, body.as_bytes())?;
        debug!(path = %path.display(), "Checkpoint written");
        Ok(())
    }

    fn location(&self, node_id: &str) -> PathBuf {
        self.dir.join(format!("{node_id}.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().expect("temp dir");
        let store = FileCheckpointStore::new(temp.path().join("data"));
        assert!(!store.exists("ID_1"));
        assert!(store.load("ID_1").unwrap().is_none());

        let checkpoint = Checkpoint::created("PRJ-1", r#"{"Summary":"Epic A"}"#);
        store.save("ID_1", &checkpoint).unwrap();

        assert!(store.exists("ID_1"));
        let loaded = store.load("ID_1").unwrap().unwrap();
        assert_eq!(loaded, checkpoint);
        assert_eq!(loaded.tracker_key(), Some("PRJ-1"));
    }

    #[test]
    fn test_file_layout() {
        let temp = TempDir::new().expect("temp dir");
        let store = FileCheckpointStore::new(temp.path());
        store
            .save("ID_9", &Checkpoint::created("PRJ-9", "{}"))
            .unwrap();
        let text = fs::read_to_string(temp.path().join("ID_9.toml")).unwrap();
        assert!(text.starts_with("[tracker]"));
        assert!(text.contains("key = \"PRJ-9\""));
        assert!(text.contains("is_linked = false"));
    }

    #[test]
    fn test_sentinel_key_is_corrupt() {
        let temp = TempDir::new().expect("temp dir");
        fs::write(
            temp.path().join("ID_2.toml"),
            "[tracker]\nkey = \"None\"\nis_linked = false\n",
        )
        .unwrap();
        let store = FileCheckpointStore::new(temp.path());

        let loaded = store.load("ID_2").unwrap().unwrap();
        assert!(loaded.is_corrupt());
        assert!(loaded.tracker_key().is_none());

        let err = store.load_valid("ID_2").unwrap_err();
        assert!(matches!(err, MmjError::CorruptCheckpoint { .. }));
    }

    #[test]
    fn test_missing_key_is_corrupt() {
        let checkpoint = Checkpoint::default();
        assert!(checkpoint.is_corrupt());
    }

    #[test]
    fn test_unparseable_record_names_file() {
        let temp = TempDir::new().expect("temp dir");
        fs::write(temp.path().join("ID_3.toml"), "not [valid").unwrap();
        let store = FileCheckpointStore::new(temp.path());
        let err = store.load("ID_3").unwrap_err();
        assert!(err.to_string().contains("ID_3.toml"));
    }
}
