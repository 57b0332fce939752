//! Hash store: SHA-256-based idempotency tracking for synthesized files.
//!
//! Persists a [`HashStoreFile`] JSON document at
//! `<out>/.blueprint/hashes.json`, keyed by output-relative path.
//! Writes use the same atomic `.tmp` + rename pattern as the manifests.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{io_err, SyncError};

/// In-memory hash store: maps relative file path strings to their last
/// written SHA-256 hex digest.
pub type HashStore = BTreeMap<String, String>;

/// On-disk hash store payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HashStoreFile {
    pub synced_at: DateTime<Utc>,
    /// Pipeline the files were synthesized from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<String>,
    pub files: HashStore,
}

impl HashStoreFile {
    fn empty() -> Self {
        HashStoreFile {
            synced_at: Utc::now(),
            pipeline: None,
            files: HashStore::new(),
        }
    }
}

/// `<out>/.blueprint/hashes.json`
pub fn store_path_at(out_dir: &Path) -> PathBuf {
    out_dir.join(".blueprint").join("hashes.json")
}

/// Load the hash store of `out_dir`.
///
/// Returns an empty store if the file does not yet exist.
pub fn load_at(out_dir: &Path) -> Result<HashStoreFile, SyncError> {
    let path = store_path_at(out_dir);
    if !path.exists() {
        return Ok(HashStoreFile::empty());
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    Ok(serde_json::from_str(&contents)?)
}

/// Save the hash store of `out_dir` atomically.
///
/// Writes to `<path>.tmp` then renames to `<path>`.
pub fn save_at(out_dir: &Path, store: &HashStoreFile) -> Result<(), SyncError> {
    let path = store_path_at(out_dir);
    let Some(dir) = path.parent() else {
        return Err(io_err(
            path,
            std::io::Error::other("invalid hash store path"),
        ));
    };

    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let json = serde_json::to_string_pretty(store)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn empty_store_when_file_missing() {
        let tmp = TempDir::new().unwrap();
        let store = load_at(tmp.path()).unwrap();
        assert!(store.files.is_empty());
        assert!(store.pipeline.is_none());
    }

    #[test]
    fn roundtrip_save_load() {
        let tmp = TempDir::new().unwrap();
        let mut files = HashStore::new();
        files.insert("pipeline.yaml".to_string(), "deadbeef".to_string());
        files.insert(
            "stages/dev/argocd/bootstrap.yaml".to_string(),
            "cafebabe".to_string(),
        );
        let store = HashStoreFile {
            synced_at: Utc::now(),
            pipeline: Some("capstone".to_string()),
            files,
        };

        save_at(tmp.path(), &store).unwrap();
        let loaded = load_at(tmp.path()).unwrap();
        assert_eq!(loaded, store);
    }

    #[test]
    fn tmp_file_cleaned_up_after_save() {
        let tmp = TempDir::new().unwrap();
        save_at(tmp.path(), &HashStoreFile::empty()).unwrap();
        let tmp_path = store_path_at(tmp.path()).with_extension("json.tmp");
        assert!(
            !tmp_path.exists(),
            "tmp file should be removed after atomic rename"
        );
    }

    #[test]
    fn corrupt_store_is_a_json_error() {
        let tmp = TempDir::new().unwrap();
        let path = store_path_at(tmp.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_at(tmp.path()), Err(SyncError::Json(_))));
    }
}
