//! Atomic writer and synth orchestration.
//!
//! ## `atomic_write`: 7-step protocol
//!
//! 1. Render content (already done by caller).
//! 2. SHA-256 hash the LF-normalised content.
//! 3. Load the hash store.
//! 4. Compare with stored hash → skip if identical.
//! 5. Write to `<path>.blueprint.tmp`.
//! 6. Rename to final path (atomic on POSIX).
//! 7. Update hash store entry + save store.

use std::path::{Path, PathBuf};

use chrono::Utc;
use sha2::{Digest, Sha256};

use blueprint_core::PipelineSpec;
use blueprint_renderer::Renderer;

use crate::error::{io_err, SyncError};
use crate::hash_store;

// ---------------------------------------------------------------------------
// Write result
// ---------------------------------------------------------------------------

/// Outcome of an individual file write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteResult {
    /// File was written (content changed or did not previously exist).
    Written { path: PathBuf },
    /// Rendered content matches the stored hash; the file was left alone.
    Unchanged { path: PathBuf },
    /// Dry run: the file would have been written.
    WouldWrite { path: PathBuf },
}

impl WriteResult {
    pub fn path(&self) -> &Path {
        match self {
            WriteResult::Written { path }
            | WriteResult::Unchanged { path }
            | WriteResult::WouldWrite { path } => path,
        }
    }
}

// ---------------------------------------------------------------------------
// atomic_write
// ---------------------------------------------------------------------------

/// Atomically write a single rendered file and update the in-memory store.
///
/// `key` is the output-relative path the hash is stored under. The caller
/// saves the store once every file of the pipeline has been processed.
pub(crate) fn atomic_write(
    path: &Path,
    key: &str,
    content: &str,
    store: &mut hash_store::HashStore,
    dry_run: bool,
) -> Result<WriteResult, SyncError> {
    let tmp = PathBuf::from(format!("{}.blueprint.tmp", path.display()));
    atomic_write_with_tmp(path, key, content, store, dry_run, &tmp)
}

fn atomic_write_with_tmp(
    path: &Path,
    key: &str,
    content: &str,
    store: &mut hash_store::HashStore,
    dry_run: bool,
    tmp: &Path,
) -> Result<WriteResult, SyncError> {
    let normalized = content.replace("\r\n", "\n");
    let content = normalized.as_str();
    let digest = sha256_hex(content);

    // A file deleted behind our back is rewritten even if the hash matches.
    if store.get(key) == Some(&digest) && path.exists() {
        tracing::debug!("unchanged: {}", path.display());
        return Ok(WriteResult::Unchanged {
            path: path.to_path_buf(),
        });
    }

    if dry_run {
        tracing::info!("[dry-run] would write: {}", path.display());
        return Ok(WriteResult::WouldWrite {
            path: path.to_path_buf(),
        });
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    if let Some(tmp_parent) = tmp.parent() {
        std::fs::create_dir_all(tmp_parent).map_err(|e| io_err(tmp_parent, e))?;
    }
    std::fs::write(tmp, content).map_err(|e| io_err(tmp, e))?;

    if let Err(e) = std::fs::rename(tmp, path) {
        let _ = std::fs::remove_file(tmp);
        return Err(io_err(path, e));
    }

    store.insert(key.to_string(), digest);

    tracing::info!("wrote: {}", path.display());
    Ok(WriteResult::Written {
        path: path.to_path_buf(),
    })
}

fn sha256_hex(content: &str) -> String {
    let mut h = Sha256::new();
    h.update(content.as_bytes());
    hex::encode(h.finalize())
}

/// Store key for an output-relative path: forward slashes on every platform.
pub(crate) fn store_key(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

pub(crate) fn renderer_for(templates: Option<&Path>) -> Result<Renderer, SyncError> {
    let renderer = match templates {
        Some(dir) => Renderer::with_overrides(dir)?,
        None => Renderer::new()?,
    };
    Ok(renderer)
}

// ---------------------------------------------------------------------------
// synth
// ---------------------------------------------------------------------------

/// Options for [`synth`].
#[derive(Debug, Clone, Default)]
pub struct SynthOptions {
    /// Report what would change without touching the filesystem.
    pub dry_run: bool,
    /// Directory of user templates overriding the embedded ones.
    pub templates: Option<PathBuf>,
}

/// Outcome of synthesizing one pipeline.
#[derive(Debug)]
pub struct SynthResult {
    pub pipeline_name: String,
    pub writes: Vec<WriteResult>,
}

impl SynthResult {
    pub fn written(&self) -> usize {
        self.writes
            .iter()
            .filter(|w| matches!(w, WriteResult::Written { .. }))
            .count()
    }

    pub fn unchanged(&self) -> usize {
        self.writes
            .iter()
            .filter(|w| matches!(w, WriteResult::Unchanged { .. }))
            .count()
    }
}

/// Render every manifest of `spec` and write it under `out_dir`.
///
/// Files whose rendered content matches the hash store are left untouched.
/// In dry-run mode neither manifests nor the store are written.
pub fn synth(
    spec: &PipelineSpec,
    out_dir: &Path,
    options: &SynthOptions,
) -> Result<SynthResult, SyncError> {
    let started_at = Utc::now();
    let renderer = renderer_for(options.templates.as_deref())?;
    let outputs = renderer.render(spec)?;

    let mut store = hash_store::load_at(out_dir)?;
    let mut writes = Vec::with_capacity(outputs.len());
    for (relative, content) in outputs {
        let path = out_dir.join(&relative);
        let key = store_key(&relative);
        writes.push(atomic_write(
            &path,
            &key,
            &content,
            &mut store.files,
            options.dry_run,
        )?);
    }

    if !options.dry_run {
        store.synced_at = started_at;
        store.pipeline = Some(spec.name.clone());
        hash_store::save_at(out_dir, &store)?;
    }

    Ok(SynthResult {
        pipeline_name: spec.name.clone(),
        writes,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use blueprint_core::{PipelineConfig, Settings};
    use std::fs;
    use tempfile::TempDir;

    fn write_content(path: &Path, content: &str) -> WriteResult {
        let mut store = hash_store::HashStore::new();
        atomic_write(path, "file.yaml", content, &mut store, false).unwrap()
    }

    fn reference_spec() -> PipelineSpec {
        PipelineConfig::reference()
            .build(&Settings {
                account: Some("219890958300".into()),
                region: None,
            })
            .expect("reference pipeline")
    }

    #[test]
    fn first_write_returns_written() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("pipeline.yaml");
        let result = write_content(&path, "hello");
        assert!(matches!(result, WriteResult::Written { .. }));
        assert!(path.exists());
    }

    #[test]
    fn second_write_same_content_returns_unchanged() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("file.yaml");
        let mut store = hash_store::HashStore::new();
        atomic_write(&path, "file.yaml", "same", &mut store, false).unwrap();
        let result = atomic_write(&path, "file.yaml", "same", &mut store, false).unwrap();
        assert!(matches!(result, WriteResult::Unchanged { .. }));
    }

    #[test]
    fn changed_content_returns_written() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("file.yaml");
        let mut store = hash_store::HashStore::new();
        atomic_write(&path, "file.yaml", "v1", &mut store, false).unwrap();
        let result = atomic_write(&path, "file.yaml", "v2", &mut store, false).unwrap();
        assert!(matches!(result, WriteResult::Written { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "v2");
    }

    #[test]
    fn deleted_file_is_rewritten_despite_matching_hash() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("file.yaml");
        let mut store = hash_store::HashStore::new();
        atomic_write(&path, "file.yaml", "v1", &mut store, false).unwrap();
        fs::remove_file(&path).unwrap();
        let result = atomic_write(&path, "file.yaml", "v1", &mut store, false).unwrap();
        assert!(matches!(result, WriteResult::Written { .. }));
        assert!(path.exists());
    }

    #[test]
    fn dry_run_does_not_write_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nope.yaml");
        let mut store = hash_store::HashStore::new();
        let result = atomic_write(&path, "nope.yaml", "content", &mut store, true).unwrap();
        assert!(matches!(result, WriteResult::WouldWrite { .. }));
        assert!(!path.exists(), "dry-run must not create files");
        assert!(store.is_empty());
    }

    #[test]
    fn tmp_file_removed_after_write() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("clean.yaml");
        write_content(&path, "data");
        let tmp_path = PathBuf::from(format!("{}.blueprint.tmp", path.display()));
        assert!(!tmp_path.exists(), ".blueprint.tmp must be cleaned up");
    }

    #[test]
    fn creates_parent_directories() {
        let tmp = TempDir::new().unwrap();
        let path = tmp
            .path()
            .join("stages")
            .join("dev")
            .join("argocd")
            .join("bootstrap.yaml");
        write_content(&path, "content");
        assert!(path.exists());
    }

    #[test]
    fn crlf_and_lf_content_share_the_same_hash() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("normalize.yaml");
        let mut store = hash_store::HashStore::new();

        let first = atomic_write(&path, "n", "a: 1\r\nb: 2\r\n", &mut store, false).unwrap();
        assert!(matches!(first, WriteResult::Written { .. }));

        let second = atomic_write(&path, "n", "a: 1\nb: 2\n", &mut store, false).unwrap();
        assert!(matches!(second, WriteResult::Unchanged { .. }));

        assert_eq!(fs::read_to_string(&path).unwrap(), "a: 1\nb: 2\n");
    }

    #[test]
    fn store_keys_use_forward_slashes() {
        let relative = Path::new("stages").join("dev").join("blueprint.yaml");
        assert_eq!(store_key(&relative), "stages/dev/blueprint.yaml");
    }

    #[test]
    fn synth_records_pipeline_and_relative_keys() {
        let out = TempDir::new().unwrap();
        let result = synth(&reference_spec(), out.path(), &SynthOptions::default()).unwrap();
        assert_eq!(result.pipeline_name, "aws-bb-containers-capstone-pipeline");
        assert_eq!(result.written(), result.writes.len());

        let store = hash_store::load_at(out.path()).unwrap();
        assert_eq!(
            store.pipeline.as_deref(),
            Some("aws-bb-containers-capstone-pipeline")
        );
        assert!(store.files.contains_key("pipeline.yaml"));
        assert!(store.files.contains_key("stages/prod/argocd/bootstrap.yaml"));
        assert_eq!(store.files.len(), result.writes.len());
    }

    #[test]
    fn synced_at_advances_only_on_real_synth() {
        let out = TempDir::new().unwrap();
        let spec = reference_spec();
        synth(&spec, out.path(), &SynthOptions::default()).unwrap();
        let first = hash_store::load_at(out.path()).unwrap().synced_at;

        let dry = SynthOptions {
            dry_run: true,
            ..SynthOptions::default()
        };
        synth(&spec, out.path(), &dry).unwrap();
        let after_dry_run = hash_store::load_at(out.path()).unwrap().synced_at;
        assert_eq!(after_dry_run, first, "dry-run must not advance synced_at");

        synth(&spec, out.path(), &SynthOptions::default()).unwrap();
        let second = hash_store::load_at(out.path()).unwrap().synced_at;
        assert!(second >= first);
    }

    #[test]
    #[cfg(unix)]
    fn rename_failure_leaves_original_and_cleans_tmp() {
        use std::os::unix::fs::PermissionsExt;

        let root = TempDir::new().unwrap();
        let readonly_dir = root.path().join("readonly");
        fs::create_dir_all(&readonly_dir).unwrap();

        let path = readonly_dir.join("pipeline.yaml");
        fs::write(&path, "original").unwrap();

        let mut perms = fs::metadata(&readonly_dir).unwrap().permissions();
        perms.set_mode(0o555);
        fs::set_permissions(&readonly_dir, perms).unwrap();

        let tmp_dir = TempDir::new().unwrap();
        let tmp_path = tmp_dir.path().join("pipeline.yaml.blueprint.tmp");

        let mut store = hash_store::HashStore::new();
        let result =
            atomic_write_with_tmp(&path, "pipeline.yaml", "new", &mut store, false, &tmp_path);

        let mut perms = fs::metadata(&readonly_dir).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&readonly_dir, perms).unwrap();

        // Running as root bypasses directory permissions; nothing to assert then.
        if result.is_ok() {
            return;
        }
        assert_eq!(fs::read_to_string(&path).unwrap(), "original");
        assert!(!tmp_path.exists(), ".blueprint.tmp should be cleaned up");
        assert!(store.is_empty());
    }
}
