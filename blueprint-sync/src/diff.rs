//! Unified diff between synthesized manifests on disk and a fresh render.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use similar::TextDiff;

use blueprint_core::PipelineSpec;

use crate::{error::io_err, writer::renderer_for, SyncError};

/// A single rendered file diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    /// Output-relative path.
    pub path: PathBuf,
    pub unified_diff: String,
}

/// Diff result for a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffResult {
    pub pipeline_name: String,
    pub diffs: Vec<FileDiff>,
}

impl DiffResult {
    pub fn is_clean(&self) -> bool {
        self.diffs.is_empty()
    }
}

/// Render what `synth` would generate and compare it to current on-disk content.
///
/// No files are written. Missing files diff against empty content.
pub fn diff_pipeline(
    spec: &PipelineSpec,
    out_dir: &Path,
    templates: Option<&Path>,
) -> Result<DiffResult, SyncError> {
    let renderer = renderer_for(templates)?;

    let mut diffs = Vec::new();
    for (relative, rendered) in renderer.render(spec)? {
        let rendered = normalize_line_endings(&rendered);
        let existing = read_existing_or_empty(&out_dir.join(&relative))?;
        if existing == rendered {
            continue;
        }

        let old_header = format!("a/{}", relative.display());
        let new_header = format!("b/{}", relative.display());
        let unified = TextDiff::from_lines(&existing, &rendered)
            .unified_diff()
            .header(&old_header, &new_header)
            .context_radius(3)
            .to_string();

        diffs.push(FileDiff {
            path: relative,
            unified_diff: unified,
        });
    }

    Ok(DiffResult {
        pipeline_name: spec.name.clone(),
        diffs,
    })
}

fn read_existing_or_empty(path: &Path) -> Result<String, SyncError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(normalize_line_endings(&content)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(String::new()),
        Err(err) => Err(io_err(path, err)),
    }
}

fn normalize_line_endings(content: &str) -> String {
    content.replace("\r\n", "\n")
}
