//! Error types for blueprint-renderer.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from template rendering operations.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Tera template engine error.
    #[error("template engine error: {0}")]
    Tera(#[from] tera::Error),

    /// JSON serialization error (building tera context).
    #[error("context serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error while loading user templates.
    #[error("template io error at {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    /// A bootstrap add-on whose params are not a bootstrap descriptor.
    #[error("stage '{stage}': bootstrap add-on is malformed: {source}")]
    Bootstrap {
        stage: String,
        #[source]
        source: serde_json::Error,
    },
}
