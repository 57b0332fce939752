//! # blueprint-sync
//!
//! Hash-gated atomic writer for rendered pipeline manifests.
//!
//! Call [`synth`] to render and write every manifest of a pipeline into an
//! output directory, or [`diff_pipeline`] to see what `synth` would change.

pub mod diff;
pub mod error;
pub mod hash_store;
pub mod writer;

pub use diff::{diff_pipeline, DiffResult, FileDiff};
pub use error::SyncError;
pub use writer::{synth, SynthOptions, SynthResult, WriteResult};
