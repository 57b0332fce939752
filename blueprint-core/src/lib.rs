//! Blueprint core library: domain types, registries, pipeline assembly.
//!
//! Public API surface:
//! - [`types`]: newtypes and domain structs
//! - [`error`]: [`ConfigurationError`], [`LoadError`]
//! - [`registry`]: team and add-on registries
//! - [`bootstrap`]: per-environment GitOps bootstrap descriptors
//! - [`blueprint`]: the reusable cluster template
//! - [`pipeline`]: promotion pipeline builder
//! - [`config`]: `blueprint.yaml` load / scaffold and composition

pub mod blueprint;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod registry;
pub mod types;

pub use blueprint::{Blueprint, BlueprintConfig};
pub use bootstrap::BootstrapGenerator;
pub use config::{PipelineConfig, Settings};
pub use error::{ConfigurationError, LoadError};
pub use pipeline::PipelineBuilder;
pub use registry::{AddOnRegistry, Catalog, TeamRecord, TeamRegistry};
pub use types::{
    AddOnSpec, BootstrapDescriptor, ClusterProvider, EnvironmentEntry, EnvironmentStage,
    PipelineSpec, ProjectRoute, RepoRef, StageId, Team, TeamKind, TeamName, TeamProjectBinding,
};
