//! Promotion pipeline assembly.
//!
//! Stage order is promotion order: the stages of a [`PipelineSpec`] appear
//! exactly in the order the environments were given. Everything that could
//! make the pipeline ambiguous is rejected here, at build time.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use crate::blueprint::Blueprint;
use crate::error::{require, ConfigurationError};
use crate::types::{
    BootstrapDescriptor, EnvironmentEntry, EnvironmentStage, PipelineSpec, RepoRef,
};

/// Wave the stages are grouped under unless told otherwise.
pub const DEFAULT_WAVE: &str = "envs";

/// Step-wise pipeline construction. Each step validates its own input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineBuilder {
    name: String,
    owner: Option<String>,
    repository: Option<RepoRef>,
    wave: String,
}

impl PipelineBuilder {
    pub fn new(name: impl Into<String>) -> Result<Self, ConfigurationError> {
        let name = name.into();
        require("name", &name)?;
        Ok(PipelineBuilder {
            name,
            owner: None,
            repository: None,
            wave: DEFAULT_WAVE.to_string(),
        })
    }

    pub fn owner(mut self, owner: impl Into<String>) -> Result<Self, ConfigurationError> {
        let owner = owner.into();
        require("owner", &owner)?;
        self.owner = Some(owner);
        Ok(self)
    }

    pub fn repository(mut self, repository: RepoRef) -> Result<Self, ConfigurationError> {
        require("repository.repo_url", &repository.repo_url)?;
        require(
            "repository.credentials_secret_name",
            &repository.credentials_secret_name,
        )?;
        require("repository.target_revision", &repository.target_revision)?;
        self.repository = Some(repository);
        Ok(self)
    }

    pub fn wave(mut self, wave: impl Into<String>) -> Result<Self, ConfigurationError> {
        let wave = wave.into();
        require("wave", &wave)?;
        self.wave = wave;
        Ok(self)
    }

    /// Clone `base` once per environment and assemble the stages.
    pub fn build(
        self,
        base: &Blueprint,
        environments: &[EnvironmentEntry],
    ) -> Result<PipelineSpec, ConfigurationError> {
        let owner = self.owner.ok_or_else(|| ConfigurationError::missing("owner"))?;
        let repository = self
            .repository
            .ok_or_else(|| ConfigurationError::missing("repository.repo_url"))?;
        if environments.is_empty() {
            return Err(ConfigurationError::NoStages {
                pipeline: self.name,
            });
        }

        let stages = build_stages(base, environments)?;
        Ok(PipelineSpec {
            name: self.name,
            owner,
            repository,
            wave: self.wave,
            stages,
        })
    }
}

/// One-shot form of [`PipelineBuilder`].
pub fn build(
    base: &Blueprint,
    repository: RepoRef,
    name: &str,
    owner: &str,
    environments: &[EnvironmentEntry],
) -> Result<PipelineSpec, ConfigurationError> {
    PipelineBuilder::new(name)?
        .owner(owner)?
        .repository(repository)?
        .build(base, environments)
}

/// Stage ids become output directory names: `[a-z0-9][a-z0-9-]*`.
fn is_valid_stage_id(id: &str) -> bool {
    let mut chars = id.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    let allowed = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit();
    allowed(first) && chars.all(|c| allowed(c) || c == '-')
}

fn build_stages(
    base: &Blueprint,
    environments: &[EnvironmentEntry],
) -> Result<Vec<EnvironmentStage>, ConfigurationError> {
    let mut ids = HashSet::new();
    let mut targets: HashMap<(&str, &str), &str> = HashMap::new();
    let mut stages = Vec::with_capacity(environments.len());

    for entry in environments {
        let id = entry.id.0.as_str();
        require("stage.id", id)?;
        if !is_valid_stage_id(id) {
            return Err(ConfigurationError::InvalidStageId {
                stage: id.to_string(),
            });
        }
        require(&format!("stages.{id}.region"), &entry.region)?;

        if !ids.insert(id) {
            return Err(ConfigurationError::DuplicateStageId {
                stage: id.to_string(),
            });
        }
        match targets.entry((base.account(), entry.region.as_str())) {
            Entry::Occupied(first) => {
                return Err(ConfigurationError::DuplicateStageTarget {
                    stage: id.to_string(),
                    first: first.get().to_string(),
                    account: base.account().to_string(),
                    region: entry.region.clone(),
                });
            }
            Entry::Vacant(slot) => {
                slot.insert(id);
            }
        }

        let mut blueprint = base.clone_for_region(entry.region.as_str());
        let mut extra_add_ons = Vec::new();
        if let Some(add_on) = &entry.bootstrap {
            if let Some(descriptor) = BootstrapDescriptor::from_add_on(add_on) {
                let descriptor =
                    descriptor.map_err(|e| ConfigurationError::MalformedBootstrap {
                        stage: id.to_string(),
                        message: e.to_string(),
                    })?;
                descriptor.check_namespaces(id, base.teams())?;
            }
            blueprint = blueprint.with_add_on(add_on.clone());
            extra_add_ons.push(add_on.clone());
        }

        tracing::debug!(
            "stage {id}: account={} region={} add_ons={}",
            blueprint.account(),
            blueprint.region(),
            blueprint.add_ons().len()
        );
        stages.push(EnvironmentStage {
            id: entry.id.clone(),
            region: entry.region.clone(),
            blueprint,
            extra_add_ons,
        });
    }

    Ok(stages)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
