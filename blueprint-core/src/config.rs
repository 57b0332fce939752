//! Pipeline configuration file.
//!
//! # File layout
//!
//! ```yaml
//! region: us-east-1            # optional; CDK_DEFAULT_REGION wins
//! pipeline:
//!   name: aws-bb-containers-capstone-pipeline
//!   owner: micmarc
//!   repository:
//!     repo_url: aws-bb-containers-capstone
//!     credentials_secret_name: github-token
//!     target_revision: main
//! cluster:
//!   provider: fargate
//!   version: "1.20"
//! teams:
//!   - { name: gryffindor }
//! bootstrap:
//!   bindings:
//!     - { org: micmarc, repo: ecsdemo-frontend, team: gryffindor }
//! environments:
//!   - { id: dev, region: us-west-2 }
//! ```
//!
//! # API pattern
//!
//! Filesystem functions come in two forms, as elsewhere in this crate:
//! - `fn_at(path: &Path, …)`: explicit path; used in tests with `TempDir`
//! - `fn(…)`: uses [`DEFAULT_CONFIG_FILE`] in the working directory

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::blueprint::{fargate_for_teams, Blueprint, BlueprintConfig};
use crate::bootstrap::{self, BootstrapGenerator};
use crate::error::{io_err, LoadError};
use crate::pipeline::{PipelineBuilder, DEFAULT_WAVE};
use crate::registry::{AddOnRegistry, Catalog, TeamRecord, TeamRegistry};
use crate::types::{
    AddOnSpec, BootstrapDescriptor, ClusterProvider, EnvironmentEntry, PipelineSpec, RepoRef,
    TeamProjectBinding,
};

pub const DEFAULT_CONFIG_FILE: &str = "blueprint.yaml";
pub const ACCOUNT_VAR: &str = "CDK_DEFAULT_ACCOUNT";
pub const REGION_VAR: &str = "CDK_DEFAULT_REGION";

// ---------------------------------------------------------------------------
// 1. Settings from the environment
// ---------------------------------------------------------------------------

/// Account and default region, supplied at the loading boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub account: Option<String>,
    pub region: Option<String>,
}

impl Settings {
    /// Read [`ACCOUNT_VAR`] and [`REGION_VAR`] from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Settings {
            account: get(ACCOUNT_VAR),
            region: get(REGION_VAR),
        }
    }

    /// Values set in `other` win.
    pub fn overridden_by(self, other: Settings) -> Settings {
        Settings {
            account: other.account.or(self.account),
            region: other.region.or(self.region),
        }
    }
}

// ---------------------------------------------------------------------------
// 2. File schema
// ---------------------------------------------------------------------------

/// Root of `blueprint.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    pub pipeline: PipelineSection,
    #[serde(default)]
    pub cluster: ClusterSection,
    #[serde(default)]
    pub teams: Vec<TeamRecord>,
    /// Built-in catalog used when `add_ons` is absent.
    #[serde(default, skip_serializing_if = "Catalog::is_standard")]
    pub catalog: Catalog,
    /// Replaces the catalog when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add_ons: Option<Vec<AddOnSpec>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bootstrap: Option<BootstrapSection>,
    pub environments: Vec<EnvironmentSection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineSection {
    pub name: String,
    pub owner: String,
    pub repository: RepositorySection,
    #[serde(default = "default_wave")]
    pub wave: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepositorySection {
    pub repo_url: String,
    pub credentials_secret_name: String,
    pub target_revision: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    #[default]
    Fargate,
    ManagedNodeGroup,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClusterSection {
    #[serde(default)]
    pub provider: ProviderKind,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_instance_type")]
    pub instance_type: String,
    #[serde(default = "default_min_size")]
    pub min_size: u32,
    #[serde(default = "default_max_size")]
    pub max_size: u32,
}

impl Default for ClusterSection {
    fn default() -> Self {
        ClusterSection {
            provider: ProviderKind::default(),
            version: default_version(),
            instance_type: default_instance_type(),
            min_size: default_min_size(),
            max_size: default_max_size(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BootstrapSection {
    #[serde(default = "default_bootstrap_repo")]
    pub repo_url: String,
    #[serde(default = "default_bootstrap_revision")]
    pub revision: String,
    #[serde(default = "default_credentials_ref")]
    pub credentials_ref: String,
    #[serde(default)]
    pub bindings: Vec<TeamProjectBinding>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentSection {
    pub id: String,
    pub region: String,
    /// Install the GitOps bootstrap in this stage (needs a `bootstrap` section).
    #[serde(default = "default_true")]
    pub bootstrap: bool,
}

fn default_wave() -> String {
    DEFAULT_WAVE.to_string()
}
fn default_version() -> String {
    "1.20".to_string()
}
fn default_instance_type() -> String {
    "m5.large".to_string()
}
fn default_min_size() -> u32 {
    1
}
fn default_max_size() -> u32 {
    3
}
fn default_bootstrap_repo() -> String {
    bootstrap::DEFAULT_REPO_URL.to_string()
}
fn default_bootstrap_revision() -> String {
    bootstrap::DEFAULT_REVISION.to_string()
}
fn default_credentials_ref() -> String {
    bootstrap::DEFAULT_CREDENTIALS_REF.to_string()
}
fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// 3. Composition
// ---------------------------------------------------------------------------

impl PipelineConfig {
    /// The capstone reference pipeline: three environments in three regions.
    pub fn reference() -> Self {
        PipelineConfig {
            account: None,
            region: Some("us-east-1".to_string()),
            pipeline: PipelineSection {
                name: "aws-bb-containers-capstone-pipeline".to_string(),
                owner: "micmarc".to_string(),
                repository: RepositorySection {
                    repo_url: "aws-bb-containers-capstone".to_string(),
                    credentials_secret_name: "github-token".to_string(),
                    target_revision: "main".to_string(),
                },
                wave: default_wave(),
            },
            cluster: ClusterSection::default(),
            teams: vec![
                TeamRecord::platform("platform").with_user("platform-user"),
                TeamRecord::application("gryffindor"),
                TeamRecord::application("slytherin"),
            ],
            catalog: Catalog::Standard,
            add_ons: None,
            bootstrap: Some(BootstrapSection {
                repo_url: default_bootstrap_repo(),
                revision: default_bootstrap_revision(),
                credentials_ref: default_credentials_ref(),
                bindings: vec![TeamProjectBinding::new(
                    "micmarc",
                    "ecsdemo-frontend",
                    "slytherin",
                )],
            }),
            environments: [("dev", "us-west-2"), ("test", "us-east-2"), ("prod", "us-east-1")]
                .into_iter()
                .map(|(id, region)| EnvironmentSection {
                    id: id.to_string(),
                    region: region.to_string(),
                    bootstrap: true,
                })
                .collect(),
        }
    }

    /// Resolve account and region: `settings` first, then the file.
    pub fn resolve(&self, settings: &Settings) -> Result<(String, String), LoadError> {
        let account = settings
            .account
            .clone()
            .or_else(|| self.account.clone())
            .ok_or(LoadError::MissingSetting {
                setting: "account",
                var: ACCOUNT_VAR,
            })?;
        let region = settings
            .region
            .clone()
            .or_else(|| self.region.clone())
            .ok_or(LoadError::MissingSetting {
                setting: "region",
                var: REGION_VAR,
            })?;
        Ok((account, region))
    }

    /// The base blueprint every stage is cloned from.
    pub fn blueprint(&self, settings: &Settings) -> Result<Blueprint, LoadError> {
        let (account, region) = self.resolve(settings)?;
        let teams = TeamRegistry::from_records(&account, &self.teams).into_teams();
        let add_ons = match &self.add_ons {
            Some(list) => list.iter().cloned().collect::<AddOnRegistry>(),
            None => self.catalog.registry(),
        };
        let cluster_provider = match self.cluster.provider {
            ProviderKind::Fargate => fargate_for_teams(self.cluster.version.clone(), &teams),
            ProviderKind::ManagedNodeGroup => ClusterProvider::ManagedNodeGroup {
                version: self.cluster.version.clone(),
                instance_type: self.cluster.instance_type.clone(),
                min_size: self.cluster.min_size,
                max_size: self.cluster.max_size,
            },
        };
        Ok(Blueprint::new(BlueprintConfig {
            account,
            region,
            teams,
            add_ons: add_ons.into_add_ons(),
            cluster_provider,
        })?)
    }

    /// Bootstrap descriptor for `environment`, if bootstrapping is configured.
    pub fn bootstrap_for(&self, environment: &str) -> Option<BootstrapDescriptor> {
        let section = self.bootstrap.as_ref()?;
        let generator = BootstrapGenerator::new(
            section.repo_url.clone(),
            section.revision.clone(),
            section.credentials_ref.clone(),
        );
        Some(generator.generate(environment, &section.bindings))
    }

    /// Requested environments in promotion order.
    pub fn environment_entries(&self) -> Vec<EnvironmentEntry> {
        self.environments
            .iter()
            .map(|env| {
                let entry = EnvironmentEntry::new(env.id.as_str(), env.region.as_str());
                match (env.bootstrap, self.bootstrap_for(&env.id)) {
                    (true, Some(descriptor)) => entry.with_bootstrap(descriptor.into_add_on()),
                    _ => entry,
                }
            })
            .collect()
    }

    /// Assemble the full pipeline.
    pub fn build(&self, settings: &Settings) -> Result<PipelineSpec, LoadError> {
        let section = &self.pipeline;
        let builder = PipelineBuilder::new(section.name.clone())?
            .owner(section.owner.clone())?
            .repository(RepoRef {
                repo_url: section.repository.repo_url.clone(),
                credentials_secret_name: section.repository.credentials_secret_name.clone(),
                target_revision: section.repository.target_revision.clone(),
            })?
            .wave(section.wave.clone())?;

        let first_env = self.environments.first();
        if let Some(descriptor) = first_env.and_then(|env| self.bootstrap_for(&env.id)) {
            for name in descriptor.duplicate_repo_names() {
                tracing::warn!("bootstrap repo '{name}' is bound more than once");
            }
        }

        let base = self.blueprint(settings)?;
        Ok(builder.build(&base, &self.environment_entries())?)
    }
}

// ---------------------------------------------------------------------------
// 4. Load / scaffold
// ---------------------------------------------------------------------------

/// Load a configuration file.
///
/// Returns `LoadError::NotFound` if absent,
/// `LoadError::Parse` (with path + line context) if malformed YAML.
pub fn load_at(path: &Path) -> Result<PipelineConfig, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    serde_yaml::from_str(&contents).map_err(|e| LoadError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<PipelineConfig, LoadError> {
    load_at(Path::new(DEFAULT_CONFIG_FILE))
}

/// Write the reference configuration to `path`.
///
/// Write flow: serialize → `.tmp` sibling → `rename`. Refuses to replace an
/// existing file unless `force` is set.
pub fn scaffold_at(path: &Path, force: bool) -> Result<PipelineConfig, LoadError> {
    if path.exists() && !force {
        return Err(LoadError::AlreadyExists {
            path: path.to_path_buf(),
        });
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }

    let config = PipelineConfig::reference();
    let yaml = serde_yaml::to_string(&config)?;
    let tmp: PathBuf = PathBuf::from(format!("{}.tmp", path.display()));
    std::fs::write(&tmp, yaml).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| io_err(path, e))?;
    Ok(config)
}

/// `scaffold_at` convenience wrapper.
pub fn scaffold(force: bool) -> Result<PipelineConfig, LoadError> {
    scaffold_at(Path::new(DEFAULT_CONFIG_FILE), force)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
