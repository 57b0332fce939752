//! Domain types for blueprint pipelines.
//!
//! Every value here is plain data: built once while the configuration is
//! assembled, never mutated afterwards. Serialized field names follow the
//! camelCase wire format the CD engine consumes.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::blueprint::Blueprint;

/// Prefix applied to a team name to form its Kubernetes namespace.
pub const TEAM_NAMESPACE_PREFIX: &str = "team-";

/// API endpoint of the cluster an Argo CD instance runs in.
pub const IN_CLUSTER_SERVER: &str = "https://kubernetes.default.svc";

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed tenant name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TeamName(pub String);

impl fmt::Display for TeamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for TeamName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TeamName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A strongly-typed pipeline stage identifier (`dev`, `test`, `prod`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StageId(pub String);

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for StageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for StageId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Teams
// ---------------------------------------------------------------------------

/// Whether a team administers the cluster or only deploys workloads into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TeamKind {
    Platform,
    #[default]
    Application,
}

impl fmt::Display for TeamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TeamKind::Platform => write!(f, "platform"),
            TeamKind::Application => write!(f, "application"),
        }
    }
}

/// A tenant identity, used as the namespace-scoping key of a cluster.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub name: TeamName,
    /// IAM principal granted access to the team's namespace.
    pub principal_ref: String,
    #[serde(default)]
    pub kind: TeamKind,
}

impl Team {
    pub fn new(
        name: impl Into<TeamName>,
        principal_ref: impl Into<String>,
        kind: TeamKind,
    ) -> Self {
        Team {
            name: name.into(),
            principal_ref: principal_ref.into(),
            kind,
        }
    }

    /// `team-<name>`
    pub fn namespace(&self) -> String {
        namespace_for(&self.name.0)
    }
}

/// Namespace a team named `team` is routed to.
pub fn namespace_for(team: &str) -> String {
    format!("{TEAM_NAMESPACE_PREFIX}{team}")
}

// ---------------------------------------------------------------------------
// Add-ons
// ---------------------------------------------------------------------------

/// One installable cluster capability and its configuration.
///
/// The core never looks inside `params`; the add-on installer does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddOnSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, serde_json::Value>,
}

impl AddOnSpec {
    /// An add-on with no configuration.
    pub fn named(name: impl Into<String>) -> Self {
        AddOnSpec {
            name: name.into(),
            params: BTreeMap::new(),
        }
    }

    /// Builder-style parameter insertion.
    pub fn with_param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }
}

// ---------------------------------------------------------------------------
// GitOps bootstrap
// ---------------------------------------------------------------------------

/// Input to the bootstrap generator: a workload repository owned by a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamProjectBinding {
    pub org: String,
    pub repo: String,
    pub team: String,
}

impl TeamProjectBinding {
    pub fn new(org: impl Into<String>, repo: impl Into<String>, team: impl Into<String>) -> Self {
        TeamProjectBinding {
            org: org.into(),
            repo: repo.into(),
            team: team.into(),
        }
    }
}

/// A downstream application auto-registered by the bootstrap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRoute {
    pub repo_name: String,
    pub source_repo: String,
    pub namespace: String,
    pub destination_server: String,
}

/// Where an environment's desired state lives and which projects it registers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapDescriptor {
    pub repo_url: String,
    pub path: String,
    pub revision: String,
    pub credentials_ref: String,
    #[serde(default)]
    pub projects: Vec<ProjectRoute>,
}

// ---------------------------------------------------------------------------
// Cluster provider
// ---------------------------------------------------------------------------

/// A Fargate profile: pods in any of `selectors` namespaces run on Fargate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FargateProfile {
    pub selectors: Vec<String>,
}

/// How the cluster's compute is provisioned. Opaque to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClusterProvider {
    /// Serverless compute; one profile per team, keyed by team name.
    #[serde(rename_all = "camelCase")]
    Fargate {
        version: String,
        profiles: BTreeMap<String, FargateProfile>,
    },
    /// EC2 managed node group.
    #[serde(rename_all = "camelCase")]
    ManagedNodeGroup {
        version: String,
        instance_type: String,
        min_size: u32,
        max_size: u32,
    },
}

impl ClusterProvider {
    pub fn version(&self) -> &str {
        match self {
            ClusterProvider::Fargate { version, .. } => version,
            ClusterProvider::ManagedNodeGroup { version, .. } => version,
        }
    }

    /// Short human-readable label.
    pub fn kind(&self) -> &'static str {
        match self {
            ClusterProvider::Fargate { .. } => "fargate",
            ClusterProvider::ManagedNodeGroup { .. } => "managed-node-group",
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Source repository the CD engine watches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoRef {
    pub repo_url: String,
    pub credentials_secret_name: String,
    pub target_revision: String,
}

/// One requested environment, before it becomes a stage.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentEntry {
    pub id: StageId,
    pub region: String,
    pub bootstrap: Option<AddOnSpec>,
}

impl EnvironmentEntry {
    pub fn new(id: impl Into<StageId>, region: impl Into<String>) -> Self {
        EnvironmentEntry {
            id: id.into(),
            region: region.into(),
            bootstrap: None,
        }
    }

    pub fn with_bootstrap(mut self, add_on: AddOnSpec) -> Self {
        self.bootstrap = Some(add_on);
        self
    }
}

/// One environment's position in the promotion pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentStage {
    pub id: StageId,
    pub region: String,
    /// Region-cloned blueprint; its add-ons already include `extra_add_ons`.
    pub blueprint: Blueprint,
    #[serde(default)]
    pub extra_add_ons: Vec<AddOnSpec>,
}

/// The terminal artifact handed to the CD engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSpec {
    pub name: String,
    pub owner: String,
    pub repository: RepoRef,
    pub wave: String,
    pub stages: Vec<EnvironmentStage>,
}

impl PipelineSpec {
    pub fn stage(&self, id: &str) -> Option<&EnvironmentStage> {
        self.stages.iter().find(|s| s.id.0 == id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
