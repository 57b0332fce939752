//! Team and add-on registries.
//!
//! Both registries are append-only lists built once from static tables.
//! Neither de-duplicates: a repeated team name is a namespace collision that
//! [`Blueprint::new`](crate::blueprint::Blueprint::new) reports, and a repeated
//! add-on is installed twice.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::types::{AddOnSpec, Team, TeamKind, TeamName};

// ---------------------------------------------------------------------------
// Teams
// ---------------------------------------------------------------------------

/// One row of the tenant table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRecord {
    pub name: String,
    #[serde(default)]
    pub kind: TeamKind,
    /// IAM user name; defaults to `<kind>-<name>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl TeamRecord {
    pub fn application(name: impl Into<String>) -> Self {
        TeamRecord {
            name: name.into(),
            kind: TeamKind::Application,
            user: None,
        }
    }

    pub fn platform(name: impl Into<String>) -> Self {
        TeamRecord {
            name: name.into(),
            kind: TeamKind::Platform,
            user: None,
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    fn user_name(&self) -> String {
        self.user
            .clone()
            .unwrap_or_else(|| format!("{}-{}", self.kind, self.name))
    }
}

impl Team {
    /// Materialise a tenant record for `account`.
    pub fn for_account(account: &str, record: &TeamRecord) -> Team {
        Team {
            name: TeamName::from(record.name.as_str()),
            principal_ref: format!("arn:aws:iam::{account}:user/{}", record.user_name()),
            kind: record.kind,
        }
    }
}

/// Registered tenants, in registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamRegistry {
    teams: Vec<Team>,
}

impl TeamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a tenant table.
    pub fn from_records(account: &str, records: &[TeamRecord]) -> Self {
        let mut registry = Self::new();
        for record in records {
            registry.register(Team::for_account(account, record));
        }
        registry
    }

    pub fn register(&mut self, team: Team) {
        self.teams.push(team);
    }

    pub fn all(&self) -> &[Team] {
        &self.teams
    }

    pub fn into_teams(self) -> Vec<Team> {
        self.teams
    }
}

// ---------------------------------------------------------------------------
// Add-ons
// ---------------------------------------------------------------------------

/// Installable units, in install order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddOnRegistry {
    add_ons: Vec<AddOnSpec>,
}

impl AddOnRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The catalog every environment installs by default.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(AddOnSpec::named("aws-load-balancer-controller"));
        registry.register(AddOnSpec::named("nginx"));
        registry.register(AddOnSpec::named("app-mesh").with_param("enableTracing", json!(true)));
        // Grants the node role the SSM policy; stack teardown depends on it.
        registry.register(AddOnSpec::named("ssm-agent"));
        registry.register(AddOnSpec::named("calico-operator"));
        registry.register(AddOnSpec::named("metrics-server"));
        registry.register(AddOnSpec::named("cluster-autoscaler"));
        registry.register(AddOnSpec::named("container-insights"));
        registry.register(AddOnSpec::named("xray"));
        registry.register(AddOnSpec::named("secrets-store"));
        registry
    }

    /// Standalone single-cluster catalog: no pipeline, ArgoCD installed
    /// directly next to the EKS networking add-ons.
    pub fn single_cluster() -> Self {
        [
            "argocd",
            "calico-operator",
            "metrics-server",
            "cluster-autoscaler",
            "container-insights",
            "aws-load-balancer-controller",
            "vpc-cni",
            "coredns",
            "kube-proxy",
            "xray",
        ]
        .into_iter()
        .map(AddOnSpec::named)
        .collect()
    }

    pub fn register(&mut self, add_on: AddOnSpec) {
        self.add_ons.push(add_on);
    }

    pub fn all(&self) -> &[AddOnSpec] {
        &self.add_ons
    }

    pub fn into_add_ons(self) -> Vec<AddOnSpec> {
        self.add_ons
    }
}

impl FromIterator<AddOnSpec> for AddOnRegistry {
    fn from_iter<I: IntoIterator<Item = AddOnSpec>>(iter: I) -> Self {
        AddOnRegistry {
            add_ons: iter.into_iter().collect(),
        }
    }
}

/// Built-in catalog a configuration starts from when it lists no add-ons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Catalog {
    #[default]
    Standard,
    SingleCluster,
}

impl Catalog {
    pub fn is_standard(&self) -> bool {
        *self == Catalog::Standard
    }

    pub fn registry(self) -> AddOnRegistry {
        match self {
            Catalog::Standard => AddOnRegistry::standard(),
            Catalog::SingleCluster => AddOnRegistry::single_cluster(),
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn application_principal_is_derived_from_account() {
        let team = Team::for_account("219890958300", &TeamRecord::application("gryffindor"));
        assert_eq!(
            team.principal_ref,
            "arn:aws:iam::219890958300:user/application-gryffindor"
        );
        assert_eq!(team.kind, TeamKind::Application);
    }

    #[test]
    fn explicit_user_overrides_default() {
        let record = TeamRecord::platform("platform").with_user("platform-user");
        let team = Team::for_account("1", &record);
        assert_eq!(team.principal_ref, "arn:aws:iam::1:user/platform-user");
    }

    #[test]
    fn team_registry_keeps_duplicates_in_order() {
        let registry = TeamRegistry::from_records(
            "1",
            &[
                TeamRecord::application("slytherin"),
                TeamRecord::application("hufflepuff"),
                TeamRecord::application("slytherin"),
            ],
        );
        let names: Vec<_> = registry.all().iter().map(|t| t.name.0.as_str()).collect();
        assert_eq!(names, ["slytherin", "hufflepuff", "slytherin"]);
    }

    #[test]
    fn standard_catalog_order() {
        let registry = AddOnRegistry::standard();
        let names: Vec<_> = registry.all().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names.first(), Some(&"aws-load-balancer-controller"));
        assert_eq!(names.last(), Some(&"secrets-store"));
        assert_eq!(names.len(), 10);
        let mesh = &registry.all()[2];
        assert_eq!(mesh.params.get("enableTracing"), Some(&json!(true)));
    }

    #[test]
    fn single_cluster_catalog_carries_networking_add_ons() {
        let registry = Catalog::SingleCluster.registry();
        let names: Vec<_> = registry.all().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names.first(), Some(&"argocd"));
        for core in ["vpc-cni", "coredns", "kube-proxy"] {
            assert!(names.contains(&core), "missing {core}");
        }
        assert!(!names.contains(&"app-mesh"));
        assert!(registry.all().iter().all(|a| a.params.is_empty()));
    }

    #[test]
    fn catalog_names_are_kebab_case() {
        let parsed: Catalog = serde_yaml::from_str("single-cluster").unwrap();
        assert_eq!(parsed, Catalog::SingleCluster);
        assert!(Catalog::default().is_standard());
    }
}
