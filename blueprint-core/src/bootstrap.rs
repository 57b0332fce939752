//! GitOps bootstrap generation.
//!
//! One shared workloads repository serves every environment by directory
//! convention: environment `dev` reads `envs/dev`, `prod` reads `envs/prod`.
//! The generator never checks that the directory exists.

use std::collections::HashSet;

use crate::error::ConfigurationError;
use crate::types::{
    namespace_for, AddOnSpec, BootstrapDescriptor, ProjectRoute, Team, TeamProjectBinding,
    IN_CLUSTER_SERVER,
};

/// Add-on name the bootstrap is installed under.
pub const BOOTSTRAP_ADD_ON: &str = "argocd";

/// Key of the descriptor inside the bootstrap add-on's params.
const BOOTSTRAP_PARAM: &str = "bootstrap";

pub const DEFAULT_REPO_URL: &str = "https://github.com/aws-samples/eks-blueprints-workloads.git";
pub const DEFAULT_REVISION: &str = "workshop";
pub const DEFAULT_CREDENTIALS_REF: &str = "github-ssh-key";

/// Produces per-environment [`BootstrapDescriptor`]s for one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapGenerator {
    pub repo_url: String,
    pub revision: String,
    pub credentials_ref: String,
}

impl Default for BootstrapGenerator {
    fn default() -> Self {
        BootstrapGenerator {
            repo_url: DEFAULT_REPO_URL.to_string(),
            revision: DEFAULT_REVISION.to_string(),
            credentials_ref: DEFAULT_CREDENTIALS_REF.to_string(),
        }
    }
}

impl BootstrapGenerator {
    pub fn new(
        repo_url: impl Into<String>,
        revision: impl Into<String>,
        credentials_ref: impl Into<String>,
    ) -> Self {
        BootstrapGenerator {
            repo_url: repo_url.into(),
            revision: revision.into(),
            credentials_ref: credentials_ref.into(),
        }
    }

    /// Descriptor for `environment`, with one route per binding in input order.
    ///
    /// Bindings are passed through as given: repeated repo names are kept.
    pub fn generate(
        &self,
        environment: &str,
        bindings: &[TeamProjectBinding],
    ) -> BootstrapDescriptor {
        BootstrapDescriptor {
            repo_url: self.repo_url.clone(),
            path: environment_path(environment),
            revision: self.revision.clone(),
            credentials_ref: self.credentials_ref.clone(),
            projects: bindings.iter().map(route_for).collect(),
        }
    }
}

/// `envs/<environment>`
pub fn environment_path(environment: &str) -> String {
    format!("envs/{environment}")
}

fn route_for(binding: &TeamProjectBinding) -> ProjectRoute {
    ProjectRoute {
        repo_name: binding.repo.clone(),
        source_repo: format!("https://github.com/{}/{}.git", binding.org, binding.repo),
        namespace: namespace_for(&binding.team),
        destination_server: IN_CLUSTER_SERVER.to_string(),
    }
}

impl BootstrapDescriptor {
    /// Package the descriptor as the `argocd` add-on.
    pub fn into_add_on(self) -> AddOnSpec {
        // A struct of strings always serializes.
        let value = serde_json::to_value(&self).unwrap_or_default();
        AddOnSpec::named(BOOTSTRAP_ADD_ON).with_param(BOOTSTRAP_PARAM, value)
    }

    /// Recover a descriptor from an add-on built by [`into_add_on`](Self::into_add_on).
    ///
    /// Returns `None` for any add-on that does not carry one.
    pub fn from_add_on(
        add_on: &AddOnSpec,
    ) -> Option<Result<BootstrapDescriptor, serde_json::Error>> {
        if add_on.name != BOOTSTRAP_ADD_ON {
            return None;
        }
        let value = add_on.params.get(BOOTSTRAP_PARAM)?;
        Some(serde_json::from_value(value.clone()))
    }

    /// Every route must land in a namespace owned by one of `teams`.
    pub fn check_namespaces(&self, stage: &str, teams: &[Team]) -> Result<(), ConfigurationError> {
        let known: HashSet<String> = teams.iter().map(Team::namespace).collect();
        match self.projects.iter().find(|p| !known.contains(&p.namespace)) {
            Some(route) => Err(ConfigurationError::UnknownNamespace {
                stage: stage.to_string(),
                namespace: route.namespace.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Repo names that occur more than once, in first-seen order.
    pub fn duplicate_repo_names(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut dupes: Vec<&str> = Vec::new();
        for route in &self.projects {
            let name = route.repo_name.as_str();
            if !seen.insert(name) && !dupes.contains(&name) {
                dupes.push(name);
            }
        }
        dupes
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TeamKind;

    fn frontend() -> TeamProjectBinding {
        TeamProjectBinding::new("micmarc", "ecsdemo-frontend", "slytherin")
    }

    #[test]
    fn dev_descriptor_for_single_binding() {
        let d = BootstrapGenerator::default().generate("dev", &[frontend()]);
        assert_eq!(d.path, "envs/dev");
        assert_eq!(d.projects.len(), 1);
        let route = &d.projects[0];
        assert_eq!(route.namespace, "team-slytherin");
        assert_eq!(route.source_repo, "https://github.com/micmarc/ecsdemo-frontend.git");
        assert_eq!(route.repo_name, "ecsdemo-frontend");
        assert_eq!(route.destination_server, "https://kubernetes.default.svc");
    }

    #[test]
    fn empty_bindings_yield_empty_projects() {
        let d = BootstrapGenerator::default().generate("prod", &[]);
        assert!(d.projects.is_empty());
        assert_eq!(d.path, "envs/prod");
        assert_eq!(d.revision, DEFAULT_REVISION);
    }

    #[test]
    fn order_and_duplicates_pass_through() {
        let bindings = [
            TeamProjectBinding::new("micmarc", "ecsdemo-nodejs", "gryffindor"),
            frontend(),
            TeamProjectBinding::new("other", "ecsdemo-nodejs", "slytherin"),
        ];
        let d = BootstrapGenerator::default().generate("test", &bindings);
        let repos: Vec<_> = d.projects.iter().map(|p| p.repo_name.as_str()).collect();
        assert_eq!(repos, ["ecsdemo-nodejs", "ecsdemo-frontend", "ecsdemo-nodejs"]);
        assert_eq!(d.duplicate_repo_names(), ["ecsdemo-nodejs"]);
    }

    #[test]
    fn add_on_round_trip() {
        let d = BootstrapGenerator::default().generate("dev", &[frontend()]);
        let add_on = d.clone().into_add_on();
        assert_eq!(add_on.name, BOOTSTRAP_ADD_ON);
        let back = BootstrapDescriptor::from_add_on(&add_on)
            .expect("bootstrap add-on")
            .expect("valid descriptor");
        assert_eq!(back, d);
        assert!(BootstrapDescriptor::from_add_on(&AddOnSpec::named("xray")).is_none());
    }

    #[test]
    fn unknown_namespace_is_rejected() {
        let d = BootstrapGenerator::default().generate("dev", &[frontend()]);
        let teams = [Team::new("gryffindor", "arn", TeamKind::Application)];
        let err = d.check_namespaces("dev", &teams).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::UnknownNamespace {
                stage: "dev".into(),
                namespace: "team-slytherin".into()
            }
        );

        let teams = [Team::new("slytherin", "arn", TeamKind::Application)];
        assert!(d.check_namespaces("dev", &teams).is_ok());
    }
}
