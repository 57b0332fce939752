//! Reusable cluster template.
//!
//! A [`Blueprint`] is built once, in one validated step, and then cloned per
//! region. Clones are independent values: nothing done to a clone is visible
//! through its source.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{require, ConfigurationError};
use crate::types::{AddOnSpec, ClusterProvider, FargateProfile, Team, TeamKind};

/// Everything needed to build a [`Blueprint`].
#[derive(Debug, Clone, PartialEq)]
pub struct BlueprintConfig {
    pub account: String,
    pub region: String,
    pub teams: Vec<Team>,
    pub add_ons: Vec<AddOnSpec>,
    pub cluster_provider: ClusterProvider,
}

/// Teams + add-ons + provider, bound to one account and region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blueprint {
    account: String,
    region: String,
    teams: Vec<Team>,
    add_ons: Vec<AddOnSpec>,
    cluster_provider: ClusterProvider,
}

impl Blueprint {
    /// Validate `config` and freeze it.
    ///
    /// Fails on a blank account or region, and on two teams with the same name
    /// (they would share a namespace).
    pub fn new(config: BlueprintConfig) -> Result<Blueprint, ConfigurationError> {
        require("account", &config.account)?;
        require("region", &config.region)?;

        let mut seen = HashSet::new();
        for team in &config.teams {
            require("team.name", &team.name.0)?;
            if !seen.insert(team.name.0.as_str()) {
                return Err(ConfigurationError::NamespaceCollision {
                    team: team.name.0.clone(),
                });
            }
        }
        for add_on in &config.add_ons {
            require("add_on.name", &add_on.name)?;
        }

        Ok(Blueprint {
            account: config.account,
            region: config.region,
            teams: config.teams,
            add_ons: config.add_ons,
            cluster_provider: config.cluster_provider,
        })
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    /// Add-ons in install order.
    pub fn add_ons(&self) -> &[AddOnSpec] {
        &self.add_ons
    }

    pub fn cluster_provider(&self) -> &ClusterProvider {
        &self.cluster_provider
    }

    /// A copy of this blueprint targeting `region`.
    pub fn clone_for_region(&self, region: impl Into<String>) -> Blueprint {
        Blueprint {
            region: region.into(),
            ..self.clone()
        }
    }

    /// Append `add_on` after every add-on already present.
    pub fn with_add_on(mut self, add_on: AddOnSpec) -> Blueprint {
        self.add_ons.push(add_on);
        self
    }
}

/// A Fargate provider with one profile per application team.
///
/// Profiles are keyed by team name and select the team's namespace.
pub fn fargate_for_teams(version: impl Into<String>, teams: &[Team]) -> ClusterProvider {
    let profiles: BTreeMap<String, FargateProfile> = teams
        .iter()
        .filter(|t| t.kind == TeamKind::Application)
        .map(|t| {
            (
                t.name.0.clone(),
                FargateProfile {
                    selectors: vec![t.namespace()],
                },
            )
        })
        .collect();
    ClusterProvider::Fargate {
        version: version.into(),
        profiles,
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{AddOnRegistry, TeamRecord, TeamRegistry};

    fn config() -> BlueprintConfig {
        let teams = TeamRegistry::from_records(
            "219890958300",
            &[
                TeamRecord::platform("platform").with_user("platform-user"),
                TeamRecord::application("gryffindor"),
                TeamRecord::application("slytherin"),
            ],
        )
        .into_teams();
        BlueprintConfig {
            account: "219890958300".into(),
            region: "us-east-1".into(),
            cluster_provider: fargate_for_teams("1.20", &teams),
            teams,
            add_ons: AddOnRegistry::standard().into_add_ons(),
        }
    }

    #[test]
    fn builds_from_valid_config() {
        let bp = Blueprint::new(config()).expect("blueprint");
        assert_eq!(bp.account(), "219890958300");
        assert_eq!(bp.region(), "us-east-1");
        assert_eq!(bp.teams().len(), 3);
        assert_eq!(bp.add_ons().len(), 10);
    }

    #[test]
    fn duplicate_team_is_namespace_collision() {
        let mut cfg = config();
        let dup = cfg.teams[1].clone();
        cfg.teams.push(dup);
        let err = Blueprint::new(cfg).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::NamespaceCollision {
                team: "gryffindor".into()
            }
        );
    }

    #[test]
    fn blank_account_is_missing_field() {
        let mut cfg = config();
        cfg.account = String::new();
        assert!(matches!(
            Blueprint::new(cfg),
            Err(ConfigurationError::MissingField { field }) if field == "account"
        ));
    }

    #[test]
    fn clone_overrides_region_only() {
        let base = Blueprint::new(config()).expect("blueprint");
        let clone = base.clone_for_region("us-west-2");
        assert_eq!(clone.region(), "us-west-2");
        assert_eq!(clone.account(), base.account());
        assert_eq!(clone.teams(), base.teams());
        assert_eq!(clone.add_ons(), base.add_ons());
        assert_eq!(base.region(), "us-east-1");
    }

    #[test]
    fn mutating_a_clone_leaves_source_untouched() {
        let base = Blueprint::new(config()).expect("blueprint");
        let before = base.add_ons().to_vec();
        let extended = base
            .clone_for_region("us-east-2")
            .with_add_on(AddOnSpec::named("argocd"));
        assert_eq!(extended.add_ons().len(), before.len() + 1);
        assert_eq!(base.add_ons(), before.as_slice());
    }

    #[test]
    fn fargate_profiles_cover_application_teams() {
        let cfg = config();
        let ClusterProvider::Fargate { profiles, version } = &cfg.cluster_provider else {
            panic!("expected fargate provider");
        };
        assert_eq!(version, "1.20");
        assert_eq!(profiles.len(), 2, "platform team gets no profile");
        assert_eq!(profiles["slytherin"].selectors, ["team-slytherin"]);
    }
}
