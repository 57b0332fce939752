//! Template context: serializable rendering payload built from [`PipelineSpec`].

use serde::{Deserialize, Serialize};

use blueprint_core::{
    BootstrapDescriptor, ClusterProvider, EnvironmentStage, PipelineSpec, ProjectRoute,
};

use crate::error::RenderError;

/// Pipeline-wide rendering payload. Stages keep promotion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateContext {
    pub name: String,
    pub owner: String,
    pub repository: RepositoryCtx,
    pub wave: String,
    pub stages: Vec<StageCtx>,
    pub meta: MetaCtx,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryCtx {
    pub repo_url: String,
    pub credentials_secret_name: String,
    pub target_revision: String,
}

/// One stage, flattened for templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageCtx {
    pub id: String,
    pub region: String,
    pub account: String,
    pub provider: ProviderCtx,
    pub teams: Vec<TeamCtx>,
    pub add_ons: Vec<AddOnCtx>,
    pub bootstrap: Option<BootstrapCtx>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderCtx {
    pub kind: String,
    pub version: String,
    pub profiles: Vec<ProfileCtx>,
    pub instance_type: Option<String>,
    pub min_size: Option<u32>,
    pub max_size: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileCtx {
    pub name: String,
    pub selectors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamCtx {
    pub name: String,
    pub kind: String,
    pub namespace: String,
    pub principal: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddOnCtx {
    pub name: String,
    /// Inline JSON of the params; `None` when there are none.
    pub params: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapCtx {
    pub repo_url: String,
    pub path: String,
    pub revision: String,
    pub credentials_ref: String,
    pub projects: Vec<ProjectRoute>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaCtx {
    pub generator_version: String,
}

impl TemplateContext {
    /// Build a [`TemplateContext`] from a [`PipelineSpec`].
    pub fn from_pipeline(spec: &PipelineSpec) -> Result<Self, RenderError> {
        let stages = spec
            .stages
            .iter()
            .map(StageCtx::from_stage)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TemplateContext {
            name: spec.name.clone(),
            owner: spec.owner.clone(),
            repository: RepositoryCtx {
                repo_url: spec.repository.repo_url.clone(),
                credentials_secret_name: spec.repository.credentials_secret_name.clone(),
                target_revision: spec.repository.target_revision.clone(),
            },
            wave: spec.wave.clone(),
            stages,
            meta: MetaCtx {
                generator_version: env!("CARGO_PKG_VERSION").to_string(),
            },
        })
    }

    /// Convert to a [`tera::Context`] for rendering one stage.
    ///
    /// The stage is exposed as `stage`, alongside the pipeline-wide fields.
    pub fn to_stage_context(&self, stage: &StageCtx) -> Result<tera::Context, RenderError> {
        let mut ctx = self.to_tera_context()?;
        ctx.insert("stage", stage);
        Ok(ctx)
    }

    /// Convert to a [`tera::Context`] for rendering.
    pub fn to_tera_context(&self) -> Result<tera::Context, RenderError> {
        tera::Context::from_serialize(self).map_err(RenderError::from)
    }
}

impl StageCtx {
    fn from_stage(stage: &EnvironmentStage) -> Result<Self, RenderError> {
        let bp = &stage.blueprint;

        let bootstrap = stage
            .extra_add_ons
            .iter()
            .find_map(BootstrapDescriptor::from_add_on)
            .transpose()
            .map_err(|source| RenderError::Bootstrap {
                stage: stage.id.0.clone(),
                source,
            })?
            .map(|d| BootstrapCtx {
                repo_url: d.repo_url,
                path: d.path,
                revision: d.revision,
                credentials_ref: d.credentials_ref,
                projects: d.projects,
            });

        let add_ons = bp
            .add_ons()
            .iter()
            .map(|a| {
                let params = if a.params.is_empty() {
                    None
                } else {
                    Some(serde_json::to_string(&a.params)?)
                };
                Ok(AddOnCtx {
                    name: a.name.clone(),
                    params,
                })
            })
            .collect::<Result<Vec<_>, serde_json::Error>>()?;

        Ok(StageCtx {
            id: stage.id.0.clone(),
            region: stage.region.clone(),
            account: bp.account().to_string(),
            provider: ProviderCtx::from_provider(bp.cluster_provider()),
            teams: bp
                .teams()
                .iter()
                .map(|t| TeamCtx {
                    name: t.name.0.clone(),
                    kind: t.kind.to_string(),
                    namespace: t.namespace(),
                    principal: t.principal_ref.clone(),
                })
                .collect(),
            add_ons,
            bootstrap,
        })
    }
}

impl ProviderCtx {
    fn from_provider(provider: &ClusterProvider) -> Self {
        match provider {
            ClusterProvider::Fargate { version, profiles } => ProviderCtx {
                kind: provider.kind().to_string(),
                version: version.clone(),
                profiles: profiles
                    .iter()
                    .map(|(name, p)| ProfileCtx {
                        name: name.clone(),
                        selectors: p.selectors.clone(),
                    })
                    .collect(),
                instance_type: None,
                min_size: None,
                max_size: None,
            },
            ClusterProvider::ManagedNodeGroup {
                version,
                instance_type,
                min_size,
                max_size,
            } => ProviderCtx {
                kind: provider.kind().to_string(),
                version: version.clone(),
                profiles: Vec::new(),
                instance_type: Some(instance_type.clone()),
                min_size: Some(*min_size),
                max_size: Some(*max_size),
            },
        }
    }
}
