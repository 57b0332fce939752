//! Tera rendering engine: [`ManifestKind`] enum and [`Renderer`].
//!
//! # Output layout (relative to the synth output directory)
//!
//! | Manifest  | Output path                          | Rendered when                  |
//! |-----------|--------------------------------------|--------------------------------|
//! | Pipeline  | `pipeline.yaml`                      | always, once                   |
//! | Blueprint | `stages/<id>/blueprint.yaml`         | every stage                    |
//! | Bootstrap | `stages/<id>/argocd/bootstrap.yaml`  | stage has a bootstrap add-on   |
//! | Projects  | `stages/<id>/argocd/projects.yaml`   | bootstrap has project routes   |

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tera::Tera;

use blueprint_core::PipelineSpec;

use crate::context::{StageCtx, TemplateContext};
use crate::error::RenderError;

// ---------------------------------------------------------------------------
// Embedded templates: baked into the binary at compile time via include_str!
// ---------------------------------------------------------------------------

const TPLS: &[(&str, &str)] = &[
    ("shared/_header.tera", include_str!("templates/_partials/header.tera")),
    ("pipeline.yaml.tera", include_str!("templates/pipeline.yaml.tera")),
    ("blueprint.yaml.tera", include_str!("templates/blueprint.yaml.tera")),
    ("argocd/bootstrap.yaml.tera", include_str!("templates/bootstrap.yaml.tera")),
    ("argocd/projects.yaml.tera", include_str!("templates/projects.yaml.tera")),
];

// ---------------------------------------------------------------------------
// Template loading helpers
// ---------------------------------------------------------------------------

fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RenderError {
    RenderError::Io { path: path.into(), source }
}

fn normalize_template_name(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "/")
        .to_lowercase()
}

fn collect_template_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), RenderError> {
    let entries = std::fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        let meta = entry.metadata().map_err(|e| io_err(&path, e))?;
        if meta.is_dir() {
            collect_template_files(&path, out)?;
        } else if meta.is_file() {
            out.push(path);
        }
    }
    Ok(())
}

fn load_user_templates(dir: &Path) -> Result<Vec<(String, String)>, RenderError> {
    if !dir.exists() {
        return Ok(vec![]);
    }
    let mut files = Vec::new();
    collect_template_files(dir, &mut files)?;
    let mut templates = Vec::new();
    for path in files {
        if path.extension().and_then(|s| s.to_str()) != Some("tera") {
            continue;
        }
        let rel = path.strip_prefix(dir).unwrap_or(path.as_path());
        let name = normalize_template_name(rel);
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        templates.push((name, contents));
    }
    Ok(templates)
}

fn build_tera(user_template_dir: Option<&Path>) -> Result<Tera, RenderError> {
    let mut templates: HashMap<String, String> = HashMap::new();
    for (name, content) in TPLS {
        templates.insert(
            normalize_template_name(Path::new(name)),
            (*content).to_string(),
        );
    }
    if let Some(dir) = user_template_dir {
        for (name, content) in load_user_templates(dir)? {
            templates.insert(name, content);
        }
    }

    let mut tera = Tera::default();
    let items: Vec<(String, String)> = templates.into_iter().collect();
    tera.add_raw_templates(items)?;
    Ok(tera)
}

// ---------------------------------------------------------------------------
// ManifestKind
// ---------------------------------------------------------------------------

/// Every manifest the renderer can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManifestKind {
    Pipeline,
    Blueprint,
    Bootstrap,
    Projects,
}

impl ManifestKind {
    /// All manifest kinds in render order.
    pub fn all() -> &'static [ManifestKind] {
        &[
            ManifestKind::Pipeline,
            ManifestKind::Blueprint,
            ManifestKind::Bootstrap,
            ManifestKind::Projects,
        ]
    }

    /// Rendered per stage rather than once per pipeline.
    pub fn per_stage(&self) -> bool {
        !matches!(self, ManifestKind::Pipeline)
    }

    pub fn template_name(&self) -> &'static str {
        match self {
            ManifestKind::Pipeline  => "pipeline.yaml.tera",
            ManifestKind::Blueprint => "blueprint.yaml.tera",
            ManifestKind::Bootstrap => "argocd/bootstrap.yaml.tera",
            ManifestKind::Projects  => "argocd/projects.yaml.tera",
        }
    }

    /// Output path relative to the output root. `stage` is ignored for
    /// [`ManifestKind::Pipeline`].
    pub fn output_path(&self, stage: &str) -> PathBuf {
        let stage_dir = Path::new("stages").join(stage);
        match self {
            ManifestKind::Pipeline  => PathBuf::from("pipeline.yaml"),
            ManifestKind::Blueprint => stage_dir.join("blueprint.yaml"),
            ManifestKind::Bootstrap => stage_dir.join("argocd").join("bootstrap.yaml"),
            ManifestKind::Projects  => stage_dir.join("argocd").join("projects.yaml"),
        }
    }

    /// Whether this manifest applies to `stage`.
    fn applies_to(&self, stage: &StageCtx) -> bool {
        match self {
            ManifestKind::Pipeline | ManifestKind::Blueprint => true,
            ManifestKind::Bootstrap => stage.bootstrap.is_some(),
            ManifestKind::Projects => stage
                .bootstrap
                .as_ref()
                .is_some_and(|b| !b.projects.is_empty()),
        }
    }
}

// ---------------------------------------------------------------------------
// TemplateEngine
// ---------------------------------------------------------------------------

/// Tera-based engine for rendering templates with optional user overrides.
///
/// `user_template_dir` may contain `.tera` files that override embedded defaults.
/// Template names are normalised to lowercase and relative paths.
pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    /// Construct a new [`TemplateEngine`], loading embedded templates plus any
    /// overrides found in `user_template_dir`.
    pub fn new(user_template_dir: Option<&Path>) -> Result<Self, RenderError> {
        let tera = build_tera(user_template_dir)?;
        Ok(TemplateEngine { tera })
    }

    /// Render one manifest kind for every stage it applies to.
    ///
    /// Returns `Vec<(relative_output_path, rendered_content)>`.
    pub fn render(
        &self,
        ctx: &TemplateContext,
        kind: ManifestKind,
    ) -> Result<Vec<(PathBuf, String)>, RenderError> {
        let name = kind.template_name();
        if !kind.per_stage() {
            let content = self.tera.render(name, &ctx.to_tera_context()?)?;
            return Ok(vec![(kind.output_path(""), normalize(content))]);
        }

        let mut results = Vec::new();
        for stage in ctx.stages.iter().filter(|s| kind.applies_to(s)) {
            let content = self.tera.render(name, &ctx.to_stage_context(stage)?)?;
            results.push((kind.output_path(&stage.id), normalize(content)));
        }
        Ok(results)
    }
}

fn normalize(content: String) -> String {
    if content.contains('\r') {
        content.replace("\r\n", "\n")
    } else {
        content
    }
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Renders every manifest of a pipeline.
///
/// Create once with [`Renderer::new`] (embedded templates) or
/// [`Renderer::with_overrides`] and reuse.
pub struct Renderer {
    engine: TemplateEngine,
}

impl Renderer {
    /// Construct a new [`Renderer`] with embedded templates.
    pub fn new() -> Result<Self, RenderError> {
        Ok(Renderer { engine: TemplateEngine::new(None)? })
    }

    /// Embedded templates, overridden by any `.tera` file under `dir`.
    pub fn with_overrides(dir: &Path) -> Result<Self, RenderError> {
        Ok(Renderer { engine: TemplateEngine::new(Some(dir))? })
    }

    /// Render all manifests for `spec`, in [`ManifestKind::all`] order.
    pub fn render(&self, spec: &PipelineSpec) -> Result<Vec<(PathBuf, String)>, RenderError> {
        let ctx = TemplateContext::from_pipeline(spec)?;
        self.render_with_context(&ctx)
    }

    /// Render all manifests using a caller-provided [`TemplateContext`].
    pub fn render_with_context(
        &self,
        ctx: &TemplateContext,
    ) -> Result<Vec<(PathBuf, String)>, RenderError> {
        let mut outputs = Vec::new();
        for kind in ManifestKind::all() {
            outputs.extend(self.engine.render(ctx, *kind)?);
        }
        Ok(outputs)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tests::reference_spec;
    use blueprint_core::{PipelineConfig, Settings};

    fn find<'a>(outputs: &'a [(PathBuf, String)], path: &str) -> &'a str {
        outputs
            .iter()
            .find(|(p, _)| p == Path::new(path))
            .map(|(_, c)| c.as_str())
            .unwrap_or_else(|| panic!("missing output {path}"))
    }

    #[test]
    fn renderer_new_succeeds() {
        Renderer::new().expect("Renderer::new should succeed with embedded templates");
    }

    #[test]
    fn reference_pipeline_output_set() {
        let outputs = Renderer::new().unwrap().render(&reference_spec()).unwrap();
        let paths: Vec<_> = outputs.iter().map(|(p, _)| p.clone()).collect();
        // 1 pipeline + 3 blueprints + 3 bootstraps + 3 project lists.
        assert_eq!(paths.len(), 10);
        assert_eq!(paths[0], PathBuf::from("pipeline.yaml"));
        assert!(paths.contains(&PathBuf::from("stages/prod/argocd/projects.yaml")));
    }

    #[test]
    fn pipeline_manifest_lists_stages_in_order() {
        let outputs = Renderer::new().unwrap().render(&reference_spec()).unwrap();
        let pipeline = find(&outputs, "pipeline.yaml");
        let dev = pipeline.find("\"dev\"").expect("dev");
        let test = pipeline.find("\"test\"").expect("test");
        let prod = pipeline.find("\"prod\"").expect("prod");
        assert!(dev < test && test < prod, "stages out of order:\n{pipeline}");
        assert!(pipeline.contains("credentialsSecretName: \"github-token\""));
    }

    #[test]
    fn bootstrap_points_at_environment_directory() {
        let outputs = Renderer::new().unwrap().render(&reference_spec()).unwrap();
        let bootstrap = find(&outputs, "stages/test/argocd/bootstrap.yaml");
        assert!(bootstrap.contains("path: \"envs/test\""), "{bootstrap}");
        assert!(bootstrap.contains("targetRevision: \"workshop\""));
    }

    #[test]
    fn stage_without_bootstrap_renders_blueprint_only() {
        let mut cfg = PipelineConfig::reference();
        cfg.environments[2].bootstrap = false;
        let spec = cfg
            .build(&Settings {
                account: Some("219890958300".into()),
                region: None,
            })
            .unwrap();
        let outputs = Renderer::new().unwrap().render(&spec).unwrap();
        assert!(outputs
            .iter()
            .all(|(p, _)| !p.starts_with("stages/prod/argocd")));
        let prod = find(&outputs, "stages/prod/blueprint.yaml");
        assert!(!prod.contains("argocd"), "{prod}");
        assert!(find(&outputs, "stages/dev/blueprint.yaml").contains("argocd"));
    }

    #[test]
    fn no_crlf_in_any_rendered_output() {
        let outputs = Renderer::new().unwrap().render(&reference_spec()).unwrap();
        for (path, content) in &outputs {
            assert!(
                !content.contains('\r'),
                "{} contains CR char: line endings not normalised",
                path.display()
            );
        }
    }

    #[test]
    fn output_paths_are_relative() {
        for kind in ManifestKind::all() {
            assert!(kind.output_path("dev").is_relative(), "{kind:?}");
        }
        assert_eq!(
            ManifestKind::Projects.output_path("dev"),
            PathBuf::from("stages/dev/argocd/projects.yaml")
        );
    }

    #[test]
    fn user_override_replaces_embedded_template() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("pipeline.yaml.tera"),
            "custom: {{ name }}\n",
        )
        .unwrap();
        let renderer = Renderer::with_overrides(dir.path()).unwrap();
        let outputs = renderer.render(&reference_spec()).unwrap();
        assert_eq!(
            find(&outputs, "pipeline.yaml"),
            "custom: aws-bb-containers-capstone-pipeline\n"
        );
    }
}
