//! # blueprint-renderer
//!
//! Tera-based template engine that renders the manifests of a promotion
//! pipeline: the CD-engine hand-off, one blueprint per stage, and the Argo CD
//! bootstrap for every stage that has one.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use blueprint_renderer::Renderer;
//! use blueprint_core::PipelineSpec;
//!
//! fn render_all(spec: &PipelineSpec) {
//!     if let Ok(renderer) = Renderer::new() {
//!         if let Ok(outputs) = renderer.render(spec) {
//!             for (path, content) in outputs {
//!                 println!("{}: {} bytes", path.display(), content.len());
//!             }
//!         }
//!     }
//! }
//! ```

pub mod context;
pub mod engine;
pub mod error;

pub use context::TemplateContext;
pub use engine::{ManifestKind, Renderer, TemplateEngine};
pub use error::RenderError;
