//! CLI manifests: resolve input and report output.
//!
//! The binary drives the engine from a JSON manifest describing a
//! viewport and a list of placeholders:
//!
//! ```json
//! {
//!   "viewport": { "device_pixel_ratio": 2.0, "high_density_media": false },
//!   "placeholders": [
//!     { "src": "/image/1/800/600/photos/dawn.jpg", "width": 300 }
//!   ]
//! }
//! ```
//!
//! [`run_resolve`] builds a [`MemoryDocument`] shaped to the configured
//! selector, runs a full engine lifecycle against it (transform → init →
//! drain), and reads the outcome back into a [`ResolveReport`] —
//! serialized to JSON for downstream tooling and formatted for the
//! terminal by [`crate::output`].

use crate::config::{ConfigError, EngineConfig};
use crate::density::StaticViewport;
use crate::dom::{self, Document, MemoryDocument};
use crate::engine::Engine;
use crate::events::EngineEvent;
use crate::loader::EagerLoader;
use crate::width;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Manifest validation error: {0}")]
    Validation(String),
}

/// Input manifest for a resolve run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolveManifest {
    /// Viewport signals sampled by the caller.
    #[serde(default)]
    pub viewport: StaticViewport,
    /// Placeholders, in document order.
    pub placeholders: Vec<PlaceholderSpec>,
}

impl ResolveManifest {
    pub fn validate(&self) -> Result<(), ManifestError> {
        if let Some(position) = self.placeholders.iter().position(|p| p.src.is_empty()) {
            return Err(ManifestError::Validation(format!(
                "placeholder {} has an empty src",
                position + 1
            )));
        }
        Ok(())
    }
}

/// One declared placeholder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlaceholderSpec {
    /// URL template (`data-src`).
    pub src: String,
    /// Expected render width (`data-width`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
}

/// Outcome of a resolve run.
#[derive(Debug, Clone, Serialize)]
pub struct ResolveReport {
    /// Density classification for the manifest's viewport.
    pub high_density: bool,
    /// Nodes examined by the final pass.
    pub examined: usize,
    /// Swaps served from the variant cache.
    pub cache_hits: usize,
    /// Asset fetches issued (preload policy only).
    pub fetches: usize,
    pub entries: Vec<ResolvedEntry>,
}

/// One placeholder's resolution.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedEntry {
    pub template: String,
    pub rendered_width: u32,
    pub selected_width: u32,
    pub resolved_url: String,
    /// True when the swap was a background style write.
    pub background: bool,
}

/// Load and validate a manifest file.
pub fn load_manifest(path: &Path) -> Result<ResolveManifest, ManifestError> {
    let content = fs::read_to_string(path)?;
    let manifest: ResolveManifest = serde_json::from_str(&content)?;
    manifest.validate()?;
    Ok(manifest)
}

/// Build a document holding the manifest's placeholders, shaped so each
/// one matches the configured selector.
pub fn build_document(manifest: &ResolveManifest, config: &EngineConfig) -> MemoryDocument {
    let shape = dom::parse_selector_list(&config.selector);
    let shape = shape.first();
    let tag = shape
        .and_then(|s| s.tag.clone())
        .unwrap_or_else(|| "div".to_string());

    let mut doc = MemoryDocument::new();
    let root = doc.root();
    for spec in &manifest.placeholders {
        let node = doc.add_element(root, &tag);
        if let Some(shape) = shape {
            for class in &shape.classes {
                doc.add_class(node, class);
            }
            if let Some(id) = &shape.id {
                doc.set_attribute(node, "id", id);
            }
            for (name, value) in &shape.attributes {
                doc.set_attribute(node, name, value.as_deref().unwrap_or(""));
            }
        }
        doc.set_attribute(node, "data-src", &spec.src);
        if let Some(width) = spec.width {
            doc.set_attribute(node, "data-width", &width.to_string());
        }
    }
    doc
}

/// Run a full engine lifecycle over the manifest and report the outcome.
///
/// Events are force-enabled on a local copy of the config so cache hits
/// can be counted; the caller's config is not modified.
pub fn run_resolve(
    manifest: &ResolveManifest,
    config: &EngineConfig,
) -> Result<ResolveReport, ManifestError> {
    let mut config = config.clone();
    config.events.enabled = true;

    let document = build_document(manifest, &config);
    let mut engine = Engine::new(config.clone(), document, manifest.viewport, EagerLoader::new())?;
    let receiver = engine.subscribe();
    engine.init();
    while engine.drain_loads() > 0 {}

    let cache_hits = receiver
        .try_iter()
        .filter(|n| matches!(n.event, EngineEvent::ImageUpdated { cached: true, .. }))
        .count();
    let fetches = engine.loader_mut().requests().len();
    let high_density = engine.is_high_density();

    // Replacement preserves position, so the final matches line up 1:1
    // with the manifest's placeholders.
    let selector = if config.css_background {
        config.selector.clone()
    } else {
        config.class_selector()
    };
    let nodes = engine.document().query(&selector);
    let entries = nodes
        .iter()
        .zip(&manifest.placeholders)
        .map(|(&node, spec)| {
            let rendered = spec.width.unwrap_or(0);
            let selected = width::resolve_width(
                rendered,
                &config.available_widths,
                config.retina && high_density,
            );
            let resolved_url = if config.css_background {
                engine
                    .document()
                    .style_property(node, "background-image")
                    .and_then(|v| v.strip_prefix("url("))
                    .and_then(|v| v.strip_suffix(')'))
                    .unwrap_or_default()
                    .to_string()
            } else {
                engine.document().attribute(node, "src").unwrap_or_default()
            };
            ResolvedEntry {
                template: spec.src.clone(),
                rendered_width: rendered,
                selected_width: selected,
                resolved_url,
                background: config.css_background,
            }
        })
        .collect();

    Ok(ResolveReport {
        high_density,
        examined: nodes.len(),
        cache_hits,
        fetches,
        entries,
    })
}
