//! Shared test utilities for the respimg test suite.
//!
//! Builders for the documents, configs, and viewports the engine tests
//! construct over and over, plus a notification drain that strips
//! delivery flags so assertions compare plain [`EngineEvent`]s.

use crate::config::EngineConfig;
use crate::density::StaticViewport;
use crate::dom::{Document, MemoryDocument};
use crate::events::{EngineEvent, Notification};
use std::sync::mpsc::Receiver;

/// Default config with events enabled, so tests can observe the pipeline.
pub fn test_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.events.enabled = true;
    config
}

/// A document holding one raw placeholder div per `(data-src, data-width)`
/// entry, in order, all matching the default `.responsive-image` selector.
pub fn placeholder_page(placeholders: &[(&str, Option<u32>)]) -> MemoryDocument {
    let mut doc = MemoryDocument::new();
    let root = doc.root();
    for &(src, width) in placeholders {
        let node = doc.add_element(root, "div");
        doc.add_class(node, "responsive-image");
        doc.set_attribute(node, "data-src", src);
        if let Some(width) = width {
            doc.set_attribute(node, "data-width", &width.to_string());
        }
    }
    doc
}

/// A viewport classified as high-density via its pixel ratio.
pub fn dense_viewport() -> StaticViewport {
    StaticViewport {
        device_pixel_ratio: 2.0,
        high_density_media: false,
    }
}

/// Drain every pending notification, keeping just the events.
pub fn event_log(receiver: &Receiver<Notification>) -> Vec<EngineEvent> {
    receiver.try_iter().map(|n| n.event).collect()
}
