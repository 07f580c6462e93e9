//! Resolved-variant memo.
//!
//! Swapping a placeholder is the expensive step of a replacement pass —
//! on a cold URL it costs a node build and, under the preload policy, a
//! network fetch. The cache lets every later placeholder (or later pass)
//! that resolves to the same URL reuse the prepared node: the pass clones
//! the cached prototype instead of fetching again.
//!
//! # Keys
//!
//! Keys are always **fully resolved URLs** — the template after width and
//! mode substitution — never the raw `data-src` template. Two placeholders
//! with the same template but different rendered widths resolve to
//! different URLs and cache independently; the same template at the same
//! width is one entry no matter how many placeholders share it.
//!
//! # Lifetime
//!
//! One cache per engine instance, unbounded, never evicted; it lives
//! exactly as long as the engine. Inserting an existing key overwrites
//! (last writer wins) — an interleaved preload completion and a later
//! pass can both write the same key, and the entries are equivalent.

use crate::dom::NodeId;
use std::collections::HashMap;

/// Mapping from resolved URL to the prepared replacement node.
#[derive(Debug, Default)]
pub struct VariantCache {
    entries: HashMap<String, NodeId>,
}

impl VariantCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached prototype for a resolved URL, if any.
    pub fn lookup(&self, resolved_url: &str) -> Option<NodeId> {
        self.entries.get(resolved_url).copied()
    }

    /// Record the prepared node for a resolved URL.
    pub fn insert(&mut self, resolved_url: impl Into<String>, node: NodeId) {
        self.entries.insert(resolved_url.into(), node);
    }

    pub fn contains(&self, resolved_url: &str) -> bool {
        self.entries.contains_key(resolved_url)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
