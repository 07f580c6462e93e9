//! The replacement engine.
//!
//! Ties the pipeline together: placeholder transform on construction,
//! density classification and a first replacement pass on [`init`], and a
//! debounced re-entry of both on every resize notification. One engine
//! instance owns one document, one variant cache, and one pass-state
//! machine; nothing is shared between instances.
//!
//! # A replacement pass
//!
//! [`Engine::run_pass`] sweeps every node currently carrying the
//! replacement class, in reverse collection order, and resolves each one
//! through the width resolver and URL rewriter. The pass is serialized
//! against itself by [`PassState`]: a trigger arriving while a pass is
//! running is dropped — not queued, not retried.
//!
//! Under the preload policy a cache-miss swap is deferred: the pass fires
//! the load and finishes without waiting, and the swap happens when the
//! host next calls [`Engine::drain_loads`] after the loader reports the
//! asset. A pass can therefore start, run, and finish while an earlier
//! pass's loads are still outstanding; the variant cache tolerates the
//! interleaved writes (same key, equivalent node, last writer wins).
//!
//! [`init`]: Engine::init

use crate::cache::VariantCache;
use crate::config::{ConfigError, EngineConfig};
use crate::debounce::Debouncer;
use crate::density::{Viewport, is_high_density};
use crate::dom::{Document, NodeId};
use crate::events::{EngineEvent, EventSink, Notification};
use crate::loader::{ImageLoader, LoadTicket};
use crate::rewrite::SourcePattern;
use crate::width;
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};
use tracing::debug;

/// Inert 1×1 transparent GIF used for pending placeholder images.
pub const TRANSPARENT_PIXEL: &str =
    "data:image/gif;base64,R0lGODlhAQABAIAAAAAAAP///yH5BAEAAAAALAAAAAABAAEAAAIBRAA7";

/// Mutual exclusion for the replacement pass.
///
/// A single Idle/Running flag owned by the engine instance. `try_begin`
/// is the only transition into Running; a failed attempt means a pass is
/// already iterating and the trigger must be dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassState {
    Idle,
    Running,
}

impl PassState {
    /// Transition Idle→Running. False when already Running.
    pub fn try_begin(&mut self) -> bool {
        if *self == Self::Idle {
            *self = Self::Running;
            true
        } else {
            false
        }
    }

    /// Transition back to Idle.
    pub fn finish(&mut self) {
        *self = Self::Idle;
    }
}

/// What became of a pass trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// The pass ran over `examined` matched nodes.
    Completed { examined: usize },
    /// A pass was already running; this trigger was dropped.
    Dropped,
}

/// A swap waiting on its asset load.
#[derive(Debug)]
struct PendingSwap {
    ticket: LoadTicket,
    url: String,
    placeholder: NodeId,
    parent: NodeId,
    replacement: NodeId,
}

/// Responsive variant resolution and replacement engine.
///
/// Generic over its three collaborator seams: the document, the viewport
/// signals, and the asset loader.
pub struct Engine<D: Document, V: Viewport, L: ImageLoader> {
    config: EngineConfig,
    document: D,
    viewport: V,
    loader: L,
    pattern: SourcePattern,
    cache: VariantCache,
    pass: PassState,
    debouncer: Option<Debouncer>,
    pending_swaps: Vec<PendingSwap>,
    events: EventSink,
    prototype: NodeId,
    high_density: bool,
    initialized: bool,
}

impl<D: Document, V: Viewport, L: ImageLoader> Engine<D, V, L> {
    /// Construct an engine and transform the document's placeholders.
    ///
    /// Validates the config and compiles its URL pattern, creates the
    /// inert-pixel prototype, and immediately runs the placeholder
    /// transform. No pass runs until [`init`](Self::init).
    pub fn new(
        config: EngineConfig,
        mut document: D,
        viewport: V,
        loader: L,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let pattern = SourcePattern::compile(&config.pattern)?;

        let prototype = document.create_element("img");
        document.set_attribute(prototype, "src", TRANSPARENT_PIXEL);
        document.add_class(prototype, config.class_attribute());

        let debouncer = config
            .debounce
            .then(|| Debouncer::new(Duration::from_millis(config.interval_ms)));

        let mut engine = Self {
            config,
            document,
            viewport,
            loader,
            pattern,
            cache: VariantCache::new(),
            pass: PassState::Idle,
            debouncer,
            pending_swaps: Vec::new(),
            events: EventSink::new(),
            prototype,
            high_density: false,
            initialized: false,
        };
        engine.transform_placeholders();
        Ok(engine)
    }

    /// Classify density, then run the first replacement pass.
    ///
    /// After this the host wires its resize signal to
    /// [`notify_resize`](Self::notify_resize) (and, with debouncing, pumps
    /// [`tick`](Self::tick)).
    pub fn init(&mut self) {
        self.initialized = true;
        self.high_density = self.classify_density();
        self.run_pass();
    }

    /// Convert raw placeholders into their pending form.
    ///
    /// Collects the configured selector's matches once. In image-swap mode
    /// each match is replaced, bottom-up, by a clone of the inert-pixel
    /// prototype carrying the match's `data-width` (as `width`) and its
    /// `data-src` verbatim. In background-swap mode the replacement class
    /// is appended in place and nothing is replaced.
    ///
    /// Re-run this after declaring new placeholders; once the engine is
    /// initialized it triggers an immediate pass.
    pub fn transform_placeholders(&mut self) {
        let matches = self.document.query(&self.config.selector);
        debug!(count = matches.len(), "transforming placeholders");

        if self.config.css_background {
            let class = self.config.class_attribute().to_string();
            for &node in &matches {
                self.document.add_class(node, &class);
            }
        } else {
            // Bottom-up so earlier replacements cannot disturb the
            // positions of nodes still to be visited.
            for &node in matches.iter().rev() {
                let pixel = self.document.clone_node(self.prototype);
                if let Some(declared) = self.document.attribute(node, "data-width") {
                    self.document.set_attribute(pixel, "width", &declared);
                }
                if let Some(template) = self.document.attribute(node, "data-src") {
                    self.document.set_attribute(pixel, "data-src", &template);
                }
                if let Some(parent) = self.document.parent(node) {
                    self.document.replace_child(parent, node, pixel);
                }
            }
        }

        if self.initialized {
            self.run_pass();
        }
    }

    /// Run one replacement pass over all currently-matched placeholders.
    ///
    /// Serialized against itself: a trigger while a pass is running
    /// returns [`PassOutcome::Dropped`]. The pass finishes synchronously;
    /// it never waits for outstanding preloads.
    pub fn run_pass(&mut self) -> PassOutcome {
        if !self.pass.try_begin() {
            debug!("pass already running, dropping trigger");
            return PassOutcome::Dropped;
        }
        let targets = self.document.query(&self.config.class_selector());
        debug!(count = targets.len(), "replacement pass started");
        self.announce(EngineEvent::StartReplacement {
            count: targets.len(),
        });
        for &node in targets.iter().rev() {
            self.replace_placeholder(node);
        }
        self.pass.finish();
        PassOutcome::Completed {
            examined: targets.len(),
        }
    }

    /// Finish deferred swaps whose assets have loaded.
    ///
    /// Returns the number of swaps performed. Failed loads never surface
    /// here — their placeholders stay pending until a later pass retries
    /// them.
    pub fn drain_loads(&mut self) -> usize {
        let mut swapped = 0;
        for ticket in self.loader.completed() {
            while let Some(position) = self.pending_swaps.iter().position(|p| p.ticket == ticket)
            {
                let pending = self.pending_swaps.remove(position);
                self.finish_swap(pending);
                swapped += 1;
            }
        }
        swapped
    }

    /// Record a viewport resize at `now`.
    ///
    /// With debouncing enabled this (re-)arms the debouncer — only the
    /// most recent notification in a burst survives. Without debouncing
    /// density is reclassified and a pass runs immediately.
    pub fn notify_resize(&mut self, now: Instant) {
        match &mut self.debouncer {
            Some(debouncer) => debouncer.signal(now),
            None => self.refresh_and_replace(),
        }
    }

    /// Pump the debounced resize coordinator.
    ///
    /// When the debounce interval has elapsed since the last notification,
    /// reclassifies density and runs a pass; returns whether that fired.
    pub fn tick(&mut self, now: Instant) -> bool {
        let fired = self.debouncer.as_mut().is_some_and(|d| d.fire(now));
        if fired {
            self.refresh_and_replace();
        }
        fired
    }

    /// Subscribe to engine notifications.
    pub fn subscribe(&mut self) -> Receiver<Notification> {
        self.events.subscribe()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn document(&self) -> &D {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut D {
        &mut self.document
    }

    pub fn viewport_mut(&mut self) -> &mut V {
        &mut self.viewport
    }

    pub fn loader_mut(&mut self) -> &mut L {
        &mut self.loader
    }

    pub fn cache(&self) -> &VariantCache {
        &self.cache
    }

    /// The density classification cached from the last recomputation.
    pub fn is_high_density(&self) -> bool {
        self.high_density
    }

    /// Swaps still waiting on their asset loads.
    pub fn pending_load_count(&self) -> usize {
        self.pending_swaps.len()
    }

    fn refresh_and_replace(&mut self) {
        self.high_density = self.classify_density();
        self.run_pass();
    }

    /// Classify the display, announcing the status when configured.
    ///
    /// The announcement fires on every recomputation, changed or not.
    fn classify_density(&mut self) -> bool {
        let status = is_high_density(&self.viewport);
        self.announce(EngineEvent::RetinaStatus { status });
        status
    }

    /// Resolve a placeholder's template to a concrete asset URL.
    fn resolved_url(&self, node: NodeId) -> String {
        let template = self.document.attribute(node, "data-src").unwrap_or_default();
        let rendered = self.document.client_width(node);
        let selected = width::resolve_width(
            rendered,
            &self.config.available_widths,
            self.config.retina && self.high_density,
        );
        self.pattern.rewrite(&template, selected)
    }

    fn replace_placeholder(&mut self, image: NodeId) {
        let resolved = self.resolved_url(image);

        if self.config.css_background {
            let cached = self.cache.contains(&resolved);
            if !cached {
                self.cache.insert(resolved.clone(), image);
            }
            // The style write happens every pass; the cache only records
            // that the URL has been resolved before.
            let value = format!("url({resolved})");
            self.document
                .set_style_property(image, "background-image", &value);
            self.announce(EngineEvent::ImageUpdated {
                image,
                new_src: resolved,
                cached,
            });
            return;
        }

        if let Some(prototype) = self.cache.lookup(&resolved) {
            let replacement = self.document.clone_node(prototype);
            if let Some(declared) = self.document.attribute(image, "width") {
                self.document.set_attribute(replacement, "width", &declared);
            }
            if let Some(parent) = self.document.parent(image) {
                self.document.replace_child(parent, image, replacement);
            }
            self.announce(EngineEvent::ImageUpdated {
                image: replacement,
                new_src: resolved,
                cached: true,
            });
        } else if !self.config.preload {
            let replacement = self.document.clone_node(image);
            self.document.set_attribute(replacement, "src", &resolved);
            self.cache.insert(resolved.clone(), replacement);
            if let Some(parent) = self.document.parent(image) {
                self.document.replace_child(parent, image, replacement);
            }
            self.announce(EngineEvent::ImageUpdated {
                image: replacement,
                new_src: resolved,
                cached: false,
            });
        } else {
            let Some(parent) = self.document.parent(image) else {
                return;
            };
            // At most one in-flight replacement per placeholder.
            if self
                .pending_swaps
                .iter()
                .any(|p| p.placeholder == image && p.url == resolved)
            {
                return;
            }
            let replacement = self.document.clone_node(image);
            // Identical URLs share one load; every swap still gets its
            // own cloned node.
            let ticket = match self.pending_swaps.iter().find(|p| p.url == resolved) {
                Some(pending) => pending.ticket,
                None => self.loader.begin(&resolved),
            };
            self.pending_swaps.push(PendingSwap {
                ticket,
                url: resolved,
                placeholder: image,
                parent,
                replacement,
            });
        }
    }

    fn finish_swap(&mut self, pending: PendingSwap) {
        self.document
            .set_attribute(pending.replacement, "src", &pending.url);
        self.cache.insert(pending.url.clone(), pending.replacement);
        self.document
            .replace_child(pending.parent, pending.placeholder, pending.replacement);
        self.announce(EngineEvent::ImageUpdated {
            image: pending.replacement,
            new_src: pending.url,
            cached: false,
        });
    }

    fn announce(&mut self, event: EngineEvent) {
        if !self.config.events.enabled {
            return;
        }
        if matches!(event, EngineEvent::RetinaStatus { .. }) && !self.config.events.retina {
            return;
        }
        self.events.announce(Notification {
            event,
            bubbles: self.config.events.bubble,
            cancelable: self.config.events.cancelable,
        });
    }
}
