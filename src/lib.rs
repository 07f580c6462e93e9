//! # respimg
//!
//! A responsive image variant resolution and replacement engine. Pages
//! declare placeholders — nodes carrying a URL template (`data-src`) and
//! an expected render width (`data-width`) — and the engine serves each
//! one the asset resolution its rendered width and display density call
//! for, re-deciding on every resize.
//!
//! # Architecture: Resolution Pipeline
//!
//! One replacement pass pushes every matched placeholder through four
//! stages:
//!
//! ```text
//! 1. Width     rendered width → smallest sufficient candidate (×2 on dense displays)
//! 2. Rewrite   data-src template + width → concrete asset URL
//! 3. Cache     resolved URL → reuse the prepared node if seen before
//! 4. Swap      clone into the tree (or write a background-image style)
//! ```
//!
//! The engine orchestrates the passes: placeholders are transformed into
//! a uniform pending form at construction, the first pass runs on
//! [`Engine::init`](engine::Engine::init), and resize notifications
//! re-enter the pipeline through a debouncer so bursts collapse to one
//! pass per interval. Passes are serialized against themselves — a
//! trigger during a running pass is dropped, not queued.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Pass scheduling, placeholder transform, resize coordination |
//! | [`config`] | `respimg.toml` loading, validation, merging, stock defaults |
//! | [`dom`] | [`Document`](dom::Document) seam + arena-backed [`MemoryDocument`](dom::MemoryDocument) |
//! | [`density`] | High-density display classification via the [`Viewport`](density::Viewport) seam |
//! | [`width`] | Candidate-width selection (pure) |
//! | [`rewrite`] | Mode-encoded URL template rewriting (pure) |
//! | [`cache`] | Resolved URL → prepared node memo |
//! | [`loader`] | Asynchronous asset loading seam for the preload policy |
//! | [`debounce`] | Trailing-edge debouncer over injected time |
//! | [`events`] | `startReplacement` / `imageUpdated` / `retinaStatus` notifications |
//! | [`manifest`] | CLI resolve manifests and reports |
//! | [`output`] | CLI output formatting |
//! | [`preview`] | HTML preview rendering (Maud) |
//!
//! # Design Decisions
//!
//! ## Collaborator Seams
//!
//! Document access, viewport signals, and asset loading are traits, not
//! dependencies. The engine runs the same against the bundled in-memory
//! document as against a host's real render tree, which keeps every
//! pipeline stage unit-testable without a browser in the loop.
//!
//! ## Silent Degradation
//!
//! After construction the engine never errors. A template the pattern
//! cannot rewrite is used verbatim, a missing width selects the smallest
//! candidate, and a failed preload simply leaves its placeholder pending
//! until the next pass retries it. The only hard failures are config
//! validation at construction time.
//!
//! ## Single-Threaded Cooperative Execution
//!
//! One logical thread of control; the only suspension points are asset
//! loads, which are fire-and-continue. A pass finishes synchronously and
//! never waits on outstanding loads — deferred swaps land when the host
//! pumps [`Engine::drain_loads`](engine::Engine::drain_loads). The
//! variant cache tolerates the resulting interleavings (same key writes
//! are idempotent, last writer wins).

pub mod cache;
pub mod config;
pub mod debounce;
pub mod density;
pub mod dom;
pub mod engine;
pub mod events;
pub mod loader;
pub mod manifest;
pub mod output;
pub mod preview;
pub mod rewrite;
pub mod width;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use cache::VariantCache;
pub use config::{ConfigError, EngineConfig, EventsConfig};
pub use density::{StaticViewport, Viewport};
pub use dom::{Document, MemoryDocument, NodeId};
pub use engine::{Engine, PassOutcome, PassState};
pub use events::{EngineEvent, Notification};
pub use loader::{EagerLoader, ImageLoader, LoadTicket, ManualLoader};
pub use rewrite::{ResizeMode, SourcePattern};
