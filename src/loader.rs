//! Asynchronous asset loading seam.
//!
//! Under the preload policy the engine delays a swap until the asset has
//! finished loading. The load itself is the host's business — a browser
//! image fetch, an HTTP client, a no-op — so it sits behind the
//! [`ImageLoader`] trait: [`begin`](ImageLoader::begin) starts a load and
//! returns a ticket, [`completed`](ImageLoader::completed) drains the
//! tickets that have finished successfully since the last drain.
//!
//! A pass never blocks on a load: it fires the request and moves on, and
//! the engine finishes the deferred swap when the ticket shows up in a
//! later [`completed`](ImageLoader::completed) drain.
//!
//! # Failures
//!
//! A failed load is never reported. The ticket simply never appears in a
//! drain, the placeholder keeps its pending presentation, and no retry is
//! scheduled — the next externally triggered pass recomputes the same URL
//! and starts over.

use tracing::debug;

/// Handle for one in-flight load request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadTicket(u64);

/// Host-provided asset loader.
pub trait ImageLoader {
    /// Start loading `url`. Must not block.
    fn begin(&mut self, url: &str) -> LoadTicket;

    /// Tickets whose loads completed successfully since the last drain.
    fn completed(&mut self) -> Vec<LoadTicket>;
}

/// Loader whose every request succeeds at the next drain.
///
/// The CLI resolves against this — there is no real network, so an asset
/// is "loaded" the moment it is asked for. Tests use the recorded request
/// list to count fetches.
#[derive(Debug, Default)]
pub struct EagerLoader {
    next_ticket: u64,
    outstanding: Vec<LoadTicket>,
    requests: Vec<String>,
}

impl EagerLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every URL requested so far, in request order.
    pub fn requests(&self) -> &[String] {
        &self.requests
    }
}

impl ImageLoader for EagerLoader {
    fn begin(&mut self, url: &str) -> LoadTicket {
        let ticket = LoadTicket(self.next_ticket);
        self.next_ticket += 1;
        debug!(url, ?ticket, "load requested");
        self.outstanding.push(ticket);
        self.requests.push(url.to_string());
        ticket
    }

    fn completed(&mut self) -> Vec<LoadTicket> {
        std::mem::take(&mut self.outstanding)
    }
}

/// Loader driven explicitly by the host (or a test).
///
/// Requests stay pending until [`complete`](ManualLoader::complete) or
/// [`complete_url`](ManualLoader::complete_url) marks them done.
/// [`fail`](ManualLoader::fail) discards a pending request without ever
/// reporting it — the loader-side expression of "a failed load never
/// invokes its completion handler".
#[derive(Debug, Default)]
pub struct ManualLoader {
    next_ticket: u64,
    pending: Vec<(LoadTicket, String)>,
    done: Vec<LoadTicket>,
}

impl ManualLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// URLs still awaiting completion, in request order.
    pub fn pending_urls(&self) -> Vec<&str> {
        self.pending.iter().map(|(_, url)| url.as_str()).collect()
    }

    /// Number of requests issued over the loader's lifetime.
    pub fn request_count(&self) -> u64 {
        self.next_ticket
    }

    /// Mark one pending request complete.
    pub fn complete(&mut self, ticket: LoadTicket) {
        if let Some(position) = self.pending.iter().position(|(t, _)| *t == ticket) {
            self.pending.remove(position);
            self.done.push(ticket);
        }
    }

    /// Mark every pending request for `url` complete.
    pub fn complete_url(&mut self, url: &str) {
        let (finished, pending) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|(_, u)| u == url);
        self.pending = pending;
        self.done
            .extend(finished.into_iter().map(|(ticket, _)| ticket));
    }

    /// Discard every pending request for `url`. The tickets are never
    /// reported as completed.
    pub fn fail(&mut self, url: &str) {
        debug!(url, "load failed, dropping without completion");
        self.pending.retain(|(_, u)| u != url);
    }
}

impl ImageLoader for ManualLoader {
    fn begin(&mut self, url: &str) -> LoadTicket {
        let ticket = LoadTicket(self.next_ticket);
        self.next_ticket += 1;
        debug!(url, ?ticket, "load requested");
        self.pending.push((ticket, url.to_string()));
        ticket
    }

    fn completed(&mut self) -> Vec<LoadTicket> {
        std::mem::take(&mut self.done)
    }
}
