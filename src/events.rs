//! Engine notifications.
//!
//! When events are enabled the engine announces the milestones of its
//! pipeline — pass start, each completed swap, each density recomputation —
//! as [`Notification`]s fanned out over mpsc channels. Observers call
//! [`Engine::subscribe`](crate::engine::Engine::subscribe) and drain their
//! `Receiver` whenever convenient; a dropped receiver is pruned on the next
//! send. Nothing is announced while events are disabled.

use crate::dom::NodeId;
use std::sync::mpsc::{Receiver, Sender, channel};

/// A milestone announced by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A replacement pass began; `count` placeholders will be visited.
    StartReplacement { count: usize },
    /// A placeholder was swapped (or restyled, in background mode).
    /// `cached` is true when the swap reused a cached variant instead of
    /// preparing a fresh one.
    ImageUpdated {
        image: NodeId,
        new_src: String,
        cached: bool,
    },
    /// Density was recomputed. Announced on every recomputation, even when
    /// the status did not change.
    RetinaStatus { status: bool },
}

impl EngineEvent {
    /// Wire name of the notification.
    pub fn name(&self) -> &'static str {
        match self {
            Self::StartReplacement { .. } => "startReplacement",
            Self::ImageUpdated { .. } => "imageUpdated",
            Self::RetinaStatus { .. } => "retinaStatus",
        }
    }
}

/// An announced event plus its configured delivery flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub event: EngineEvent,
    pub bubbles: bool,
    pub cancelable: bool,
}

/// Fan-out of notifications to any number of subscribers.
#[derive(Debug, Default)]
pub(crate) struct EventSink {
    senders: Vec<Sender<Notification>>,
}

impl EventSink {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn subscribe(&mut self) -> Receiver<Notification> {
        let (sender, receiver) = channel();
        self.senders.push(sender);
        receiver
    }

    /// Deliver to all live subscribers, pruning disconnected ones.
    pub(crate) fn announce(&mut self, notification: Notification) {
        self.senders
            .retain(|sender| sender.send(notification.clone()).is_ok());
    }
}
