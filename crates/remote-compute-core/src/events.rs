//! Broadcast + history log of manager events.
//!
//! Stands in for observing the compute collection: subscribers that join
//! late replay the history, then follow live events.

use std::{collections::VecDeque, sync::RwLock};

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::entity::{ComputeId, ComputeStatus};

/// Default number of events kept for late subscribers.
const HISTORY_LEN: usize = 1024;

/// Remote call made during best-effort cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupOperation {
    Stop,
    Delete,
}

/// Something that happened to the compute collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComputeEvent {
    ComputeCreated { compute_id: ComputeId },
    ComputeRemoved { compute_id: ComputeId },
    StatusChanged {
        compute_id: ComputeId,
        from: ComputeStatus,
        to: ComputeStatus,
    },
    SessionCreated {
        compute_id: ComputeId,
        session_id: String,
    },
    SessionDeleted {
        compute_id: ComputeId,
        session_id: String,
    },
    /// A swallowed failure during remove or teardown.
    CleanupFailed {
        compute_id: ComputeId,
        operation: CleanupOperation,
        error: String,
    },
    /// Every compute was dropped by a teardown.
    ManagerCleared { removed: usize, failed: usize },
}

/// Event log with broadcast and bounded history.
pub struct EventLog {
    history: RwLock<VecDeque<ComputeEvent>>,
    capacity: usize,
    sender: broadcast::Sender<ComputeEvent>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog {
    /// Create a log with the default history length.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_LEN)
    }

    /// Create a log keeping at most `capacity` events.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self {
            history: RwLock::new(VecDeque::with_capacity(capacity.min(32))),
            capacity,
            sender,
        }
    }

    /// Publish to live subscribers and history.
    pub fn publish(&self, event: ComputeEvent) {
        tracing::trace!(?event, "compute event");
        let _ = self.sender.send(event.clone()); // no subscribers is fine

        let mut history = self
            .history
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if history.len() == self.capacity {
            history.pop_front();
        }
        history.push_back(event);
    }

    /// Get a receiver for live events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ComputeEvent> {
        self.sender.subscribe()
    }

    /// Get a snapshot of the history, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<ComputeEvent> {
        self.history
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Stream that yields history first, then live events.
    ///
    /// Lagging receivers skip the events they missed.
    #[must_use]
    pub fn history_plus_stream(&self) -> futures::stream::BoxStream<'static, ComputeEvent> {
        let rx = self.subscribe();
        let hist = futures::stream::iter(self.history());
        let live = BroadcastStream::new(rx).filter_map(|res| async move { res.ok() });

        Box::pin(hist.chain(live))
    }
}
