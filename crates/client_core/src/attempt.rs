//! Attempt bookkeeping for simulated in-flight operations.
//!
//! Every pending operation gets a monotonic [`AttemptId`] and a cancellation
//! signal. Starting a new attempt or cancelling the current one fires the
//! previous signal, and completions re-check the id under the shell lock, so
//! a superseded attempt always completes as a no-op.

use std::{
    future::Future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use shared::domain::AttemptId;
use tokio::sync::watch;

/// Result of an attempt that may have been superseded while it waited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome<T> {
    Completed(T),
    Superseded,
}

impl<T> AttemptOutcome<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, AttemptOutcome::Completed(_))
    }

    pub fn completed(self) -> Option<T> {
        match self {
            AttemptOutcome::Completed(value) => Some(value),
            AttemptOutcome::Superseded => None,
        }
    }
}

/// Shared id source so attempts from different trackers never collide.
#[derive(Debug, Clone, Default)]
pub struct AttemptSequence(Arc<AtomicU64>);

impl AttemptSequence {
    pub fn next_id(&self) -> AttemptId {
        AttemptId(self.0.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

/// Handle held by the task waiting on an attempt.
pub struct AttemptTicket {
    id: AttemptId,
    cancelled: watch::Receiver<bool>,
}

impl AttemptTicket {
    pub fn id(&self) -> AttemptId {
        self.id
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.borrow()
    }

    /// Resolves when the attempt is cancelled or its tracker is dropped.
    pub async fn cancelled(&mut self) {
        let _ = self.cancelled.wait_for(|cancelled| *cancelled).await;
    }

    /// Runs `fut` unless the attempt is cancelled first.
    pub async fn guard<F: Future>(&mut self, fut: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            _ = self.cancelled() => None,
            output = fut => Some(output),
        }
    }
}

#[derive(Debug)]
struct ActiveAttempt {
    id: AttemptId,
    cancel: watch::Sender<bool>,
}

#[derive(Debug)]
pub struct AttemptTracker {
    sequence: AttemptSequence,
    active: Option<ActiveAttempt>,
}

impl AttemptTracker {
    pub fn new(sequence: AttemptSequence) -> Self {
        Self {
            sequence,
            active: None,
        }
    }

    /// Starts a new attempt, cancelling any attempt still in flight.
    pub fn begin(&mut self) -> AttemptTicket {
        self.cancel();
        let id = self.sequence.next_id();
        let (cancel, cancelled) = watch::channel(false);
        self.active = Some(ActiveAttempt { id, cancel });
        AttemptTicket { id, cancelled }
    }

    pub fn current(&self) -> Option<AttemptId> {
        self.active.as_ref().map(|active| active.id)
    }

    pub fn is_current(&self, id: AttemptId) -> bool {
        self.current() == Some(id)
    }

    pub fn is_pending(&self) -> bool {
        self.active.is_some()
    }

    pub fn cancel(&mut self) -> Option<AttemptId> {
        let active = self.active.take()?;
        let _ = active.cancel.send(true);
        Some(active.id)
    }

    /// Retires `id` without signalling cancellation. False when superseded.
    pub fn finish(&mut self, id: AttemptId) -> bool {
        if !self.is_current(id) {
            return false;
        }
        self.active = None;
        true
    }
}
