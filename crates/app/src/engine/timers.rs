//! Delayed member writes.
//!
//! Every pending write is a sleeping task that reports back to the engine
//! through its internal channel. The manager keeps the task handles indexed
//! by target so `stopAllDelays` can abort them.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use scenehub_domain::id::TimerId;
use scenehub_domain::value::Value;

use super::Internal;

/// A member write waiting for its delay to elapse.
#[derive(Debug, Clone, PartialEq)]
pub struct DelayedWrite {
    pub target: String,
    pub value: Value,
    pub ack: bool,
    pub do_not_overwrite: bool,
}

struct Pending {
    write: DelayedWrite,
    handle: JoinHandle<()>,
}

/// Owns every pending delayed write.
#[derive(Default)]
pub struct TimerManager {
    pending: HashMap<TimerId, Pending>,
    by_target: HashMap<String, Vec<TimerId>>,
}

impl TimerManager {
    /// Schedule `write` after `delay`. [`Internal::WriteDue`] is sent when it
    /// elapses.
    pub fn schedule(
        &mut self,
        internal: &mpsc::UnboundedSender<Internal>,
        write: DelayedWrite,
        delay: Duration,
    ) -> TimerId {
        let id = TimerId::new();
        let tx = internal.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Internal::WriteDue(id));
        });
        self.by_target
            .entry(write.target.clone())
            .or_default()
            .push(id);
        self.pending.insert(id, Pending { write, handle });
        id
    }

    /// Remove an elapsed timer and return its write.
    ///
    /// `None` when the timer was cancelled in the meantime.
    pub fn take_due(&mut self, id: TimerId) -> Option<DelayedWrite> {
        let pending = self.pending.remove(&id)?;
        if let Some(ids) = self.by_target.get_mut(&pending.write.target) {
            ids.retain(|other| *other != id);
            if ids.is_empty() {
                self.by_target.remove(&pending.write.target);
            }
        }
        Some(pending.write)
    }

    /// Abort every pending write to `target`. Returns how many were aborted.
    pub fn cancel_target(&mut self, target: &str) -> usize {
        let Some(ids) = self.by_target.remove(target) else {
            return 0;
        };
        for id in &ids {
            if let Some(pending) = self.pending.remove(id) {
                pending.handle.abort();
            }
        }
        ids.len()
    }

    /// Abort everything.
    pub fn cancel_all(&mut self) {
        for (_, pending) in self.pending.drain() {
            pending.handle.abort();
        }
        self.by_target.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of pending writes to `target`.
    #[must_use]
    pub fn pending_for(&self, target: &str) -> usize {
        self.by_target.get(target).map_or(0, Vec::len)
    }
}
