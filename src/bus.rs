//! Hand-off of published state from the ingestion worker to one consumer.
//!
//! The worker pushes immutable [`SliceState`] copies; the consumer pulls them
//! on its own thread. While a notification for a slice is still waiting to be
//! received, a newer one for the same slice replaces it in place, so a slow
//! consumer sees the most recent value of each slice rather than every
//! intermediate one.

use crate::projection::StatusSnapshot;
use crate::reducers::{SliceId, SliceState};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// A slice changed; carries its new state.
    SliceChanged(SliceState),
    /// The startup replay finished and steady-state tailing has begun.
    InitialScanComplete,
}

#[derive(Debug, Default)]
struct Queue {
    pending: VecDeque<Notification>,
    /// The subscriber is gone; nothing is queued any more.
    closed: bool,
}

#[derive(Debug, Default)]
struct Shared {
    queue: Mutex<Queue>,
    available: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Create a connected publisher and subscriber.
pub fn channel() -> (Publisher, Subscriber) {
    let shared = Arc::new(Shared::default());
    (
        Publisher {
            shared: Arc::clone(&shared),
        },
        Subscriber {
            shared,
            latest: BTreeMap::new(),
            scan_complete: false,
        },
    )
}

/// Sending half, owned by the engine.
#[derive(Debug, Clone)]
pub struct Publisher {
    shared: Arc<Shared>,
}

impl Publisher {
    /// Queue a changed slice, replacing a pending notification for the same
    /// slice if the consumer has not received it yet.
    pub fn publish(&self, state: SliceState) {
        let mut queue = self.shared.lock();
        if queue.closed {
            return;
        }
        let slice = state.slice();
        let pending = queue.pending.iter_mut().find(
            |n| matches!(n, Notification::SliceChanged(s) if s.slice() == slice),
        );
        match pending {
            Some(slot) => *slot = Notification::SliceChanged(state),
            None => queue.pending.push_back(Notification::SliceChanged(state)),
        }
        drop(queue);
        self.shared.available.notify_one();
    }

    pub fn publish_all(&self, states: impl IntoIterator<Item = SliceState>) {
        for state in states {
            self.publish(state);
        }
    }

    /// Raise the one-time "initial scan complete" signal.
    pub fn scan_complete(&self) {
        let mut queue = self.shared.lock();
        if queue.closed {
            return;
        }
        queue.pending.push_back(Notification::InitialScanComplete);
        drop(queue);
        self.shared.available.notify_one();
    }
}

/// Receiving half, owned by the single consumer.
///
/// Every received notification also updates a local cache, so the consumer
/// can ask for the latest state of any slice without reaching back into the
/// engine.
#[derive(Debug)]
pub struct Subscriber {
    shared: Arc<Shared>,
    latest: BTreeMap<SliceId, SliceState>,
    scan_complete: bool,
}

impl Subscriber {
    /// Take the next notification without waiting.
    pub fn try_recv(&mut self) -> Option<Notification> {
        let next = self.shared.lock().pending.pop_front();
        next.inspect(|n| self.observe(n))
    }

    /// Wait up to `timeout` for the next notification.
    pub fn recv_timeout(&mut self, timeout: Duration) -> Option<Notification> {
        let deadline = Instant::now() + timeout;
        let mut queue = self.shared.lock();
        let next = loop {
            if let Some(next) = queue.pending.pop_front() {
                break Some(next);
            }
            let now = Instant::now();
            if now >= deadline {
                break None;
            }
            queue = self
                .shared
                .available
                .wait_timeout(queue, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        };
        drop(queue);
        next.inspect(|n| self.observe(n))
    }

    /// Take every pending notification.
    pub fn drain(&mut self) -> Vec<Notification> {
        let drained: Vec<Notification> = self.shared.lock().pending.drain(..).collect();
        for n in &drained {
            self.observe(n);
        }
        drained
    }

    /// Receive until the initial scan completes or `timeout` elapses.
    ///
    /// Returns whether the scan completed.
    pub fn wait_ready(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while !self.scan_complete {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            self.recv_timeout(deadline - now);
        }
        self.scan_complete
    }

    /// Latest state received for `slice`.
    pub fn latest(&self, slice: SliceId) -> Option<&SliceState> {
        self.latest.get(&slice)
    }

    /// Whether an initial scan has completed.
    pub fn is_ready(&self) -> bool {
        self.scan_complete
    }

    /// Status projection over the latest received states.
    pub fn status(&self) -> StatusSnapshot {
        StatusSnapshot::from_states(self.latest.values())
    }

    fn observe(&mut self, notification: &Notification) {
        match notification {
            Notification::SliceChanged(state) => {
                self.latest.insert(state.slice(), state.clone());
            }
            Notification::InitialScanComplete => self.scan_complete = true,
        }
    }
}

impl Drop for Subscriber {
    fn drop(&mut self) {
        let mut queue = self.shared.lock();
        queue.closed = true;
        queue.pending.clear();
    }
}
