//! # Engine Events
//!
//! Lifecycle and per-tick notifications, fanned out to any number of
//! subscribers.
//!
//! ```text
//!                       ┌──> [bounded] ──> EventReceiver (UI)
//! tick thread ─> EventHub
//!                       └──> [bounded] ──> EventReceiver (logger)
//! ```
//!
//! Sends never block the tick thread: a full subscriber loses the event,
//! a dropped subscriber is pruned on the next publish.

use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;

use crate::error::TickError;

/// Something the engine did.
#[derive(Clone, Debug, PartialEq)]
pub enum SyncEvent {
    /// The tick thread started.
    Started {
        /// Interval between tick starts.
        cadence: Duration,
    },

    /// A tick published a new snapshot.
    TickCompleted {
        /// Tick number.
        tick: u64,
        /// Particles placed.
        particles: usize,
        /// Wall time of the tick.
        duration: Duration,
    },

    /// A tick failed; the previous snapshot stays published.
    TickFailed {
        /// Tick number.
        tick: u64,
        /// What went wrong.
        error: TickError,
    },

    /// The previous tick overran, so this one starts late.
    TickDeferred {
        /// Tick number of the late tick.
        tick: u64,
        /// How far past its slot it starts.
        lag: Duration,
    },

    /// A queued preset reset was applied to the backend.
    ResetApplied {
        /// Preset name.
        preset: String,
    },

    /// The tick thread exited.
    Stopped {
        /// Ticks run over the engine's lifetime.
        ticks: u64,
    },
}

/// Fan-out publisher for [`SyncEvent`]s.
pub struct EventHub {
    subscribers: Mutex<Vec<Sender<SyncEvent>>>,
    capacity: usize,
}

impl EventHub {
    /// Creates a hub whose subscribers buffer `capacity` events each.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            capacity: capacity.max(1),
        }
    }

    /// Adds a subscriber.
    #[must_use]
    pub fn subscribe(&self) -> EventReceiver {
        let (sender, receiver) = bounded(self.capacity);
        self.subscribers.lock().push(sender);
        EventReceiver { receiver }
    }

    /// Sends `event` to every live subscriber without blocking.
    ///
    /// # Returns
    ///
    /// Number of subscribers that received it.
    pub fn publish(&self, event: &SyncEvent) -> usize {
        let mut subscribers = self.subscribers.lock();
        let mut delivered = 0;
        subscribers.retain(|sender| match sender.try_send(event.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            // Slow reader; drop this event for them, keep the subscription.
            Err(TrySendError::Full(_)) => true,
            Err(TrySendError::Disconnected(_)) => false,
        });
        delivered
    }

    /// Live subscriber count (as of the last publish).
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

impl std::fmt::Debug for EventHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHub")
            .field("subscribers", &self.subscriber_count())
            .field("capacity", &self.capacity)
            .finish()
    }
}

/// Receiving end of one subscription.
#[derive(Debug)]
pub struct EventReceiver {
    receiver: Receiver<SyncEvent>,
}

impl EventReceiver {
    /// Takes every buffered event.
    #[must_use]
    pub fn drain(&self) -> Vec<SyncEvent> {
        self.receiver.try_iter().collect()
    }

    /// Takes one event if any is buffered.
    #[inline]
    #[must_use]
    pub fn try_recv(&self) -> Option<SyncEvent> {
        self.receiver.try_recv().ok()
    }

    /// Waits up to `timeout` for the next event.
    ///
    /// Returns `None` on timeout or once the engine is gone and the buffer
    /// is empty.
    #[must_use]
    pub fn recv_timeout(&self, timeout: Duration) -> Option<SyncEvent> {
        match self.receiver.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Waits up to `timeout` for an event matching `pred`, discarding
    /// others.
    #[must_use]
    pub fn wait_for(
        &self,
        timeout: Duration,
        mut pred: impl FnMut(&SyncEvent) -> bool,
    ) -> Option<SyncEvent> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            // Too far out to be a deadline: wait until the hub goes away.
            return self.receiver.iter().find(|event| pred(event));
        };
        loop {
            let left = deadline.saturating_duration_since(Instant::now());
            let event = self.recv_timeout(left)?;
            if pred(&event) {
                return Some(event);
            }
        }
    }

    /// Buffered event count.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Returns true if events are buffered.
    #[inline]
    #[must_use]
    pub fn has_events(&self) -> bool {
        !self.receiver.is_empty()
    }

    /// The underlying channel, for `select!`.
    #[must_use]
    pub fn channel(&self) -> &Receiver<SyncEvent> {
        &self.receiver
    }
}
