//! # Event bus for broadcasting runtime events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] used by the
//! supervisor, the retry chains and the subscriber workers.
//!
//! ```text
//! Publishers (many):                 Receivers:
//!   Chain "audio" ──┐
//!   Chain "power" ──┼──────► Bus ───────► supervisor listener ────► SubscriberSet
//!   Supervisor    ──┘  (broadcast chan)   (tests may subscribe too)
//! ```
//!
//! ## Rules
//! - `publish()` never blocks.
//! - A single ring buffer stores recent events for all receivers.
//! - Slow receivers get `RecvError::Lagged(n)` and skip `n` oldest items.
//! - Events are lost if there are no receivers at send time.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for runtime events.
///
/// Cheap to clone (internally holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<Event>(capacity);
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver that will observe subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}
