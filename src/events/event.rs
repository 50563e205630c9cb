//! # Runtime events emitted by the supervisor and the retry chains.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Attempt events**: one monitor invocation (starting, stopped, failed)
//! - **Chain events**: retry scheduling and escalation
//! - **Supervisor events**: completion, relaunch, rejection, shutdown
//! - **Subscriber events**: overflow and panic isolation
//!
//! The [`Event`] struct carries additional metadata such as timestamps,
//! monitor name, reasons and retry delays.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use sysmonitor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::RetryScheduled)
//!     .with_task("power")
//!     .with_reason("no such file")
//!     .with_attempt(2)
//!     .with_delay(Duration::from_secs(3));
//!
//! assert_eq!(ev.kind, EventKind::RetryScheduled);
//! assert_eq!(ev.task.as_deref(), Some("power"));
//! assert_eq!(ev.delay_ms, Some(3000));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(1);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `task`: subscriber name
    /// - `reason`: panic message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `task`: subscriber name
    /// - `reason`: "full" or "closed"
    SubscriberOverflow,

    // === Shutdown events ===
    /// Shutdown requested (SIGINT/SIGTERM or injected trigger).
    ShutdownRequested,

    /// All monitors stopped within the grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some monitors ignored cancellation.
    ///
    /// Sets:
    /// - `reason`: comma-separated stuck monitor names
    GraceExceeded,

    // === Attempt events ===
    /// Monitor attempt is starting.
    ///
    /// Sets:
    /// - `task`: monitor name
    /// - `attempt`: attempt number within the chain (1-based)
    MonitorStarting,

    /// Monitor attempt returned cleanly or unwound after cancellation.
    ///
    /// Sets:
    /// - `task`, `attempt`
    MonitorStopped,

    /// Monitor attempt faulted (error or panic).
    ///
    /// Sets:
    /// - `task`, `attempt`
    /// - `reason`: fault message
    MonitorFailed,

    // === Chain events ===
    /// The chain absorbed a fault and will retry after `delay_ms`.
    ///
    /// Sets:
    /// - `task`: monitor name
    /// - `attempt`: retry number (1..=max_retries)
    /// - `delay_ms`: sleep before the retry
    /// - `reason`: the absorbed fault
    RetryScheduled,

    /// The chain exhausted its retries and hands the fault to the supervisor.
    ///
    /// Sets:
    /// - `task`: monitor name
    /// - `attempt`: total faults observed in the chain
    /// - `reason`: the last fault
    ChainEscalated,

    // === Supervisor events ===
    /// A chain ended because its monitor returned cleanly.
    ///
    /// Sets:
    /// - `task`: monitor name
    /// - `attempt`: attempts performed by the chain
    MonitorCompleted,

    /// The supervisor started a fresh chain for a monitor that finished.
    ///
    /// Sets:
    /// - `task`: monitor name
    /// - `attempt`: launch generation (1 = first launch)
    MonitorRelaunched,

    /// A monitor could not be registered (duplicate name).
    ///
    /// Sets:
    /// - `task`: monitor name
    /// - `reason`: rejection cause
    MonitorRejected,
}

impl EventKind {
    /// Short kebab-case tag used by log lines.
    pub fn as_tag(&self) -> &'static str {
        match self {
            EventKind::SubscriberPanicked => "subscriber-panicked",
            EventKind::SubscriberOverflow => "subscriber-overflow",
            EventKind::ShutdownRequested => "shutdown-requested",
            EventKind::AllStoppedWithin => "all-stopped-within-grace",
            EventKind::GraceExceeded => "grace-exceeded",
            EventKind::MonitorStarting => "starting",
            EventKind::MonitorStopped => "stopped",
            EventKind::MonitorFailed => "failed",
            EventKind::RetryScheduled => "retry",
            EventKind::ChainEscalated => "escalated",
            EventKind::MonitorCompleted => "completed",
            EventKind::MonitorRelaunched => "relaunched",
            EventKind::MonitorRejected => "rejected",
        }
    }
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Name of the monitor (or subscriber), if applicable.
    pub task: Option<Arc<str>>,
    /// Attempt / retry / generation counter, depending on the kind.
    pub attempt: Option<u32>,
    /// Retry delay in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            attempt: None,
            delay_ms: None,
            reason: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a monitor name.
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Attaches a retry delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches an attempt count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_task(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_task(subscriber)
            .with_reason(info)
    }

    /// Retry delay as a [`Duration`], if set.
    pub fn delay(&self) -> Option<Duration> {
        self.delay_ms.map(|ms| Duration::from_millis(u64::from(ms)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_is_monotonic() {
        let a = Event::new(EventKind::MonitorStarting);
        let b = Event::new(EventKind::MonitorStopped);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn delay_saturates_to_u32_millis() {
        let ev = Event::new(EventKind::RetryScheduled).with_delay(Duration::from_secs(u64::MAX));
        assert_eq!(ev.delay_ms, Some(u32::MAX));
        let ev = Event::new(EventKind::RetryScheduled).with_delay(Duration::from_secs(3));
        assert_eq!(ev.delay(), Some(Duration::from_secs(3)));
    }
}
