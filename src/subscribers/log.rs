//! # LogWriter: events as structured `tracing` records
//!
//! ## Example output (fmt layer)
//! ```text
//! INFO  sysmonitor::events: starting monitor="power" attempt=1
//! WARN  sysmonitor::events: failed monitor="power" attempt=1 reason="execution failed: No such file or directory (os error 2)"
//! INFO  sysmonitor::events: retry monitor="power" retry=1 delay_ms=3000 reason="..."
//! ERROR sysmonitor::events: escalated monitor="power" failures=4 reason="..."
//! INFO  sysmonitor::events: relaunched monitor="power" generation=2
//! INFO  sysmonitor::events: shutdown-requested
//! ```

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

const TARGET: &str = "sysmonitor::events";

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let tag = e.kind.as_tag();
        let monitor = e.task.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::MonitorStarting | EventKind::MonitorStopped => {
                debug!(target: TARGET, monitor, attempt = e.attempt, "{tag}");
            }
            EventKind::MonitorFailed => {
                warn!(target: TARGET, monitor, attempt = e.attempt, reason, "{tag}");
            }
            EventKind::RetryScheduled => {
                info!(target: TARGET, monitor, retry = e.attempt, delay_ms = e.delay_ms, reason, "{tag}");
            }
            EventKind::ChainEscalated => {
                error!(target: TARGET, monitor, failures = e.attempt, reason, "{tag}");
            }
            EventKind::MonitorCompleted => {
                info!(target: TARGET, monitor, attempts = e.attempt, "{tag}");
            }
            EventKind::MonitorRelaunched => {
                info!(target: TARGET, monitor, generation = e.attempt, "{tag}");
            }
            EventKind::MonitorRejected => {
                error!(target: TARGET, monitor, reason, "{tag}");
            }
            EventKind::ShutdownRequested | EventKind::AllStoppedWithin => {
                info!(target: TARGET, "{tag}");
            }
            EventKind::GraceExceeded => {
                warn!(target: TARGET, stuck = reason, "{tag}");
            }
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked => {
                warn!(target: TARGET, subscriber = monitor, reason, "{tag}");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
