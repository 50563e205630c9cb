//! # RetryChain: bounded local retry around one monitor.
//!
//! A chain runs attempts of one [`Task`] **sequentially** and keeps its own
//! [`RetryState`]. It ends in exactly one of three ways:
//!
//! ```text
//! loop {
//!   ├─► attempt += 1, publish MonitorStarting
//!   ├─► run_once(task, token, attempt)
//!   │       ├─ Ok            ──► Completed            (supervisor relaunches)
//!   │       ├─ Err(Canceled) ──► Cancelled            (not counted, no retry)
//!   │       └─ Err(Fail)     ──► RetryState::record_failure
//!   │                              ├─ Retry     ─► publish RetryScheduled, sleep (cancellable)
//!   │                              └─ Exhausted ─► publish ChainEscalated, Escalated
//! }
//! ```
//!
//! ## Rules
//! - Attempts never overlap within one chain.
//! - The failure counter lives and dies with the chain; a relaunch starts at zero.
//! - Cancellation is checked before every attempt and during the retry sleep.

use tokio::{select, time};
use tokio_util::sync::CancellationToken;

use crate::{
    core::runner::run_once,
    error::TaskError,
    events::{Bus, Event, EventKind},
    policies::{RetryDecision, RetryPolicy, RetryState},
    tasks::TaskRef,
};

/// How a chain ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainExit {
    /// The monitor returned cleanly after `attempts` invocations.
    Completed { attempts: u32 },
    /// Retries exhausted; `error` is the last fault.
    Escalated { failures: u32, error: TaskError },
    /// Shutdown (or the monitor itself) asked the chain to unwind.
    Cancelled,
    /// The chain future itself panicked.
    Panicked { info: String },
}

/// Supervises the attempts of a single monitor.
pub struct RetryChain {
    task: TaskRef,
    retry: RetryPolicy,
    bus: Bus,
}

impl RetryChain {
    /// Creates a new chain.
    pub fn new(bus: Bus, task: TaskRef, retry: RetryPolicy) -> Self {
        Self { task, retry, bus }
    }

    /// Runs attempts until completion, escalation or cancellation.
    pub async fn run(self, token: CancellationToken) -> ChainExit {
        let mut state = RetryState::new();
        let mut attempt: u32 = 0;

        loop {
            if token.is_cancelled() {
                return ChainExit::Cancelled;
            }

            attempt += 1;
            self.bus.publish(
                Event::new(EventKind::MonitorStarting)
                    .with_task(self.task.name())
                    .with_attempt(attempt),
            );

            let err = match run_once(self.task.as_ref(), &token, attempt, &self.bus).await {
                Ok(()) => return ChainExit::Completed { attempts: attempt },
                Err(TaskError::Canceled) => return ChainExit::Cancelled,
                Err(e) => e,
            };

            match state.record_failure(&self.retry) {
                RetryDecision::Retry { retry, delay } => {
                    self.bus.publish(
                        Event::new(EventKind::RetryScheduled)
                            .with_task(self.task.name())
                            .with_attempt(retry)
                            .with_delay(delay)
                            .with_reason(err.to_string()),
                    );

                    let sleep = time::sleep(delay);
                    tokio::pin!(sleep);
                    select! {
                        _ = &mut sleep => {}
                        _ = token.cancelled() => return ChainExit::Cancelled,
                    }
                }
                RetryDecision::Exhausted { failures } => {
                    self.bus.publish(
                        Event::new(EventKind::ChainEscalated)
                            .with_task(self.task.name())
                            .with_attempt(failures)
                            .with_reason(err.to_string()),
                    );
                    return ChainExit::Escalated {
                        failures,
                        error: err,
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use tokio::time::Instant;

    use super::*;
    use crate::tasks::TaskFn;

    fn failing(calls: Arc<AtomicU32>, stamps: Arc<std::sync::Mutex<Vec<Instant>>>) -> TaskRef {
        TaskFn::arc("power", move |_ctx: CancellationToken| {
            let calls = Arc::clone(&calls);
            let stamps = Arc::clone(&stamps);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                stamps.lock().unwrap().push(Instant::now());
                Err(TaskError::fail("no battery"))
            }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn four_invocations_three_seconds_apart() {
        let calls = Arc::new(AtomicU32::new(0));
        let stamps = Arc::new(std::sync::Mutex::new(Vec::new()));
        let chain = RetryChain::new(
            Bus::new(64),
            failing(calls.clone(), stamps.clone()),
            RetryPolicy::default(),
        );

        let exit = chain.run(CancellationToken::new()).await;

        assert_eq!(
            exit,
            ChainExit::Escalated {
                failures: 4,
                error: TaskError::fail("no battery")
            }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        let stamps = stamps.lock().unwrap();
        for pair in stamps.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_secs(3));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_transient_faults() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let task: TaskRef = TaskFn::arc("audio", move |_ctx: CancellationToken| {
            let c = Arc::clone(&c);
            async move {
                if c.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(TaskError::fail("pactl not ready"))
                } else {
                    Ok(())
                }
            }
        });

        let exit = RetryChain::new(Bus::new(64), task, RetryPolicy::default())
            .run(CancellationToken::new())
            .await;
        assert_eq!(exit, ChainExit::Completed { attempts: 3 });
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_is_not_counted() {
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();
        let task: TaskRef = TaskFn::arc("vpn", |ctx: CancellationToken| async move {
            ctx.cancelled().await;
            Err(TaskError::Canceled)
        });
        let token = CancellationToken::new();
        let handle = tokio::spawn(RetryChain::new(bus, task, RetryPolicy::default()).run(token.clone()));

        tokio::time::sleep(Duration::from_secs(1)).await;
        token.cancel();
        assert_eq!(handle.await.unwrap(), ChainExit::Cancelled);

        while let Ok(ev) = rx.try_recv() {
            assert_ne!(ev.kind, EventKind::RetryScheduled);
            assert_ne!(ev.kind, EventKind::MonitorFailed);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_retry_sleep() {
        let calls = Arc::new(AtomicU32::new(0));
        let stamps = Arc::new(std::sync::Mutex::new(Vec::new()));
        let token = CancellationToken::new();
        let handle = tokio::spawn(
            RetryChain::new(Bus::new(64), failing(calls.clone(), stamps), RetryPolicy::default())
                .run(token.clone()),
        );

        tokio::time::sleep(Duration::from_millis(500)).await;
        token.cancel();
        assert_eq!(handle.await.unwrap(), ChainExit::Cancelled);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
