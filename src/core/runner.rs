//! # Run a single attempt of a monitor.
//!
//! Executes one invocation of a [`Task`] under a child cancellation token and
//! publishes the attempt's terminal event to the [`Bus`].
//!
//! ## Event flow
//! ```text
//! Success:       task.run() → Ok(())          → publish MonitorStopped
//! Cancellation:  task.run() → Err(Canceled)   → publish MonitorStopped
//! Failure:       task.run() → Err(Fail)       → publish MonitorFailed
//! Panic:         task.run() panics            → publish MonitorFailed, returned as Fail
//! ```
//!
//! ## Rules
//! - Always publishes **exactly one** terminal event.
//! - A panic is a fault of this attempt only; it never takes the chain down.
//! - Child cancellation does **not** affect the parent.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::{
    error::TaskError,
    events::{Bus, Event, EventKind},
    tasks::Task,
};

/// Executes a single attempt of `task`, publishing its terminal event to `bus`.
pub async fn run_once<T: Task + ?Sized>(
    task: &T,
    parent: &CancellationToken,
    attempt: u32,
    bus: &Bus,
) -> Result<(), TaskError> {
    let child = parent.child_token();

    let res = match AssertUnwindSafe(task.run(child)).catch_unwind().await {
        Ok(res) => res,
        Err(panic) => Err(TaskError::fail(format!(
            "panicked: {}",
            panic_message(panic.as_ref())
        ))),
    };

    match &res {
        Ok(()) | Err(TaskError::Canceled) => publish_stopped(bus, task.name(), attempt),
        Err(e) => publish_failed(bus, task.name(), attempt, e),
    }
    res
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn publish_stopped(bus: &Bus, name: &str, attempt: u32) {
    bus.publish(
        Event::new(EventKind::MonitorStopped)
            .with_task(name)
            .with_attempt(attempt),
    );
}

fn publish_failed(bus: &Bus, name: &str, attempt: u32, err: &TaskError) {
    bus.publish(
        Event::new(EventKind::MonitorFailed)
            .with_task(name)
            .with_attempt(attempt)
            .with_reason(err.to_string()),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::TaskFn;

    #[tokio::test]
    async fn panic_becomes_fault() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let task = TaskFn::new("boom", |_ctx: CancellationToken| async move {
            if true {
                panic!("sysfs vanished");
            }
            Ok::<(), TaskError>(())
        });

        let res = run_once(&task, &CancellationToken::new(), 1, &bus).await;
        assert_eq!(res, Err(TaskError::fail("panicked: sysfs vanished")));

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::MonitorFailed);
        assert_eq!(ev.attempt, Some(1));
    }

    #[tokio::test]
    async fn cancellation_is_a_clean_stop() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let parent = CancellationToken::new();
        parent.cancel();
        let task = TaskFn::new("waiter", |ctx: CancellationToken| async move {
            ctx.cancelled().await;
            Err(TaskError::Canceled)
        });

        let res = run_once(&task, &parent, 2, &bus).await;
        assert_eq!(res, Err(TaskError::Canceled));
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::MonitorStopped);
    }
}
