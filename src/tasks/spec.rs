//! # Monitor specification for supervised execution.
//!
//! [`TaskSpec`] bundles a monitor with the [`RetryPolicy`] its chain uses.
//! A spec can be created:
//! - **Explicitly** with [`TaskSpec::new`]
//! - **From config** with [`TaskSpec::with_defaults`] (inherit the supervisor's retry policy)

use crate::{core::SupervisorConfig, policies::RetryPolicy, tasks::task::TaskRef};

/// Specification for running a monitor under supervision.
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
/// use sysmonitor::{RetryPolicy, SupervisorConfig, TaskError, TaskFn, TaskRef, TaskSpec};
///
/// let vpn: TaskRef = TaskFn::arc("vpn", |_ctx: CancellationToken| async move {
///     Ok::<(), TaskError>(())
/// });
///
/// let spec = TaskSpec::with_defaults(vpn.clone(), &SupervisorConfig::default());
/// assert_eq!(spec.retry().max_retries, 3);
///
/// let fast = TaskSpec::new(vpn, RetryPolicy { max_retries: 1, delay: Duration::from_millis(10) });
/// assert_eq!(fast.name(), "vpn");
/// ```
#[derive(Clone)]
pub struct TaskSpec {
    task: TaskRef,
    retry: RetryPolicy,
}

impl TaskSpec {
    /// Creates a spec with an explicit retry policy.
    pub fn new(task: TaskRef, retry: RetryPolicy) -> Self {
        Self { task, retry }
    }

    /// Creates a spec inheriting the retry policy from the supervisor config.
    pub fn with_defaults(task: TaskRef, cfg: &SupervisorConfig) -> Self {
        Self {
            task,
            retry: cfg.retry,
        }
    }

    /// Returns reference to the monitor.
    pub fn task(&self) -> &TaskRef {
        &self.task
    }

    /// Convenience: returns the monitor name.
    pub fn name(&self) -> &str {
        self.task.name()
    }

    /// Returns the retry policy.
    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }

    /// Returns a new spec with an updated retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}
