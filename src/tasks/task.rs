//! # Monitor abstraction.
//!
//! A monitor is a named, long-running, cancelable unit of work. The supervisor
//! treats it opaquely: it only observes whether an invocation returned, failed
//! or unwound after cancellation.
//!
//! The common handle type is [`TaskRef`], an `Arc<dyn Task>` suitable for
//! sharing between the supervisor table and the retry chains.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;

/// Shared handle to a monitor object.
pub type TaskRef = Arc<dyn Task>;

/// # Asynchronous, cancelable monitor.
///
/// Each call to [`run`](Task::run) is one invocation. Implementations should
/// await `ctx.cancelled()` next to every blocking point and return
/// [`TaskError::Canceled`] (or `Ok(())`) promptly once it fires.
///
/// # Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use async_trait::async_trait;
/// use sysmonitor::{Task, TaskError};
///
/// struct Heartbeat;
///
/// #[async_trait]
/// impl Task for Heartbeat {
///     fn name(&self) -> &str { "heartbeat" }
///
///     async fn run(&self, ctx: CancellationToken) -> Result<(), TaskError> {
///         ctx.cancelled().await;
///         Err(TaskError::Canceled)
///     }
/// }
/// ```
#[async_trait]
pub trait Task: Send + Sync + 'static {
    /// Returns a stable, human-readable monitor name.
    fn name(&self) -> &str;

    /// Runs one invocation until it returns, faults or observes cancellation.
    async fn run(&self, ctx: CancellationToken) -> Result<(), TaskError>;
}
