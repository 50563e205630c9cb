//! Error types used by the sysmonitor runtime, its monitors and the singleton guard.
//!
//! This module defines three enums:
//!
//! - [`RuntimeError`] errors raised by the supervisor itself.
//! - [`TaskError`] the tagged outcome of one failed monitor attempt.
//! - [`LockError`] errors raised while acquiring the singleton lock.
//!
//! All of them provide `as_label` for logs.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// # Errors produced by the supervisor runtime.
///
/// Monitor faults never show up here: they are retried, escalated and
/// relaunched. Only failures of the control loop itself are reported.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some monitors ignored cancellation.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Monitors that were still mid-attempt when the grace period ran out.
        stuck: Vec<String>,
    },

    /// Installing the SIGINT/SIGTERM listeners failed.
    #[error("failed to install signal handlers: {0}")]
    Signal(#[source] std::io::Error),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use sysmonitor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::Signal(_) => "runtime_signal",
        }
    }
}

/// # Outcome of a failed monitor attempt.
///
/// `Fail` is a transient fault, counted against the retry budget.
/// `Canceled` is the cooperative answer to a shutdown request and is never
/// counted or retried.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// Monitor attempt failed; the retry chain may run it again.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Monitor observed its cancellation token and unwound.
    #[error("context cancelled")]
    Canceled,
}

impl TaskError {
    /// Shorthand for [`TaskError::Fail`] from anything displayable.
    ///
    /// ```
    /// use sysmonitor::TaskError;
    ///
    /// let err = TaskError::fail("pactl exited");
    /// assert_eq!(err.to_string(), "execution failed: pactl exited");
    /// ```
    pub fn fail(error: impl ToString) -> Self {
        TaskError::Fail {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fail { .. } => "task_failed",
            TaskError::Canceled => "task_canceled",
        }
    }

    /// Whether this outcome counts against the retry budget.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TaskError::Fail { .. })
    }
}

impl From<std::io::Error> for TaskError {
    fn from(err: std::io::Error) -> Self {
        TaskError::fail(err)
    }
}

impl From<serde_json::Error> for TaskError {
    fn from(err: serde_json::Error) -> Self {
        TaskError::fail(format!("invalid json: {err}"))
    }
}

/// # Errors produced while acquiring the singleton lock.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LockError {
    /// The marker exists and its owner is (or may be) alive.
    #[error("another instance is already running (lock {path:?}, pid {pid:?})")]
    AlreadyRunning {
        /// Marker path.
        path: PathBuf,
        /// Owner PID read from the marker, if it could be parsed.
        pid: Option<i32>,
    },

    /// Creating, reading or removing the marker failed.
    #[error("lock file {path:?}: {source}")]
    Io {
        /// Marker path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl LockError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            LockError::AlreadyRunning { .. } => "lock_already_running",
            LockError::Io { .. } => "lock_io",
        }
    }
}
