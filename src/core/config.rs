//! # Supervisor runtime configuration.
//!
//! [`SupervisorConfig`] centralizes the runtime knobs. It is used in two ways:
//! 1. **Supervisor creation**: `Supervisor::builder(config)`
//! 2. **TaskSpec defaults**: `TaskSpec::with_defaults(task, &config)`

use std::time::Duration;

use crate::policies::RetryPolicy;

/// Global configuration for the supervisor runtime.
///
/// ## Field semantics
/// - `grace`: maximum wait for monitors to unwind after a shutdown request
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by Bus)
/// - `retry`: default retry policy for monitors (can be overridden per spec)
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Maximum time to wait for cancelled monitors before giving up on them.
    pub grace: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,

    /// Default retry policy.
    pub retry: RetryPolicy,
}

impl SupervisorConfig {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for SupervisorConfig {
    /// Default configuration:
    ///
    /// - `grace = 5s`
    /// - `bus_capacity = 1024`
    /// - `retry = RetryPolicy::default()` (3 retries, 3s apart)
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(5),
            bus_capacity: 1024,
            retry: RetryPolicy::default(),
        }
    }
}
