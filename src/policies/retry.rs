//! # Bounded local retry for one monitor chain.
//!
//! [`RetryPolicy`] is the static knob (how many consecutive faults to absorb,
//! how long to wait between attempts). [`RetryState`] is the per-chain counter
//! threaded through the retry loop; it is never shared between monitors, so it
//! needs no synchronization.
//!
//! ```text
//! fault #1 ─► Retry { retry: 1, delay }
//! fault #2 ─► Retry { retry: 2, delay }
//! fault #3 ─► Retry { retry: 3, delay }
//! fault #4 ─► Exhausted                     (escalate to supervisor)
//! ```
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use sysmonitor::{RetryDecision, RetryPolicy, RetryState};
//!
//! let policy = RetryPolicy { max_retries: 1, delay: Duration::from_secs(3) };
//! let mut state = RetryState::new();
//!
//! assert_eq!(
//!     state.record_failure(&policy),
//!     RetryDecision::Retry { retry: 1, delay: Duration::from_secs(3) }
//! );
//! assert_eq!(state.record_failure(&policy), RetryDecision::Exhausted { failures: 2 });
//! ```

use std::time::Duration;

/// Default number of consecutive faults absorbed by one chain.
pub const MAX_RETRIES: u32 = 3;

/// Default sleep between two attempts of the same chain.
pub const RETRY_DELAY: Duration = Duration::from_secs(3);

/// Retry budget for a monitor chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Faults absorbed before the chain escalates.
    pub max_retries: u32,
    /// Fixed delay before each retry.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    /// Returns `3` retries with a `3s` delay.
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            delay: RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Total number of invocations a continuously failing chain performs.
    #[inline]
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// What the chain should do after a fault.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep `delay`, then run retry number `retry` (1-based).
    Retry { retry: u32, delay: Duration },
    /// Budget spent; `failures` faults were observed in this chain.
    Exhausted { failures: u32 },
}

/// Consecutive-fault counter of a single chain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RetryState {
    failures: u32,
}

impl RetryState {
    /// Fresh state for a brand-new chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Faults observed so far.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Records one fault and decides whether the chain may continue.
    pub fn record_failure(&mut self, policy: &RetryPolicy) -> RetryDecision {
        self.failures = self.failures.saturating_add(1);
        if self.failures > policy.max_retries {
            RetryDecision::Exhausted {
                failures: self.failures,
            }
        } else {
            RetryDecision::Retry {
                retry: self.failures,
                delay: policy.delay,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_allows_four_attempts() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.delay, Duration::from_secs(3));
        assert_eq!(policy.max_attempts(), 4);
    }

    #[test]
    fn escalates_after_budget() {
        let policy = RetryPolicy::default();
        let mut state = RetryState::new();

        for n in 1..=3 {
            assert_eq!(
                state.record_failure(&policy),
                RetryDecision::Retry {
                    retry: n,
                    delay: Duration::from_secs(3)
                }
            );
        }
        assert_eq!(
            state.record_failure(&policy),
            RetryDecision::Exhausted { failures: 4 }
        );
    }

    #[test]
    fn zero_budget_escalates_on_first_fault() {
        let policy = RetryPolicy {
            max_retries: 0,
            delay: Duration::ZERO,
        };
        let mut state = RetryState::new();
        assert_eq!(
            state.record_failure(&policy),
            RetryDecision::Exhausted { failures: 1 }
        );
    }

    #[test]
    fn states_are_independent() {
        let policy = RetryPolicy::default();
        let mut a = RetryState::new();
        let b = RetryState::new();
        a.record_failure(&policy);
        a.record_failure(&policy);
        assert_eq!(a.failures(), 2);
        assert_eq!(b.failures(), 0);
    }
}
