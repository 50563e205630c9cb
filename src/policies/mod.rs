//! Retry policy.
//!
//! ## Contents
//! - [`RetryPolicy`] how many consecutive faults a chain absorbs and the fixed delay between attempts
//! - [`RetryState`] per-chain failure counter
//! - [`RetryDecision`] outcome of recording a fault
//!
//! ## Quick wiring
//! ```text
//! TaskSpec { task, retry: RetryPolicy }
//!      └─► core::chain::RetryChain uses:
//!           - RetryState::record_failure(&retry) to decide retry / escalate
//! ```
//!
//! ## Defaults
//! - `max_retries = 3`, `delay = 3s` → at most 4 invocations per chain.

mod retry;

pub use retry::{MAX_RETRIES, RETRY_DELAY, RetryDecision, RetryPolicy, RetryState};
