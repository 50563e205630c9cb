//! # sysmonitor
//!
//! **sysmonitor** keeps a fixed set of desktop status monitors alive for the
//! lifetime of a session. Every monitor runs concurrently; a failing monitor
//! is retried a few times in place, and whatever finally ends it, the
//! supervisor starts it again. Only one supervisor runs per machine.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   TaskSpec   │   │   TaskSpec   │   │   TaskSpec   │
//!     │   (audio)    │   │   (power)    │   │    (vpn)     │ ...
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Supervisor (single control loop)                                 │
//! │  - Registry (name → cancel token + generation, JoinSet of chains) │
//! │  - Bus (broadcast events)                                         │
//! │  - SubscriberSet (fans out to subscribers)                        │
//! └──────┬──────────────────┬──────────────────┬───────────────▲──────┘
//!        ▼                  ▼                  ▼               │ chain exit
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   │ ─► relaunch
//!     │  RetryChain  │   │  RetryChain  │   │  RetryChain  │───┘
//!     │ (≤3 retries) │   │ (≤3 retries) │   │ (≤3 retries) │
//!     └┬─────────────┘   └┬─────────────┘   └┬─────────────┘
//!      │ MonitorStarting  │ MonitorFailed    │ ChainEscalated
//!      ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                       subscriber_listener ──► SubscriberSet ──► LogWriter, ...
//! ```
//!
//! ### Lifecycle of one monitor
//! ```text
//! launch ──► RetryChain::run()
//!   loop {
//!     ├─► publish MonitorStarting{ attempt }
//!     ├─► run_once(task)             (panics become faults)
//!     │     ├─ Ok        ─► MonitorStopped, chain exits Completed
//!     │     ├─ Canceled  ─► MonitorStopped, chain exits Cancelled
//!     │     └─ Fail      ─► MonitorFailed
//!     │          ├─ failures ≤ 3 ─► RetryScheduled, sleep 3s (cancellable)
//!     │          └─ failures = 4 ─► ChainEscalated, chain exits Escalated
//!   }
//! supervisor: any chain exit ─► MonitorRelaunched, fresh RetryChain
//! ```
//!
//! ## Features
//! | Area              | Description                                             | Key types / traits                         |
//! |-------------------|---------------------------------------------------------|--------------------------------------------|
//! | **Supervision**   | Launch, relaunch and shut down monitors.                | [`Supervisor`], [`SupervisorBuilder`]      |
//! | **Retry**         | Bounded local retry with a fixed delay.                 | [`RetryPolicy`], [`RetryState`]            |
//! | **Monitors**      | Define monitors as trait objects or closures.           | [`Task`], [`TaskFn`], [`TaskRef`], [`TaskSpec`] |
//! | **Events**        | Observe every lifecycle step.                           | [`Event`], [`Subscribe`], [`LogWriter`]    |
//! | **Singleton**     | One supervisor per machine.                             | [`SingletonLock`]                          |
//! | **Errors**        | Typed errors for runtime, monitors and the lock.        | [`RuntimeError`], [`TaskError`], [`LockError`] |
//! | **Built-ins**     | Audio, battery, VPN and blue-light monitors.            | [`monitors`]                               |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use sysmonitor::{LogWriter, Supervisor, SupervisorConfig, TaskFn, TaskRef, TaskSpec};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = SupervisorConfig::default();
//!     let sup = Supervisor::builder(cfg.clone())
//!         .with_subscriber(Arc::new(LogWriter::new()))
//!         .build();
//!
//!     let clock: TaskRef = TaskFn::arc("clock", |ctx: CancellationToken| async move {
//!         ctx.cancelled().await;
//!         Ok(())
//!     });
//!
//!     // Stop after a moment instead of waiting for SIGINT.
//!     sup.run_until(
//!         vec![TaskSpec::with_defaults(clock, &cfg)],
//!         tokio::time::sleep(Duration::from_millis(10)),
//!     )
//!     .await?;
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod lock;
pub mod monitors;
mod policies;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use core::{ChainExit, Supervisor, SupervisorBuilder, SupervisorConfig};
pub use error::{LockError, RuntimeError, TaskError};
pub use events::{Bus, Event, EventKind};
pub use lock::{DEFAULT_LOCK_PATH, SingletonLock};
pub use policies::{MAX_RETRIES, RETRY_DELAY, RetryDecision, RetryPolicy, RetryState};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
pub use tasks::{Task, TaskFn, TaskRef, TaskSpec};
