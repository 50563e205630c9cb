//! Runtime core: orchestration and lifecycle.
//!
//! The public API from this module is [`Supervisor`] and its configuration.
//!
//! Internal modules:
//! - [`runner`]: executes one attempt with panic isolation and event publishing;
//! - [`chain`]: bounded local retry around one monitor;
//! - [`registry`]: name-keyed in-flight chains, owned by the control loop;
//! - [`supervisor`]: launches, relaunches and shuts down;
//! - [`shutdown`]: SIGINT/SIGTERM handling.

mod builder;
mod chain;
mod config;
mod registry;
mod runner;
mod shutdown;
mod supervisor;

pub use builder::SupervisorBuilder;
pub use chain::ChainExit;
pub use config::SupervisorConfig;
pub use supervisor::Supervisor;

pub(crate) use runner::panic_message;
