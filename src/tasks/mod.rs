//! # Monitor abstractions and specifications.
//!
//! - [`Task`] - trait for implementing async cancelable monitors
//! - [`TaskFn`] - function-based monitor implementation
//! - [`TaskRef`] - shared reference to a monitor (`Arc<dyn Task>`)
//! - [`TaskSpec`] - specification bundling a monitor with its retry policy

mod spec;
mod task;
mod task_fn;

pub use spec::TaskSpec;
pub use task::{Task, TaskRef};
pub use task_fn::TaskFn;
