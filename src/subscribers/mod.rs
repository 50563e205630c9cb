//! # Event subscribers.
//!
//! ```text
//! RetryChain ── publish(Event) ──► Bus ──► supervisor listener ──► SubscriberSet
//!                                                                   ├──► LogWriter
//!                                                                   └──► custom ...
//! ```
//!
//! - [`Subscribe`] the extension point
//! - [`SubscriberSet`] per-subscriber queues and workers
//! - [`LogWriter`] structured `tracing` output

mod log;
mod set;
mod subscribe;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
