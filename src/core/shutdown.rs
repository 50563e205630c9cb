//! # OS signal handling.
//!
//! Provides [`ShutdownSignal`], installed once before the monitors start so a
//! registration failure surfaces as [`RuntimeError::Signal`](crate::RuntimeError::Signal)
//! instead of a silently ignored signal.
//!
//! ## Signals
//! **Unix platforms:**
//! - `SIGINT` (Ctrl-C in terminal)
//! - `SIGTERM` (default kill signal, used by systemd and Hyprland `exec-once` teardown)
//!
//! **Other platforms:**
//! - `Ctrl-C` via [`tokio::signal::ctrl_c`]

/// Installed SIGINT/SIGTERM listeners.
#[cfg(unix)]
pub struct ShutdownSignal {
    sigint: tokio::signal::unix::Signal,
    sigterm: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl ShutdownSignal {
    /// Registers the listeners. From now on the signals no longer kill the process.
    pub fn install() -> std::io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            sigint: signal(SignalKind::interrupt())?,
            sigterm: signal(SignalKind::terminate())?,
        })
    }

    /// Completes when either signal is delivered.
    pub async fn recv(&mut self) {
        tokio::select! {
            _ = self.sigint.recv()  => {},
            _ = self.sigterm.recv() => {},
        }
    }
}

/// Installed Ctrl-C listener.
#[cfg(not(unix))]
pub struct ShutdownSignal;

#[cfg(not(unix))]
impl ShutdownSignal {
    /// Nothing to register up front.
    pub fn install() -> std::io::Result<Self> {
        Ok(Self)
    }

    /// Completes on Ctrl-C.
    pub async fn recv(&mut self) {
        let _ = tokio::signal::ctrl_c().await;
    }
}
