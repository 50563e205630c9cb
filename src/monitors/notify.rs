//! Desktop notifications through `notify-send`.

use std::ffi::OsString;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, warn};

/// `notify-send -u` levels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Urgency {
    Low,
    Normal,
    Critical,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Low => "low",
            Urgency::Normal => "normal",
            Urgency::Critical => "critical",
        }
    }
}

/// A notification waiting to be shown.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub urgency: Urgency,
    pub timeout: Duration,
    pub title: String,
    pub body: String,
}

impl Notification {
    pub fn new(urgency: Urgency, timeout: Duration, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            urgency,
            timeout,
            title: title.into(),
            body: body.into(),
        }
    }
}

/// Sends notifications; failures are logged and otherwise ignored.
#[derive(Clone, Debug)]
pub struct Notifier {
    binary: OsString,
}

impl Default for Notifier {
    fn default() -> Self {
        Self {
            binary: OsString::from("notify-send"),
        }
    }
}

impl Notifier {
    /// Overrides the executable.
    pub fn with_binary(mut self, binary: impl Into<OsString>) -> Self {
        self.binary = binary.into();
        self
    }

    pub async fn send(&self, n: &Notification) {
        let res = Command::new(&self.binary)
            .arg("-u")
            .arg(n.urgency.as_str())
            .arg("-t")
            .arg(n.timeout.as_millis().to_string())
            .arg(&n.title)
            .arg(&n.body)
            .stdin(Stdio::null())
            .status()
            .await;

        match res {
            Ok(status) if status.success() => debug!(title = %n.title, "notification sent"),
            Ok(status) => warn!(title = %n.title, %status, "notify-send failed"),
            Err(e) => warn!(title = %n.title, error = %e, "notify-send unavailable"),
        }
    }
}
