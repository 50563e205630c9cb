//! # Mullvad VPN monitor.
//!
//! `mullvad status --json listen` prints one JSON object per state change:
//!
//! ```text
//! {"state":"connected","details":{"endpoint":{..},"location":{"city":"Oslo",..}}}
//! {"state":"disconnected","details":{"location":null,"locked_down":false}}
//! {"state":"error","details":{"cause":{"reason":"is_offline"},"block_failure":null}}
//! ```
//!
//! Each one is published as `vpn-status`. A `disconnected` report is
//! re-checked once a second later because the daemon briefly reports it while
//! switching relays.

use std::ffi::OsString;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::eww::Eww;
use super::notify::{Notification, Notifier, Urgency};
use super::{capture, finish, sleep_or_cancel};
use crate::error::TaskError;
use crate::tasks::Task;

const RECHECK_DELAY: Duration = Duration::from_secs(1);

/// Relay or local location reported by the daemon.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub ipv4: Option<String>,
    #[serde(default)]
    pub ipv6: Option<String>,
    pub country: String,
    pub city: String,
    #[serde(default)]
    pub hostname: Option<String>,
}

impl Location {
    fn describe(&self) -> String {
        let ip = self
            .ipv4
            .as_deref()
            .or(self.ipv6.as_deref())
            .unwrap_or("N/A");
        format!("{}, {} [{ip}]", self.city, self.country)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ConnectedDetails {
    pub location: Location,
    #[serde(default)]
    pub feature_indicators: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct DisconnectedDetails {
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub locked_down: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ErrorCause {
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ErrorDetails {
    pub cause: ErrorCause,
    #[serde(default)]
    pub block_failure: Option<serde_json::Value>,
}

/// Tunnel state, tagged by the `state` field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MullvadStatus {
    Connected(ConnectedDetails),
    Connecting,
    Disconnected(DisconnectedDetails),
    Disconnecting,
    Error(ErrorDetails),
}

#[derive(Deserialize)]
struct RawStatus {
    state: String,
    #[serde(default)]
    details: serde_json::Value,
}

impl MullvadStatus {
    /// Parses one line of `mullvad status --json`.
    pub fn parse(line: &str) -> Result<Self, TaskError> {
        let raw: RawStatus = serde_json::from_str(line.trim())?;
        let status = match raw.state.as_str() {
            "connected" => MullvadStatus::Connected(serde_json::from_value(raw.details)?),
            "connecting" => MullvadStatus::Connecting,
            "disconnected" if raw.details.is_object() => {
                MullvadStatus::Disconnected(serde_json::from_value(raw.details)?)
            }
            "disconnected" => MullvadStatus::Disconnected(DisconnectedDetails::default()),
            "disconnecting" => MullvadStatus::Disconnecting,
            "error" => MullvadStatus::Error(serde_json::from_value(raw.details)?),
            other => return Err(TaskError::fail(format!("unknown vpn state {other:?}"))),
        };
        Ok(status)
    }

    /// The `state` tag.
    pub fn state(&self) -> &'static str {
        match self {
            MullvadStatus::Connected(_) => "connected",
            MullvadStatus::Connecting => "connecting",
            MullvadStatus::Disconnected(_) => "disconnected",
            MullvadStatus::Disconnecting => "disconnecting",
            MullvadStatus::Error(_) => "error",
        }
    }
}

/// The `vpn-status` text.
pub fn format_status(status: &MullvadStatus) -> String {
    match status {
        MullvadStatus::Connected(d) => format!("Connected: {}", d.location.describe()),
        MullvadStatus::Connecting => "Connecting...".to_string(),
        MullvadStatus::Disconnected(DisconnectedDetails {
            location: Some(loc), ..
        }) => format!("Disconnected: {}", loc.describe()),
        MullvadStatus::Disconnected(_) => "Disconnected".to_string(),
        MullvadStatus::Disconnecting => "Disconnecting...".to_string(),
        MullvadStatus::Error(e) if e.cause.reason == "is_offline" => "Offline".to_string(),
        MullvadStatus::Error(e) => format!("Error: {}", e.cause.reason),
    }
}

/// Publishes `vpn-status` and notifies on state changes.
pub struct VpnMonitor {
    mullvad: OsString,
    eww: Eww,
    notifier: Notifier,
}

impl VpnMonitor {
    pub fn new(eww: Eww, notifier: Notifier) -> Self {
        Self {
            mullvad: OsString::from("mullvad"),
            eww,
            notifier,
        }
    }

    /// Overrides the `mullvad` executable.
    pub fn with_mullvad(mut self, mullvad: impl Into<OsString>) -> Self {
        self.mullvad = mullvad.into();
        self
    }

    async fn publish(&self, status: &MullvadStatus) {
        let text = format_status(status);
        match self.eww.update(&[("vpn-status", text.as_str())]).await {
            Ok(()) => debug!(%text, "vpn status published"),
            Err(e) => warn!(error = %e, "failed to publish vpn status"),
        }
    }

    /// Re-checks a `disconnected` report after a short pause.
    async fn recheck(&self, ctx: &CancellationToken, status: MullvadStatus) -> Result<MullvadStatus, TaskError> {
        info!("vpn disconnected, re-checking in 1 second");
        sleep_or_cancel(ctx, RECHECK_DELAY).await?;

        let fresh = capture(&self.mullvad, &["status", "--json"])
            .await
            .and_then(|out| MullvadStatus::parse(&out));
        match fresh {
            Ok(fresh) => {
                info!(state = fresh.state(), "vpn status after re-check");
                self.publish(&fresh).await;
                Ok(fresh)
            }
            Err(e) => {
                warn!(error = %e, "vpn re-check failed");
                Ok(status)
            }
        }
    }
}

#[async_trait]
impl Task for VpnMonitor {
    fn name(&self) -> &str {
        "vpn"
    }

    async fn run(&self, ctx: CancellationToken) -> Result<(), TaskError> {
        let mut child = Command::new(&self.mullvad)
            .args(["status", "--json", "listen"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| TaskError::fail(format!("mullvad status listen: {e}")))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| TaskError::fail("mullvad status listen: stdout not captured"))?;
        let mut lines = BufReader::new(stdout).lines();

        info!("monitoring mullvad vpn status");
        let mut prev: Option<&'static str> = None;

        loop {
            let line = tokio::select! {
                _ = ctx.cancelled() => return Err(TaskError::Canceled),
                line = lines.next_line() => line?,
            };
            let Some(line) = line else {
                finish(&mut child, "mullvad status listen").await?;
                info!("mullvad status listen closed");
                return Ok(());
            };

            let mut status = match MullvadStatus::parse(&line) {
                Ok(status) => status,
                Err(e) => {
                    warn!(error = %e, "unparseable vpn status line");
                    continue;
                }
            };
            info!(state = status.state(), "vpn status");
            self.publish(&status).await;

            if matches!(status, MullvadStatus::Disconnected(_)) {
                status = self.recheck(&ctx, status).await?;
            }

            let state = status.state();
            if prev.is_some_and(|p| p != state) {
                self.notifier
                    .send(&Notification::new(
                        Urgency::Normal,
                        Duration::from_secs(5),
                        "VPN status change",
                        format!("New state: {state}"),
                    ))
                    .await;
            }
            prev = Some(state);
        }
    }
}
