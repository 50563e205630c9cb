//! Built-in monitors and their side channels.
//!
//! ## Contents
//! - [`AudioMonitor`] default sink/source via `pactl subscribe`
//! - [`PowerMonitor`] battery report from sysfs, low/full notifications
//! - [`VpnMonitor`] Mullvad connection state via `mullvad status --json listen`
//! - [`BlueLightMonitor`] time-of-day screen temperature via `hyprsunset`
//! - [`Eww`] and [`Notifier`] where monitors publish
//!
//! ## Wiring
//! ```text
//! MonitorSettings ──► table() ──► Vec<TaskRef> ──► Supervisor::run
//!                                   │
//!                                   └─ each monitor ──► eww update / notify-send
//! ```

mod audio;
mod bluelight;
mod eww;
#[cfg(test)]
mod fake;
mod notify;
mod power;
mod vpn;

use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::tasks::TaskRef;

pub use audio::{AudioDevice, AudioMonitor, AudioState, Volume, format_device_info};
pub use bluelight::{BlueLightMonitor, Schedule, SchedulePoint, calculate_temperature};
pub use eww::Eww;
pub use notify::{Notification, Notifier, Urgency};
pub use power::{
    BatteryState, BatteryStatus, DEFAULT_BATTERY_DIR, PowerAlerts, PowerMonitor, status_report,
};
pub use vpn::{
    ConnectedDetails, DisconnectedDetails, ErrorCause, ErrorDetails, Location, MullvadStatus,
    VpnMonitor, format_status,
};

/// Names of the built-in monitors, in launch order.
pub const MONITOR_NAMES: [&str; 4] = ["audio", "power", "vpn", "bluelight"];

/// Shared configuration for the built-in monitors.
#[derive(Clone, Debug)]
pub struct MonitorSettings {
    pub eww: Eww,
    pub notifier: Notifier,
    pub battery_dir: PathBuf,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            eww: Eww::default(),
            notifier: Notifier::default(),
            battery_dir: PathBuf::from(DEFAULT_BATTERY_DIR),
        }
    }
}

/// The static monitor table.
pub fn table(settings: &MonitorSettings) -> Vec<TaskRef> {
    vec![
        Arc::new(AudioMonitor::new(settings.eww.clone(), settings.notifier.clone())),
        Arc::new(PowerMonitor::new(
            settings.battery_dir.clone(),
            settings.eww.clone(),
            settings.notifier.clone(),
        )),
        Arc::new(VpnMonitor::new(settings.eww.clone(), settings.notifier.clone())),
        Arc::new(BlueLightMonitor::new(Schedule::default())),
    ]
}

/// Runs a command to completion and returns its stdout.
pub(crate) async fn capture(program: impl AsRef<OsStr>, args: &[&str]) -> Result<String, TaskError> {
    let program = program.as_ref();
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| TaskError::fail(format!("{}: {e}", program.to_string_lossy())))?;

    if !output.status.success() {
        return Err(TaskError::fail(format!(
            "{} {} exited with {}",
            program.to_string_lossy(),
            args.join(" "),
            output.status
        )));
    }
    String::from_utf8(output.stdout)
        .map_err(|e| TaskError::fail(format!("{}: {e}", program.to_string_lossy())))
}

/// Reaps a streaming child whose stdout reached EOF; a non-zero exit is a fault.
pub(crate) async fn finish(child: &mut Child, what: &str) -> Result<(), TaskError> {
    let status = child
        .wait()
        .await
        .map_err(|e| TaskError::fail(format!("{what}: {e}")))?;
    if status.success() {
        Ok(())
    } else {
        Err(TaskError::fail(format!("{what} exited with {status}")))
    }
}

/// Sleeps for `d` unless `ctx` is cancelled first.
pub(crate) async fn sleep_or_cancel(ctx: &CancellationToken, d: Duration) -> Result<(), TaskError> {
    tokio::select! {
        _ = tokio::time::sleep(d) => Ok(()),
        _ = ctx.cancelled() => Err(TaskError::Canceled),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_matches_names() {
        let names: Vec<String> = table(&MonitorSettings::default())
            .iter()
            .map(|t| t.name().to_string())
            .collect();
        assert_eq!(names, MONITOR_NAMES);
    }

    #[tokio::test]
    async fn capture_reports_exit_status() {
        assert_eq!(capture("echo", &["hi"]).await.unwrap(), "hi\n");
        let err = capture("false", &[]).await.unwrap_err();
        assert!(err.to_string().contains("false"));
    }

    #[tokio::test]
    async fn finish_checks_exit_status() {
        let mut ok = Command::new("true").spawn().unwrap();
        assert_eq!(finish(&mut ok, "true").await, Ok(()));

        let mut bad = Command::new("false").spawn().unwrap();
        let err = finish(&mut bad, "false").await.unwrap_err();
        assert!(err.to_string().contains("false exited with"));
    }

    #[tokio::test(start_paused = true)]
    async fn sleep_is_cancellable() {
        let ctx = CancellationToken::new();
        ctx.cancel();
        let res = sleep_or_cancel(&ctx, Duration::from_secs(3600)).await;
        assert_eq!(res, Err(TaskError::Canceled));
    }
}
