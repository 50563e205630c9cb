//! # Battery monitor.
//!
//! Polls the kernel's power-supply attributes once a second and publishes a
//! one-line report as `battery-info`. [`PowerAlerts`] turns successive
//! readings into desktop notifications (state changes, low/critical charge,
//! almost full).

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::eww::Eww;
use super::notify::{Notification, Notifier, Urgency};
use super::sleep_or_cancel;
use crate::error::TaskError;
use crate::tasks::Task;

/// Default sysfs directory of the first battery.
pub const DEFAULT_BATTERY_DIR: &str = "/sys/class/power_supply/BAT0";

const POLL_INTERVAL: Duration = Duration::from_secs(1);
const ERROR_BACKOFF: Duration = Duration::from_secs(5);
const NOTIFICATION_COOLDOWN: Duration = Duration::from_secs(1);

/// Contents of the `status` attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatteryState {
    Charging,
    Discharging,
    Full,
    NotCharging,
    Unknown,
}

impl BatteryState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatteryState::Charging => "Charging",
            BatteryState::Discharging => "Discharging",
            BatteryState::Full => "Full",
            BatteryState::NotCharging => "Not charging",
            BatteryState::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for BatteryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BatteryState {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Charging" => Ok(BatteryState::Charging),
            "Discharging" => Ok(BatteryState::Discharging),
            "Full" => Ok(BatteryState::Full),
            "Not charging" => Ok(BatteryState::NotCharging),
            "Unknown" => Ok(BatteryState::Unknown),
            other => Err(TaskError::fail(format!("unknown battery state {other:?}"))),
        }
    }
}

/// One battery reading. Power in µW, energy in µWh.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatteryStatus {
    pub state: BatteryState,
    pub capacity: u32,
    pub power_now: u64,
    pub energy_now: u64,
    pub energy_full: u64,
}

impl BatteryStatus {
    /// Reads all attributes from a `power_supply` directory.
    pub async fn read(dir: &Path) -> Result<Self, TaskError> {
        Ok(Self {
            state: read_attr(dir, "status").await?.parse()?,
            capacity: read_number(dir, "capacity").await?,
            power_now: read_number(dir, "power_now").await?,
            energy_now: read_number(dir, "energy_now").await?,
            energy_full: read_number(dir, "energy_full").await?,
        })
    }
}

async fn read_attr(dir: &Path, name: &str) -> Result<String, TaskError> {
    let path = dir.join(name);
    let raw = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| TaskError::fail(format!("{}: {e}", path.display())))?;
    Ok(raw.trim().to_string())
}

async fn read_number<T>(dir: &Path, name: &str) -> Result<T, TaskError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw = read_attr(dir, name).await?;
    raw.parse()
        .map_err(|e| TaskError::fail(format!("{name}: {raw:?}: {e}")))
}

/// `(hours, minutes)` to move `energy` µWh at `power` µW.
fn remaining_time(energy: u64, power: u64) -> (u64, u64) {
    (energy / power, (energy % power * 60) / power)
}

/// The `battery-info` line for one reading.
pub fn status_report(status: &BatteryStatus) -> String {
    let watts = status.power_now as f64 / 1_000_000.0;
    let BatteryStatus {
        state, capacity, ..
    } = status;

    match state {
        BatteryState::Charging | BatteryState::Discharging if status.power_now == 0 => {
            format!("{state}, {capacity}%")
        }
        BatteryState::Charging => {
            let diff = status.energy_full.saturating_sub(status.energy_now);
            let (h, m) = remaining_time(diff, status.power_now);
            format!("{state}, {h:02}:{m:02} to fully charged, {capacity}%, +{watts:.2}W")
        }
        BatteryState::Discharging => {
            let (h, m) = remaining_time(status.energy_now, status.power_now);
            format!("{state}, {h:02}:{m:02} remaining, {capacity}%, -{watts:.2}W")
        }
        _ => format!("{state}, {capacity}%, {watts:.2}W"),
    }
}

/// Notification state carried between readings.
#[derive(Debug, Default)]
pub struct PowerAlerts {
    prev: Option<BatteryStatus>,
    full_notified: bool,
    low_notified: bool,
    critical_notified: bool,
    last_sent: Option<Instant>,
}

impl PowerAlerts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one reading; returns the notifications to show now.
    ///
    /// Candidates arriving within the cooldown of the previous one are
    /// dropped, but their flags still flip.
    pub fn update(&mut self, status: &BatteryStatus, now: Instant) -> Vec<Notification> {
        let mut out = Vec::new();
        self.state_change(status, now, &mut out);
        self.capacity_warnings(status, now, &mut out);
        self.almost_full(status, now, &mut out);
        self.prev = Some(*status);
        out
    }

    fn push(&mut self, now: Instant, n: Notification, out: &mut Vec<Notification>) {
        if let Some(last) = self.last_sent {
            if now.saturating_duration_since(last) < NOTIFICATION_COOLDOWN {
                debug!(title = %n.title, "notification suppressed by cooldown");
                return;
            }
        }
        self.last_sent = Some(now);
        out.push(n);
    }

    fn state_change(&mut self, status: &BatteryStatus, now: Instant, out: &mut Vec<Notification>) {
        let Some(prev) = self.prev else {
            return;
        };
        if prev.state == status.state {
            return;
        }
        let body = format!("Current capacity: {}%", status.capacity);
        match status.state {
            BatteryState::Charging => {
                let n = Notification::new(
                    Urgency::Normal,
                    Duration::from_secs(5),
                    "Battery is now charging",
                    body,
                );
                self.push(now, n, out);
                self.low_notified = false;
                self.critical_notified = false;
            }
            BatteryState::Discharging => {
                let n = Notification::new(
                    Urgency::Normal,
                    Duration::from_secs(5),
                    "Battery is now discharging",
                    body,
                );
                self.push(now, n, out);
            }
            _ => {}
        }
    }

    fn capacity_warnings(&mut self, status: &BatteryStatus, now: Instant, out: &mut Vec<Notification>) {
        if status.state != BatteryState::Discharging {
            return;
        }
        let body = format!("Battery is at {}%", status.capacity);
        if status.capacity <= 10 && !self.critical_notified {
            let n = Notification::new(
                Urgency::Critical,
                Duration::from_secs(20),
                "Battery critically low",
                body,
            );
            self.push(now, n, out);
            self.critical_notified = true;
            self.low_notified = true;
        } else if status.capacity <= 20 && !self.low_notified {
            let n = Notification::new(Urgency::Normal, Duration::from_secs(10), "Battery low", body);
            self.push(now, n, out);
            self.low_notified = true;
        } else if status.capacity > 20 {
            self.low_notified = false;
            self.critical_notified = false;
        }
    }

    fn almost_full(&mut self, status: &BatteryStatus, now: Instant, out: &mut Vec<Notification>) {
        if status.capacity >= 85 && status.state == BatteryState::Charging && !self.full_notified {
            let n = Notification::new(
                Urgency::Normal,
                Duration::from_secs(5),
                "Battery almost fully charged",
                format!("Current capacity: {}%", status.capacity),
            );
            self.push(now, n, out);
            self.full_notified = true;
        } else if status.capacity < 80 {
            self.full_notified = false;
        }
    }
}

/// Polls the battery and publishes `battery-info`.
pub struct PowerMonitor {
    battery_dir: PathBuf,
    eww: Eww,
    notifier: Notifier,
}

impl PowerMonitor {
    pub fn new(battery_dir: PathBuf, eww: Eww, notifier: Notifier) -> Self {
        Self {
            battery_dir,
            eww,
            notifier,
        }
    }

    async fn tick(&self, alerts: &mut PowerAlerts) -> Result<(), TaskError> {
        let status = BatteryStatus::read(&self.battery_dir).await?;
        for n in alerts.update(&status, Instant::now()) {
            info!(title = %n.title, body = %n.body, "battery notification");
            self.notifier.send(&n).await;
        }

        let report = status_report(&status);
        self.eww.update(&[("battery-info", report.as_str())]).await?;
        debug!(%report, "battery report published");
        Ok(())
    }
}

#[async_trait]
impl Task for PowerMonitor {
    fn name(&self) -> &str {
        "power"
    }

    /// Never faults on its own: read and publish errors are logged and the
    /// next poll is delayed instead.
    async fn run(&self, ctx: CancellationToken) -> Result<(), TaskError> {
        info!(dir = %self.battery_dir.display(), "monitoring for power changes");
        let mut alerts = PowerAlerts::new();

        loop {
            let wait = match self.tick(&mut alerts).await {
                Ok(()) => POLL_INTERVAL,
                Err(e) => {
                    warn!(error = %e, "power monitor loop error");
                    ERROR_BACKOFF
                }
            };
            sleep_or_cancel(&ctx, wait).await?;
        }
    }
}
