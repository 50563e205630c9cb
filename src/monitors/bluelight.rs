//! # Blue-light filter.
//!
//! Drives `hyprsunset` from a fixed daily schedule:
//!
//! ```text
//! 05:00  5500K
//! 06:00  off (pkill hyprsunset)
//! 16:00  6000K ─┐
//! 16:30  5625K  │ every 30 min, -375K per step,
//!  ...          │ never below 1000K
//! 22:30  1125K ─┘
//! ```
//!
//! On start the entry in effect now is applied; after that the monitor sleeps
//! until the next entry, wrapping past midnight.

use std::ffi::OsString;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime, NaiveTime, TimeDelta};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::sleep_or_cancel;
use crate::error::TaskError;
use crate::tasks::Task;

const DESCENT_START_HOUR: u32 = 16;
const DESCENT_END_HOUR: u32 = 22;
const INITIAL_TEMP: u32 = 6000;
const MINIMUM_TEMP: u32 = 1000;
const TEMP_DECREASE_PER_STEP: u32 = 375;
const STEP_MINUTES: u32 = 30;

/// Temperature of the evening descent at `hour:minute`.
pub fn calculate_temperature(hour: u32, minute: u32) -> u32 {
    if hour < DESCENT_START_HOUR {
        return INITIAL_TEMP;
    }
    let steps = ((hour - DESCENT_START_HOUR) * 60 + minute) / STEP_MINUTES;
    INITIAL_TEMP
        .saturating_sub(steps * TEMP_DECREASE_PER_STEP)
        .max(MINIMUM_TEMP)
}

/// One schedule entry; `None` turns the filter off.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchedulePoint {
    pub at: NaiveTime,
    pub temperature: Option<u32>,
}

/// Non-empty daily schedule, sorted by time of day.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Schedule {
    points: Vec<SchedulePoint>,
}

impl Default for Schedule {
    fn default() -> Self {
        let fixed = [(5, 0, Some(5500)), (6, 0, None)];
        let descent = (DESCENT_START_HOUR..=DESCENT_END_HOUR)
            .flat_map(|h| (0..60).step_by(STEP_MINUTES as usize).map(move |m| (h, m)))
            .map(|(h, m)| (h, m, Some(calculate_temperature(h, m))));

        let points = fixed
            .into_iter()
            .chain(descent)
            .filter_map(|(h, m, temperature)| {
                NaiveTime::from_hms_opt(h, m, 0).map(|at| SchedulePoint { at, temperature })
            })
            .collect();
        Self { points }
    }
}

impl Schedule {
    /// Sorts `points`; `None` when empty.
    pub fn new(mut points: Vec<SchedulePoint>) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        points.sort_by_key(|p| p.at);
        Some(Self { points })
    }

    pub fn points(&self) -> &[SchedulePoint] {
        &self.points
    }

    /// Entry in effect at `t`: the latest one not after `t`, else yesterday's last.
    pub fn active_at(&self, t: NaiveTime) -> &SchedulePoint {
        let i = self.points.partition_point(|p| p.at <= t);
        let idx = if i == 0 { self.points.len() - 1 } else { i - 1 };
        &self.points[idx]
    }

    /// First entry strictly after `t`, else tomorrow's first.
    pub fn next_after(&self, t: NaiveTime) -> &SchedulePoint {
        let i = self.points.partition_point(|p| p.at <= t);
        &self.points[i % self.points.len()]
    }
}

/// Time from `now` to the next occurrence of `at` (today or tomorrow).
fn until(now: NaiveDateTime, at: NaiveTime) -> Duration {
    let mut target = now.date().and_time(at);
    if target <= now {
        target += TimeDelta::days(1);
    }
    (target - now).to_std().unwrap_or_default()
}

/// Applies the schedule through `hyprsunset`.
pub struct BlueLightMonitor {
    schedule: Schedule,
    hyprsunset: OsString,
    pkill: OsString,
}

impl BlueLightMonitor {
    pub fn new(schedule: Schedule) -> Self {
        Self {
            schedule,
            hyprsunset: OsString::from("hyprsunset"),
            pkill: OsString::from("pkill"),
        }
    }

    /// Overrides the `hyprsunset` and `pkill` executables.
    pub fn with_commands(mut self, hyprsunset: impl Into<OsString>, pkill: impl Into<OsString>) -> Self {
        self.hyprsunset = hyprsunset.into();
        self.pkill = pkill.into();
        self
    }

    /// Stops any running filter, then starts one at the point's temperature.
    async fn apply(&self, point: &SchedulePoint) {
        let killed = Command::new(&self.pkill)
            .arg(&self.hyprsunset)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
        if let Err(e) = killed {
            warn!(error = %e, "pkill unavailable");
        }

        let Some(temperature) = point.temperature else {
            info!(at = %point.at, "blue-light filter off");
            return;
        };

        // Detached: hyprsunset keeps running until the next change.
        let spawned = Command::new(&self.hyprsunset)
            .arg("--temperature")
            .arg(temperature.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        match spawned {
            Ok(_) => info!(at = %point.at, temperature, "blue-light filter set"),
            Err(e) => warn!(error = %e, temperature, "failed to start hyprsunset"),
        }
    }
}

#[async_trait]
impl Task for BlueLightMonitor {
    fn name(&self) -> &str {
        "bluelight"
    }

    async fn run(&self, ctx: CancellationToken) -> Result<(), TaskError> {
        let now = Local::now().naive_local();
        self.apply(self.schedule.active_at(now.time())).await;

        loop {
            let now = Local::now().naive_local();
            let next = self.schedule.next_after(now.time());
            let wait = until(now, next.at);
            debug!(next = %next.at, wait_secs = wait.as_secs(), "waiting for next filter change");

            sleep_or_cancel(&ctx, wait).await?;
            self.apply(next).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn descent_is_linear_with_floor() {
        assert_eq!(calculate_temperature(12, 0), 6000);
        assert_eq!(calculate_temperature(16, 0), 6000);
        assert_eq!(calculate_temperature(16, 30), 5625);
        assert_eq!(calculate_temperature(22, 30), 1125);
        assert_eq!(calculate_temperature(23, 30), 1000);
    }

    #[test]
    fn default_schedule_layout() {
        let s = Schedule::default();
        let points = s.points();
        assert_eq!(points.len(), 2 + 14);
        assert_eq!(points[0], SchedulePoint { at: hm(5, 0), temperature: Some(5500) });
        assert_eq!(points[1], SchedulePoint { at: hm(6, 0), temperature: None });
        assert_eq!(points[2].at, hm(16, 0));
        assert_eq!(points.last().unwrap().at, hm(22, 30));
        assert!(points.windows(2).all(|w| w[0].at < w[1].at));
    }

    #[test]
    fn active_entry_wraps_midnight() {
        let s = Schedule::default();
        assert_eq!(s.active_at(hm(3, 0)).temperature, Some(1125));
        assert_eq!(s.active_at(hm(5, 0)).temperature, Some(5500));
        assert_eq!(s.active_at(hm(5, 59)).temperature, Some(5500));
        assert_eq!(s.active_at(hm(12, 0)).temperature, None);
        assert_eq!(s.active_at(hm(17, 10)).temperature, Some(5250));
        assert_eq!(s.active_at(hm(23, 0)).temperature, Some(1125));
    }

    #[test]
    fn next_entry_wraps_midnight() {
        let s = Schedule::default();
        assert_eq!(s.next_after(hm(4, 0)).at, hm(5, 0));
        assert_eq!(s.next_after(hm(5, 0)).at, hm(6, 0));
        assert_eq!(s.next_after(hm(12, 0)).at, hm(16, 0));
        assert_eq!(s.next_after(hm(22, 45)).at, hm(5, 0));
    }

    #[test]
    fn wait_rolls_over_to_tomorrow() {
        let day = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let now = day.and_time(hm(23, 0));
        assert_eq!(until(now, hm(5, 0)), Duration::from_secs(6 * 3600));

        let now = day.and_time(hm(5, 0));
        assert_eq!(until(now, hm(5, 0)), Duration::from_secs(24 * 3600));
        assert_eq!(until(now, hm(6, 0)), Duration::from_secs(3600));
    }

    #[test]
    fn custom_schedule_is_sorted_and_non_empty() {
        assert!(Schedule::new(Vec::new()).is_none());
        let s = Schedule::new(vec![
            SchedulePoint { at: hm(20, 0), temperature: Some(3000) },
            SchedulePoint { at: hm(7, 0), temperature: None },
        ])
        .unwrap();
        assert_eq!(s.points()[0].at, hm(7, 0));
        assert_eq!(s.active_at(hm(1, 0)).temperature, Some(3000));
    }

    #[tokio::test]
    async fn runs_until_cancelled() {
        let monitor = BlueLightMonitor::new(Schedule::default()).with_commands("true", "true");
        let ctx = CancellationToken::new();
        let stop = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            stop.cancel();
        });
        assert_eq!(monitor.run(ctx).await, Err(TaskError::Canceled));
    }
}
