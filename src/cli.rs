//! Command-line flags; each one can also come from the environment.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use clap::builder::PossibleValuesParser;
use sysmonitor::DEFAULT_LOCK_PATH;
use sysmonitor::monitors::{DEFAULT_BATTERY_DIR, MONITOR_NAMES};

#[derive(Parser, Debug)]
#[command(name = "sysmonitor", version, about = "Keeps the status-bar monitors running")]
pub struct Cli {
    /// Singleton marker file
    #[arg(long, env = "SYSMONITOR_LOCK_FILE", value_name = "FILE", default_value = DEFAULT_LOCK_PATH)]
    pub lock_file: PathBuf,

    /// eww configuration directory, passed as `eww --config`
    #[arg(long, env = "SYSMONITOR_EWW_CONFIG", value_name = "DIR")]
    pub eww_config: Option<PathBuf>,

    /// Battery directory under /sys/class/power_supply
    #[arg(long, env = "SYSMONITOR_BATTERY_DIR", value_name = "DIR", default_value = DEFAULT_BATTERY_DIR)]
    pub battery_dir: PathBuf,

    /// Seconds to wait for monitors to stop on shutdown
    #[arg(long, value_name = "SECS", default_value_t = 5)]
    pub grace_secs: u64,

    /// Run only this monitor (repeatable; default: all)
    #[arg(long = "monitor", value_name = "NAME", value_parser = PossibleValuesParser::new(MONITOR_NAMES))]
    pub monitors: Vec<String>,
}

impl Cli {
    pub fn grace(&self) -> Duration {
        Duration::from_secs(self.grace_secs)
    }

    /// Whether the monitor called `name` should run.
    pub fn selects(&self, name: &str) -> bool {
        self.monitors.is_empty() || self.monitors.iter().any(|m| m == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["sysmonitor"]).unwrap();
        assert_eq!(cli.grace(), Duration::from_secs(5));
        assert!(MONITOR_NAMES.iter().all(|m| cli.selects(m)));
    }

    #[test]
    fn monitor_filter_is_repeatable() {
        let cli = Cli::try_parse_from([
            "sysmonitor",
            "--monitor",
            "power",
            "--monitor",
            "vpn",
            "--grace-secs",
            "2",
            "--lock-file",
            "/run/user/1000/sysmonitor.lock",
        ])
        .unwrap();
        assert!(cli.selects("power") && cli.selects("vpn"));
        assert!(!cli.selects("audio"));
        assert_eq!(cli.grace(), Duration::from_secs(2));
        assert_eq!(cli.lock_file, PathBuf::from("/run/user/1000/sysmonitor.lock"));
    }

    #[test]
    fn unknown_monitor_is_rejected() {
        assert!(Cli::try_parse_from(["sysmonitor", "--monitor", "wifi"]).is_err());
    }
}
