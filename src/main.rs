mod cli;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use sysmonitor::monitors::{self, Eww, MonitorSettings, Notifier};
use sysmonitor::{
    LockError, LogWriter, RuntimeError, SingletonLock, Supervisor, SupervisorConfig, TaskSpec,
};

use crate::cli::Cli;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stdout)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_logging();

    let lock = match SingletonLock::acquire(&cli.lock_file) {
        Ok(lock) => lock,
        Err(LockError::AlreadyRunning { path, pid }) => {
            error!(path = %path.display(), ?pid, "another instance is already running");
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e).context("failed to acquire the singleton lock"),
    };

    let cfg = SupervisorConfig {
        grace: cli.grace(),
        ..SupervisorConfig::default()
    };
    let settings = MonitorSettings {
        eww: Eww::new(cli.eww_config.clone()),
        notifier: Notifier::default(),
        battery_dir: cli.battery_dir.clone(),
    };
    let specs: Vec<TaskSpec> = monitors::table(&settings)
        .into_iter()
        .filter(|m| cli.selects(m.name()))
        .map(|m| TaskSpec::with_defaults(m, &cfg))
        .collect();

    info!(
        monitors = ?specs.iter().map(TaskSpec::name).collect::<Vec<_>>(),
        "starting supervisor"
    );
    let res = Supervisor::builder(cfg)
        .with_subscriber(Arc::new(LogWriter::new()))
        .build()
        .run(specs)
        .await;

    if let Err(e) = lock.release() {
        warn!(error = %e, "failed to remove lock file");
    }

    match res {
        Ok(()) => info!("all monitors stopped"),
        Err(e @ RuntimeError::GraceExceeded { .. }) => warn!(error = %e, "shutdown left monitors behind"),
        Err(e) => return Err(e).context("supervisor failed"),
    }
    Ok(ExitCode::SUCCESS)
}
