//! `eww update` client: the status bar's variable store.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::Command;

use crate::error::TaskError;

/// Publishes `name=value` pairs to a running eww daemon.
#[derive(Clone, Debug)]
pub struct Eww {
    binary: OsString,
    config_dir: Option<PathBuf>,
}

impl Default for Eww {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Eww {
    /// Uses `eww` from `PATH`, optionally with `--config <dir>`.
    pub fn new(config_dir: Option<PathBuf>) -> Self {
        Self {
            binary: OsString::from("eww"),
            config_dir,
        }
    }

    /// Overrides the executable.
    pub fn with_binary(mut self, binary: impl Into<OsString>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Command-line arguments for one update.
    pub fn update_args(&self, vars: &[(&str, &str)]) -> Vec<OsString> {
        let mut args = Vec::with_capacity(vars.len() + 3);
        if let Some(dir) = &self.config_dir {
            args.push(OsString::from("--config"));
            args.push(dir.clone().into_os_string());
        }
        args.push(OsString::from("update"));
        args.extend(vars.iter().map(|(k, v)| OsString::from(format!("{k}={v}"))));
        args
    }

    /// Runs `eww update`; a non-zero exit is a fault.
    pub async fn update(&self, vars: &[(&str, &str)]) -> Result<(), TaskError> {
        let status = Command::new(&self.binary)
            .args(self.update_args(vars))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .status()
            .await
            .map_err(|e| TaskError::fail(format!("eww update: {e}")))?;

        if status.success() {
            Ok(())
        } else {
            Err(TaskError::fail(format!("eww update exited with {status}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_include_config_dir() {
        let eww = Eww::new(Some(PathBuf::from("/home/me/.config/eww")));
        let args = eww.update_args(&[("battery-info", "Full, 100%, 0.00W")]);
        assert_eq!(
            args,
            vec![
                OsString::from("--config"),
                OsString::from("/home/me/.config/eww"),
                OsString::from("update"),
                OsString::from("battery-info=Full, 100%, 0.00W"),
            ]
        );
    }

    #[test]
    fn several_vars_in_one_call() {
        let args = Eww::default().update_args(&[("a", "1"), ("b", "2")]);
        assert_eq!(args, vec!["update", "a=1", "b=2"]);
    }

    #[tokio::test]
    async fn failing_binary_is_a_fault() {
        let eww = Eww::default().with_binary("false");
        assert!(eww.update(&[("x", "y")]).await.is_err());
        let eww = Eww::default().with_binary("true");
        assert!(eww.update(&[("x", "y")]).await.is_ok());
    }
}
