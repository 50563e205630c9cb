//! Scripted stand-ins for the external commands monitors drive.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

use tempfile::TempDir;

use super::eww::Eww;
use super::notify::Notifier;

/// A directory of `sh` scripts plus the logs they write.
pub(crate) struct FakeBins {
    dir: TempDir,
}

impl FakeBins {
    pub(crate) fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub(crate) fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Writes an executable script; `$DIR` names the fake directory.
    pub(crate) fn script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.path(name);
        let text = format!("#!/bin/sh\nDIR='{}'\n{body}\n", self.dir.path().display());
        fs::write(&path, text).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    pub(crate) fn file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, contents).unwrap();
        path
    }

    /// `eww` that logs every argument on its own line.
    pub(crate) fn eww(&self) -> Eww {
        Eww::default().with_binary(self.script("eww", &record("eww.log")))
    }

    /// `notify-send` that logs every argument on its own line.
    pub(crate) fn notifier(&self) -> Notifier {
        Notifier::default().with_binary(self.script("notify-send", &record("notify.log")))
    }

    /// Lines of a log written by one of the scripts.
    pub(crate) fn log(&self, name: &str) -> Vec<String> {
        fs::read_to_string(self.path(name))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

fn record(log: &str) -> String {
    format!("for a in \"$@\"; do printf '%s\\n' \"$a\"; done >> \"$DIR/{log}\"")
}
