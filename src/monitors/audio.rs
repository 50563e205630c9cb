//! # Audio monitor.
//!
//! Follows `pactl subscribe` and, on every `change` line, re-reads the default
//! sink and source. Each device is rendered as its (cropped) description plus
//! an 8-cell volume bar:
//!
//! ```text
//! ♫ Built-in Audio Analog Stereo: [▁▂▃     ]
//! 🎙 Some Very Long USB Micropho...: [  MUTE  ]
//! ```

use std::ffi::OsString;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::eww::Eww;
use super::notify::{Notification, Notifier, Urgency};
use super::{capture, finish, sleep_or_cancel};
use crate::error::TaskError;
use crate::tasks::Task;

const BLOCKS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
const BAR_WIDTH: usize = 8;
const MAX_DESCRIPTION: usize = 30;
const CROPPED_DESCRIPTION: usize = 27;
const INITIAL_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Per-channel volume as printed by `pactl --format=json`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Volume {
    #[serde(default)]
    pub value: i64,
    #[serde(default = "zero_percent")]
    pub value_percent: String,
    #[serde(default)]
    pub db: String,
}

fn zero_percent() -> String {
    "0%".to_string()
}

impl Volume {
    /// `"45%"` → `45`.
    pub fn percent(&self) -> u32 {
        self.value_percent
            .trim()
            .trim_end_matches('%')
            .trim()
            .parse()
            .unwrap_or(0)
    }
}

/// One sink or source.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct AudioDevice {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "channel_map")]
    pub channel_map: Vec<String>,
    #[serde(default)]
    pub mute: bool,
    #[serde(default)]
    pub volume: IndexMap<String, Volume>,
}

/// Older `pactl` prints `channel_map` as `"front-left,front-right"`.
fn channel_map<'de, D>(d: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<String>),
        Joined(String),
    }

    Ok(match Raw::deserialize(d)? {
        Raw::List(v) => v,
        Raw::Joined(s) => s.split(',').map(|c| c.trim().to_string()).collect(),
    })
}

impl AudioDevice {
    /// Volume of the first channel, in percent.
    pub fn volume_percent(&self) -> u32 {
        self.volume.values().next().map(Volume::percent).unwrap_or(0)
    }
}

fn volume_bar(device: &AudioDevice) -> String {
    if device.mute {
        return "  MUTE  ".to_string();
    }
    let filled = (device.volume_percent() as usize).div_ceil(18).min(BAR_WIDTH);
    let bar: String = BLOCKS[..filled].iter().collect();
    format!("{bar:<BAR_WIDTH$}")
}

fn cropped_description(description: &str) -> String {
    if description.chars().count() > MAX_DESCRIPTION {
        let head: String = description.chars().take(CROPPED_DESCRIPTION).collect();
        format!("{head:.<MAX_DESCRIPTION$}")
    } else {
        description.to_string()
    }
}

/// `<description>: [<bar>]`, or `N/A` without a device.
pub fn format_device_info(device: Option<&AudioDevice>) -> String {
    match device {
        Some(d) => format!("{}: [{}]", cropped_description(&d.description), volume_bar(d)),
        None => "N/A".to_string(),
    }
}

/// The default sink and source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioState {
    pub sink: AudioDevice,
    pub source: AudioDevice,
}

impl AudioState {
    /// Picks the named defaults out of the device list.
    pub fn select(devices: Vec<AudioDevice>, sink: &str, source: &str) -> Result<Self, TaskError> {
        let find = |name: &str, kind: &str| {
            devices
                .iter()
                .find(|d| d.name == name)
                .cloned()
                .ok_or_else(|| TaskError::fail(format!("default {kind} {name:?} not found")))
        };
        Ok(Self {
            sink: find(sink, "sink")?,
            source: find(source, "source")?,
        })
    }

    /// Parses the device lists and picks the defaults out of them.
    fn from_snapshot(snapshot: PactlSnapshot) -> Result<Self, TaskError> {
        let mut devices: Vec<AudioDevice> = serde_json::from_str(&snapshot.sources)?;
        let sinks: Vec<AudioDevice> = serde_json::from_str(&snapshot.sinks)?;
        devices.extend(sinks);

        Self::select(devices, snapshot.sink.trim(), snapshot.source.trim())
    }

    fn eww_vars(&self) -> [(&'static str, String); 2] {
        [
            ("sink-settings", format!("♫ {}", format_device_info(Some(&self.sink)))),
            ("source-settings", format!("🎙 {}", format_device_info(Some(&self.source)))),
        ]
    }
}

/// Raw `pactl` answers for one refresh.
struct PactlSnapshot {
    sink: String,
    source: String,
    sources: String,
    sinks: String,
}

/// Publishes `sink-settings` and `source-settings`.
pub struct AudioMonitor {
    pactl: OsString,
    eww: Eww,
    notifier: Notifier,
}

impl AudioMonitor {
    pub fn new(eww: Eww, notifier: Notifier) -> Self {
        Self {
            pactl: OsString::from("pactl"),
            eww,
            notifier,
        }
    }

    /// Overrides the `pactl` executable.
    pub fn with_pactl(mut self, pactl: impl Into<OsString>) -> Self {
        self.pactl = pactl.into();
        self
    }

    /// Runs the four `pactl` queries; only command failures surface here.
    async fn snapshot(&self) -> Result<PactlSnapshot, TaskError> {
        Ok(PactlSnapshot {
            sink: capture(&self.pactl, &["get-default-sink"]).await?,
            source: capture(&self.pactl, &["get-default-source"]).await?,
            sources: capture(&self.pactl, &["--format=json", "list", "sources"]).await?,
            sinks: capture(&self.pactl, &["--format=json", "list", "sinks"]).await?,
        })
    }

    /// Queries `pactl` for the current defaults.
    pub async fn query(&self) -> Result<AudioState, TaskError> {
        AudioState::from_snapshot(self.snapshot().await?)
    }

    async fn publish(&self, audio: &AudioState) {
        let vars = audio.eww_vars();
        let pairs: Vec<(&str, &str)> = vars.iter().map(|(k, v)| (*k, v.as_str())).collect();
        match self.eww.update(&pairs).await {
            Ok(()) => debug!(sink = %vars[0].1, source = %vars[1].1, "audio settings published"),
            Err(e) => warn!(error = %e, "failed to publish audio settings"),
        }
    }

    async fn announce_device_changes(&self, old: &AudioState, new: &AudioState) {
        if new.source.name != old.source.name {
            info!(source = %new.source.name, "audio source device changed");
            self.notifier
                .send(&Notification::new(
                    Urgency::Normal,
                    Duration::from_secs(5),
                    "Audio source device changed",
                    new.source.description.clone(),
                ))
                .await;
        }
        if new.sink.name != old.sink.name {
            info!(sink = %new.sink.name, "audio sink device changed");
            self.notifier
                .send(&Notification::new(
                    Urgency::Normal,
                    Duration::from_secs(5),
                    "Audio sink device changed",
                    new.sink.description.clone(),
                ))
                .await;
        }
    }
}

#[async_trait]
impl Task for AudioMonitor {
    fn name(&self) -> &str {
        "audio"
    }

    async fn run(&self, ctx: CancellationToken) -> Result<(), TaskError> {
        let mut child = Command::new(&self.pactl)
            .arg("subscribe")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| TaskError::fail(format!("pactl subscribe: {e}")))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| TaskError::fail("pactl subscribe: stdout not captured"))?;
        let mut lines = BufReader::new(stdout).lines();

        info!("monitoring for audio changes");

        // Devices may still be appearing right after login.
        let mut audio = match self.query().await {
            Ok(audio) => audio,
            Err(e) => {
                warn!(error = %e, "audio devices not ready, retrying");
                sleep_or_cancel(&ctx, INITIAL_RETRY_DELAY).await?;
                self.query().await?
            }
        };
        self.publish(&audio).await;

        loop {
            let line = tokio::select! {
                _ = ctx.cancelled() => return Err(TaskError::Canceled),
                line = lines.next_line() => line?,
            };
            let Some(line) = line else {
                finish(&mut child, "pactl subscribe").await?;
                info!("pactl subscribe closed");
                return Ok(());
            };
            if !line.contains("change") {
                continue;
            }

            // A failed command is transient; bad output or a vanished default is not.
            let snapshot = match self.snapshot().await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!(error = %e, "error updating audio devices");
                    continue;
                }
            };
            let new = AudioState::from_snapshot(snapshot)?;
            if new != audio {
                self.announce_device_changes(&audio, &new).await;
                audio = new;
                self.publish(&audio).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitors::fake::FakeBins;

    const SINKS: &str = r#"[
        {
            "state": "RUNNING",
            "name": "alsa_output.pci-0000_00_1f.3.analog-stereo",
            "description": "Built-in Audio Analog Stereo",
            "channel_map": "front-left,front-right",
            "mute": false,
            "volume": {
                "front-left": {"value": 29491, "value_percent": "45%", "db": "-20.81 dB"},
                "front-right": {"value": 29491, "value_percent": "45%", "db": "-20.81 dB"}
            }
        },
        {
            "state": "SUSPENDED",
            "name": "bluez_output.headset",
            "description": "WH-1000XM4 Wireless Noise Cancelling Headphones",
            "channel_map": ["front-left", "front-right"],
            "mute": true,
            "volume": {
                "front-left": {"value": 65536, "value_percent": "100%", "db": "0.00 dB"}
            }
        }
    ]"#;

    fn devices() -> Vec<AudioDevice> {
        serde_json::from_str(SINKS).unwrap()
    }

    #[test]
    fn channel_map_accepts_both_shapes() {
        let d = devices();
        assert_eq!(d[0].channel_map, ["front-left", "front-right"]);
        assert_eq!(d[1].channel_map, ["front-left", "front-right"]);
    }

    #[test]
    fn renders_volume_bar() {
        let d = devices();
        // ceil(45 / 18) = 3 blocks, padded to 8 cells.
        assert_eq!(
            format_device_info(Some(&d[0])),
            "Built-in Audio Analog Stereo: [▁▂▃     ]"
        );
    }

    #[test]
    fn muted_and_cropped() {
        let d = devices();
        assert_eq!(
            format_device_info(Some(&d[1])),
            "WH-1000XM4 Wireless Noise C...: [  MUTE  ]"
        );
        assert_eq!(format_device_info(None), "N/A");
    }

    #[test]
    fn loud_volume_caps_at_eight_blocks() {
        let mut d = devices().remove(0);
        for v in d.volume.values_mut() {
            v.value_percent = "150%".to_string();
        }
        assert_eq!(volume_bar(&d), "▁▂▃▄▅▆▇█");

        d.volume.clear();
        assert_eq!(volume_bar(&d), "        ");
    }

    #[test]
    fn description_of_exactly_thirty_is_kept() {
        let thirty = "a".repeat(30);
        assert_eq!(cropped_description(&thirty), thirty);
        assert_eq!(cropped_description(&"b".repeat(31)), format!("{}...", "b".repeat(27)));
    }

    #[test]
    fn select_requires_both_defaults() {
        let state = AudioState::select(
            devices(),
            "alsa_output.pci-0000_00_1f.3.analog-stereo",
            "bluez_output.headset",
        )
        .unwrap();
        assert_eq!(state.sink.description, "Built-in Audio Analog Stereo");
        assert_eq!(
            state.eww_vars()[0].1,
            "♫ Built-in Audio Analog Stereo: [▁▂▃     ]"
        );

        let err = AudioState::select(devices(), "missing", "bluez_output.headset").unwrap_err();
        assert!(err.to_string().contains("default sink"));
    }

    #[test]
    fn first_channel_follows_json_order() {
        let d: AudioDevice = serde_json::from_str(
            r#"{
                "name": "usb",
                "description": "USB Speaker",
                "channel_map": "front-right,front-left",
                "volume": {
                    "front-right": {"value": 6554, "value_percent": "10%", "db": "-60.00 dB"},
                    "front-left": {"value": 58982, "value_percent": "90%", "db": "-2.75 dB"}
                }
            }"#,
        )
        .unwrap();
        assert_eq!(d.volume_percent(), 10);
        assert_eq!(volume_bar(&d), "▁       ");
    }

    const FAKE_SINKS: &str = r#"[
        {"name": "alsa_output.builtin", "description": "Speaker A", "mute": false,
         "volume": {"front-left": {"value_percent": "45%"}}},
        {"name": "bluez_output.headset", "description": "Speaker B", "mute": false,
         "volume": {"front-left": {"value_percent": "90%"}}}
    ]"#;

    const FAKE_SOURCES: &str = r#"[
        {"name": "alsa_input.builtin", "description": "Microphone", "mute": true, "volume": {}}
    ]"#;

    /// `pactl` whose `subscribe` prints one change event then exits with
    /// `subscribe_exit`, and whose second `get-default-sink` runs `later_sink`.
    fn fake_pactl(bins: &FakeBins, later_sink: &str, subscribe_exit: i32) -> AudioMonitor {
        bins.file("sinks.json", FAKE_SINKS);
        bins.file("sources.json", FAKE_SOURCES);
        let pactl = bins.script(
            "pactl",
            &format!(
                r#"case "$*" in
  subscribe)
    echo "Event 'change' on sink #56"
    exit {subscribe_exit} ;;
  get-default-sink)
    if [ -e "$DIR/queried" ]; then {later_sink}; fi
    touch "$DIR/queried"
    echo alsa_output.builtin ;;
  get-default-source) echo alsa_input.builtin ;;
  "--format=json list sources") cat "$DIR/sources.json" ;;
  "--format=json list sinks") cat "$DIR/sinks.json" ;;
  *) exit 2 ;;
esac"#
            ),
        );
        AudioMonitor::new(bins.eww(), bins.notifier()).with_pactl(pactl)
    }

    fn sink_updates(bins: &FakeBins) -> Vec<String> {
        bins.log("eww.log")
            .into_iter()
            .filter(|l| l.starts_with("sink-settings="))
            .collect()
    }

    #[tokio::test]
    async fn default_sink_change_is_announced() {
        let bins = FakeBins::new();
        let monitor = fake_pactl(&bins, "echo bluez_output.headset; exit 0", 0);

        monitor.run(CancellationToken::new()).await.unwrap();

        assert_eq!(
            sink_updates(&bins),
            [
                "sink-settings=♫ Speaker A: [▁▂▃     ]",
                "sink-settings=♫ Speaker B: [▁▂▃▄▅   ]",
            ]
        );
        assert!(bins.log("eww.log").contains(&"source-settings=🎙 Microphone: [  MUTE  ]".to_string()));
        assert_eq!(
            bins.log("notify.log"),
            ["-u", "normal", "-t", "5000", "Audio sink device changed", "Speaker B"]
        );
    }

    #[tokio::test]
    async fn unchanged_defaults_publish_once() {
        let bins = FakeBins::new();
        let monitor = fake_pactl(&bins, ":", 0);

        monitor.run(CancellationToken::new()).await.unwrap();

        assert_eq!(sink_updates(&bins).len(), 1);
        assert!(bins.log("notify.log").is_empty());
    }

    #[tokio::test]
    async fn vanished_default_ends_the_attempt() {
        let bins = FakeBins::new();
        let monitor = fake_pactl(&bins, "echo gone; exit 0", 0);

        let err = monitor.run(CancellationToken::new()).await.unwrap_err();
        assert!(err.to_string().contains(r#"default sink "gone" not found"#), "{err}");
        assert_eq!(sink_updates(&bins).len(), 1);
    }

    #[tokio::test]
    async fn failed_query_command_is_skipped() {
        let bins = FakeBins::new();
        let monitor = fake_pactl(&bins, "exit 1", 0);

        monitor.run(CancellationToken::new()).await.unwrap();

        assert_eq!(sink_updates(&bins).len(), 1);
        assert!(bins.log("notify.log").is_empty());
    }

    #[tokio::test]
    async fn subscribe_exit_status_is_checked() {
        let bins = FakeBins::new();
        let monitor = fake_pactl(&bins, ":", 3);

        let err = monitor.run(CancellationToken::new()).await.unwrap_err();
        assert!(err.to_string().contains("pactl subscribe exited"), "{err}");
    }
}
