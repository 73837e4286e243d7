//! Process configuration: TOML file + compiled defaults.
//!
//! This is the *wiring* configuration of the panel process (paths to the
//! collaborator FIFO and files, audio player command, timing knobs). The
//! user-editable settings tree browsed on the display lives in
//! [`crate::settings`] and is persisted separately.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{PanelError, Result};

/// Full panel process configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PanelConfig {
    pub paths: PathsConfig,
    pub timing: TimingConfig,
    pub display: DisplayConfig,
    pub audio: AudioConfig,
}

/// Filesystem paths shared with the sensor-acquisition process.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    /// Named FIFO read by the sensor process for presence suppression.
    pub presence_fifo: PathBuf,
    /// CSV snapshot written by the sensor process, read by the sensor screen.
    pub sensor_snapshot: PathBuf,
    /// Where a corrupt sensor snapshot is copied aside for inspection.
    pub sensor_snapshot_aside: PathBuf,
    /// Persisted settings-tree snapshot.
    pub settings_snapshot: PathBuf,
    /// Append-only JSONL event log.
    pub event_log: PathBuf,
}

/// Main-loop timing knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TimingConfig {
    /// Fixed main-loop tick period.
    pub tick_interval_ms: u64,
    /// Delay before the single sensor-file read retry.
    pub sensor_retry_delay_ms: u64,
}

/// Display geometry and transition animation knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DisplayConfig {
    /// Character columns per line.
    pub columns: u8,
    /// Number of animation frames per screen transition.
    pub transition_frames: u8,
    /// Fixed delay between animation frames.
    pub frame_delay_ms: u64,
    /// Pause between the last scroll frame and the final redraw.
    pub settle_delay_ms: u64,
}

/// Audio peripheral wiring.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AudioConfig {
    /// One-shot playback command: program followed by its arguments.
    pub player_command: Vec<String>,
    /// LED/PWM driver device that receives the silence-reset byte.
    /// `None` disables the quiesce write.
    pub led_device: Option<PathBuf>,
}

fn data_dir() -> PathBuf {
    let home_dir = env::var_os("HOME").map_or_else(
        || {
            eprintln!("[RMP-CONFIG] WARNING: HOME not set, falling back to /tmp for data paths");
            PathBuf::from("/tmp")
        },
        PathBuf::from,
    );
    home_dir.join(".local").join("share").join("rmp")
}

impl Default for PathsConfig {
    fn default() -> Self {
        let data = data_dir();
        Self {
            presence_fifo: PathBuf::from("/tmp/pipe"),
            sensor_snapshot: PathBuf::from("/tmp/sens_data.txt"),
            sensor_snapshot_aside: PathBuf::from("/tmp/sens_data_err.txt"),
            settings_snapshot: data.join("settings.toml"),
            event_log: data.join("panel.jsonl"),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 250,
            sensor_retry_delay_ms: 500,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            columns: 16,
            transition_frames: 16,
            frame_delay_ms: 80,
            settle_delay_ms: 250,
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            player_command: vec![
                "aplay".to_string(),
                "-q".to_string(),
                "/usr/share/rmp/alarm.wav".to_string(),
            ],
            led_device: None,
        }
    }
}

impl PanelConfig {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        let home_dir = env::var_os("HOME").map_or_else(|| PathBuf::from("/tmp"), PathBuf::from);
        home_dir.join(".config").join("rmp").join("config.toml")
    }

    /// Load config from default or explicit path.
    ///
    /// Missing config file is not an error when loading from the default
    /// path; compiled defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| PanelError::Io {
                path: path_buf.clone(),
                source,
            })?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(PanelError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.timing.tick_interval_ms == 0 {
            return Err(PanelError::InvalidConfig {
                details: "timing.tick_interval_ms must be nonzero".to_string(),
            });
        }
        if self.display.columns < 8 {
            return Err(PanelError::InvalidConfig {
                details: format!(
                    "display.columns must be at least 8, got {}",
                    self.display.columns
                ),
            });
        }
        if self.display.transition_frames == 0 {
            return Err(PanelError::InvalidConfig {
                details: "display.transition_frames must be nonzero".to_string(),
            });
        }
        if self.audio.player_command.is_empty() {
            return Err(PanelError::InvalidConfig {
                details: "audio.player_command must name a program".to_string(),
            });
        }
        Ok(())
    }
}
