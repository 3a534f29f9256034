//! Persistent session-controller configuration model and defaults.

use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::resume::ResumePolicy;

/// Root configuration persisted to `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct SessionConfig {
    #[serde(default)]
    /// Resume-point behavior.
    pub resume: ResumeConfig,
    #[serde(default)]
    /// Delay adjustment behavior.
    pub delay: DelayConfig,
    #[serde(default)]
    /// Play queue behavior.
    pub playlist: PlaylistConfig,
}

/// Resume-point preferences.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ResumeConfig {
    #[serde(default)]
    pub policy: ResumePolicy,
}

/// Delay adjustment preferences.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct DelayConfig {
    /// Offset applied per adjustment step, in microseconds.
    #[serde(default = "default_delay_step_us")]
    pub step_us: i64,
    /// Audio offset applied automatically while a Bluetooth output route
    /// is connected. 0 disables the automatic offset.
    #[serde(default)]
    pub bluetooth_offset_us: i64,
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            step_us: default_delay_step_us(),
            bluetooth_offset_us: 0,
        }
    }
}

/// Play queue preferences.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct PlaylistConfig {
    /// Quiet window after the last drag step before a reorder is
    /// committed, in milliseconds.
    #[serde(default = "default_move_debounce_ms")]
    pub move_debounce_ms: u64,
}

impl Default for PlaylistConfig {
    fn default() -> Self {
        Self {
            move_debounce_ms: default_move_debounce_ms(),
        }
    }
}

fn default_delay_step_us() -> i64 {
    50_000
}

fn default_move_debounce_ms() -> u64 {
    1_000
}

/// Clamps out-of-range values back to usable defaults.
pub fn sanitize_config(mut config: SessionConfig) -> SessionConfig {
    if config.delay.step_us == 0 {
        config.delay.step_us = default_delay_step_us();
    }
    config.playlist.move_debounce_ms = config.playlist.move_debounce_ms.clamp(50, 10_000);
    config
}

/// Default config file location in the user's config directory.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("playhead")
        .join("config.toml")
}

/// Loads the config file, falling back to defaults on a missing or
/// unparsable file.
pub fn load_config(path: &Path) -> SessionConfig {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            info!(
                "Config file {} not readable ({}), using defaults",
                path.display(),
                e
            );
            return sanitize_config(SessionConfig::default());
        }
    };
    let config = match toml::from_str::<SessionConfig>(&content) {
        Ok(config) => config,
        Err(e) => {
            warn!(
                "Config file {} failed to parse ({}), using defaults",
                path.display(),
                e
            );
            SessionConfig::default()
        }
    };
    sanitize_config(config)
}

/// Writes the config file, creating parent directories as needed.
pub fn save_config(path: &Path, config: &SessionConfig) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let serialized = toml::to_string(config)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
    std::fs::write(path, serialized)
}
