//! Engine configuration loaded from JSON
//!
//! Every section falls back to its defaults, so a config file only needs to
//! name the values it changes.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming the config file read by [`EngineConfig::load`].
pub const CONFIG_PATH_ENV: &str = "RTC_ENGINE_CONFIG";

/// Config file used when [`CONFIG_PATH_ENV`] is unset.
pub const DEFAULT_CONFIG_PATH: &str = "assets/rtc_engine.json";

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub events: EventConfig,
    pub telemetry: TelemetryConfig,
    pub parameters: ParameterConfig,
}

/// Event dispatch settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    /// Name of the thread that runs handler callbacks
    pub thread_name: String,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            thread_name: "rtc-event-dispatch".to_string(),
        }
    }
}

/// Telemetry collector sizing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Broadcast channel capacity; slow subscribers lag past this
    pub channel_capacity: usize,
    /// Number of recent metric events kept for snapshots
    pub history_capacity: usize,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
            history_capacity: 64,
        }
    }
}

/// Parameter bus settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterConfig {
    /// Reject values for known keys whose JSON shape does not match
    pub enforce_shapes: bool,
    /// Profile applied (replace mode) right after `initialize`
    pub initial_profile: Option<PathBuf>,
}

impl Default for ParameterConfig {
    fn default() -> Self {
        Self {
            enforce_shapes: true,
            initial_profile: None,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file
    ///
    /// A missing or malformed file is logged and the defaults are returned.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::debug!(
                    "[Config] No config file at {:?} ({}). Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load from `$RTC_ENGINE_CONFIG`, or from [`DEFAULT_CONFIG_PATH`].
    pub fn load() -> Self {
        match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::load_from_file(PathBuf::from(path)),
            None => Self::load_from_file(DEFAULT_CONFIG_PATH),
        }
    }
}
