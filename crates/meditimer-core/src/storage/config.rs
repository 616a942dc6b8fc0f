//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Duration presets and the default interval bell
//! - Start and interval bell sounds
//! - Selected background track and the total-silence override
//! - Journaling toggles
//! - Fixed playback volumes
//!
//! Configuration is stored at `~/.config/meditimer/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data_dir;
use crate::audio::{AudioSettings, RetryPolicy};
use crate::cues::{BellConfig, SoundKey};
use crate::error::{ConfigError, Result};
use crate::timer::IntervalPolicy;

/// Bell sound selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoundsConfig {
    #[serde(default = "default_start_sound")]
    pub start_sound: SoundKey,
    #[serde(default = "default_interval_sound")]
    pub interval_sound: SoundKey,
}

/// Journaling configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JournalConfig {
    #[serde(default)]
    pub hide_journaling: bool,
    #[serde(default)]
    pub disable_quotes: bool,
}

/// Background audio levels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "default_direct_volume")]
    pub direct_volume: f32,
    #[serde(default = "default_embedded_volume")]
    pub embedded_volume: u8,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/meditimer/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Duration presets offered on setup, in minutes.
    #[serde(default = "default_durations")]
    pub durations: Vec<u32>,
    #[serde(default = "default_duration")]
    pub default_duration: u32,
    #[serde(default)]
    pub default_interval: IntervalPolicy,
    #[serde(default)]
    pub selected_audio_id: Option<String>,
    /// Mutes bells and background audio alike.
    #[serde(default)]
    pub total_silence: bool,
    #[serde(default)]
    pub sounds: SoundsConfig,
    #[serde(default)]
    pub journal: JournalConfig,
    #[serde(default)]
    pub audio: AudioConfig,
}

fn default_durations() -> Vec<u32> {
    vec![5, 10, 15, 20, 30, 45, 60]
}
fn default_duration() -> u32 {
    10
}
fn default_start_sound() -> SoundKey {
    SoundKey::Bell1
}
fn default_interval_sound() -> SoundKey {
    SoundKey::Bell2
}
fn default_direct_volume() -> f32 {
    0.3
}
fn default_embedded_volume() -> u8 {
    50
}

impl Default for SoundsConfig {
    fn default() -> Self {
        Self {
            start_sound: default_start_sound(),
            interval_sound: default_interval_sound(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            direct_volume: default_direct_volume(),
            embedded_volume: default_embedded_volume(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            durations: default_durations(),
            default_duration: default_duration(),
            default_interval: IntervalPolicy::None,
            selected_audio_id: None,
            total_silence: false,
            sounds: SoundsConfig::default(),
            journal: JournalConfig::default(),
            audio: AudioConfig::default(),
        }
    }
}

/// Immutable preference snapshot handed to a session at start.
///
/// The track comes from the session's own configuration. Only the selected
/// track and total silence change mid-session; those arrive through the
/// session's watch channels.
#[derive(Debug, Clone, PartialEq)]
pub struct Preferences {
    pub bells: BellConfig,
    pub audio: AudioSettings,
}

impl Config {
    fn value_at<'a>(root: &'a serde_json::Value, key: &str) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }
        key.split('.').try_fold(root, |node, part| node.get(part))
    }

    fn assign_at(root: &mut serde_json::Value, key: &str, raw: &str) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let (parent, leaf) = match key.rsplit_once('.') {
            Some((parent, leaf)) => (
                key_path_mut(root, parent).ok_or_else(unknown)?,
                leaf,
            ),
            None => (root, key),
        };
        let slot = parent
            .as_object_mut()
            .and_then(|obj| obj.get_mut(leaf))
            .ok_or_else(unknown)?;

        *slot = match &*slot {
            serde_json::Value::Bool(_) => serde_json::Value::Bool(
                raw.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
            ),
            serde_json::Value::Number(_) => {
                if let Ok(n) = raw.parse::<u64>() {
                    serde_json::Value::Number(n.into())
                } else {
                    raw.parse::<f64>()
                        .ok()
                        .and_then(serde_json::Number::from_f64)
                        .map(serde_json::Value::Number)
                        .ok_or_else(|| invalid(format!("'{raw}' is not a number")))?
                }
            }
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                serde_json::from_str(raw).map_err(|e| invalid(e.to_string()))?
            }
            // Optional values reset with an empty string.
            serde_json::Value::Null if raw.is_empty() => serde_json::Value::Null,
            _ if raw.is_empty() && leaf == "selected_audio_id" => serde_json::Value::Null,
            _ => serde_json::Value::String(raw.to_string()),
        };
        Ok(())
    }

    fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk, writing defaults when the file does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content).map_err(|e| {
                ConfigError::LoadFailed {
                    path,
                    message: e.to_string(),
                }
                .into()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<()> {
        let path = Self::path()?;
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, content).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("using default config: {e}");
            Self::default()
        })
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        match Self::value_at(&json, key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a value by dot-separated key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not fit it.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::assign_at(&mut json, key, value)?;
        let updated: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a value by key and persist.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.apply(key, value)?;
        self.save()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_duration == 0 {
            return Err(ConfigError::InvalidValue {
                key: "default_duration".into(),
                message: "must be at least one minute".into(),
            });
        }
        if self.durations.iter().any(|&d| d == 0) {
            return Err(ConfigError::InvalidValue {
                key: "durations".into(),
                message: "presets must be at least one minute".into(),
            });
        }
        if !(0.0..=1.0).contains(&self.audio.direct_volume) {
            return Err(ConfigError::InvalidValue {
                key: "audio.direct_volume".into(),
                message: "must be between 0.0 and 1.0".into(),
            });
        }
        if self.audio.embedded_volume > 100 {
            return Err(ConfigError::InvalidValue {
                key: "audio.embedded_volume".into(),
                message: "must be between 0 and 100".into(),
            });
        }
        Ok(())
    }

    pub fn preferences(&self) -> Preferences {
        Preferences {
            bells: BellConfig {
                start_sound: self.sounds.start_sound,
                interval_sound: self.sounds.interval_sound,
                total_silence: self.total_silence,
            },
            audio: AudioSettings {
                direct_volume: self.audio.direct_volume,
                embedded_volume: self.audio.embedded_volume,
                retry: RetryPolicy::default(),
            },
        }
    }
}

fn key_path_mut<'a>(root: &'a mut serde_json::Value, path: &str) -> Option<&'a mut serde_json::Value> {
    path.split('.').try_fold(root, |node, part| node.get_mut(part))
}
