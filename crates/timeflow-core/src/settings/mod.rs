//! User-editable settings.
//!
//! Stores:
//! - Pomodoro phase durations and sessions until the long break
//! - Notification sound and volume
//!
//! The record is flat so it persists as plain key-value pairs
//! (`workMinutes = 25`, `soundId = "sine"`, ...).

mod backend;
mod store;

pub use backend::{data_dir, MemoryBackend, SettingsBackend, TomlFileBackend};
pub use store::{PendingWrite, SettingsStore, DEFAULT_DEBOUNCE};

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

use crate::error::{ConfigError, CoreError, ValidationError};
use crate::sound::Sound;
use crate::timer::PomodoroPhase;

pub const WORK_MINUTES_RANGE: RangeInclusive<u32> = 1..=60;
pub const SHORT_BREAK_MINUTES_RANGE: RangeInclusive<u32> = 1..=30;
pub const LONG_BREAK_MINUTES_RANGE: RangeInclusive<u32> = 1..=60;
pub const SESSIONS_UNTIL_LONG_BREAK_RANGE: RangeInclusive<u32> = 2..=10;
pub const VOLUME_RANGE: RangeInclusive<f64> = 0.0..=1.0;

/// Persisted settings record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default = "default_work_minutes")]
    pub work_minutes: u32,
    #[serde(default = "default_short_break_minutes")]
    pub short_break_minutes: u32,
    #[serde(default = "default_long_break_minutes")]
    pub long_break_minutes: u32,
    #[serde(default = "default_sessions_until_long_break")]
    pub sessions_until_long_break: u32,
    #[serde(default, rename = "soundId")]
    pub sound: Sound,
    #[serde(default = "default_volume")]
    pub volume: f64,
}

fn default_work_minutes() -> u32 {
    25
}
fn default_short_break_minutes() -> u32 {
    5
}
fn default_long_break_minutes() -> u32 {
    15
}
fn default_sessions_until_long_break() -> u32 {
    4
}
fn default_volume() -> f64 {
    0.3
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            work_minutes: default_work_minutes(),
            short_break_minutes: default_short_break_minutes(),
            long_break_minutes: default_long_break_minutes(),
            sessions_until_long_break: default_sessions_until_long_break(),
            sound: Sound::default(),
            volume: default_volume(),
        }
    }
}

impl Settings {
    pub fn work_secs(&self) -> u64 {
        u64::from(self.work_minutes) * 60
    }

    pub fn short_break_secs(&self) -> u64 {
        u64::from(self.short_break_minutes) * 60
    }

    pub fn long_break_secs(&self) -> u64 {
        u64::from(self.long_break_minutes) * 60
    }

    /// Configured length of a Pomodoro phase in seconds.
    pub fn phase_secs(&self, phase: PomodoroPhase) -> u64 {
        match phase {
            PomodoroPhase::Work => self.work_secs(),
            PomodoroPhase::ShortBreak => self.short_break_secs(),
            PomodoroPhase::LongBreak => self.long_break_secs(),
        }
    }

    /// Check every field against its range.
    pub fn validate(&self) -> Result<(), ValidationError> {
        SettingsPatch::from(self).validate()
    }

    /// Replace any out-of-range field with its default. Used for records
    /// read from disk, which may have been edited by hand.
    pub fn sanitized(mut self) -> Self {
        let defaults = Settings::default();
        if !WORK_MINUTES_RANGE.contains(&self.work_minutes) {
            self.work_minutes = defaults.work_minutes;
        }
        if !SHORT_BREAK_MINUTES_RANGE.contains(&self.short_break_minutes) {
            self.short_break_minutes = defaults.short_break_minutes;
        }
        if !LONG_BREAK_MINUTES_RANGE.contains(&self.long_break_minutes) {
            self.long_break_minutes = defaults.long_break_minutes;
        }
        if !SESSIONS_UNTIL_LONG_BREAK_RANGE.contains(&self.sessions_until_long_break) {
            self.sessions_until_long_break = defaults.sessions_until_long_break;
        }
        if !VOLUME_RANGE.contains(&self.volume) {
            self.volume = defaults.volume;
        }
        self
    }

    /// Get a field as text by its persisted key (e.g. `workMinutes`).
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        match json.get(key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Keys of the persisted record, in declaration order.
    pub fn keys() -> &'static [&'static str] {
        &[
            "workMinutes",
            "shortBreakMinutes",
            "longBreakMinutes",
            "sessionsUntilLongBreak",
            "soundId",
            "volume",
        ]
    }
}

/// Partial settings update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SettingsPatch {
    #[serde(default)]
    pub work_minutes: Option<u32>,
    #[serde(default)]
    pub short_break_minutes: Option<u32>,
    #[serde(default)]
    pub long_break_minutes: Option<u32>,
    #[serde(default)]
    pub sessions_until_long_break: Option<u32>,
    #[serde(default, rename = "soundId")]
    pub sound: Option<Sound>,
    #[serde(default)]
    pub volume: Option<f64>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        *self == SettingsPatch::default()
    }

    /// Validate every present field. The first offending field is reported.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_u32("workMinutes", self.work_minutes, WORK_MINUTES_RANGE)?;
        check_u32(
            "shortBreakMinutes",
            self.short_break_minutes,
            SHORT_BREAK_MINUTES_RANGE,
        )?;
        check_u32(
            "longBreakMinutes",
            self.long_break_minutes,
            LONG_BREAK_MINUTES_RANGE,
        )?;
        check_u32(
            "sessionsUntilLongBreak",
            self.sessions_until_long_break,
            SESSIONS_UNTIL_LONG_BREAK_RANGE,
        )?;
        if let Some(volume) = self.volume {
            if !VOLUME_RANGE.contains(&volume) {
                return Err(ValidationError::OutOfRange {
                    field: "volume",
                    value: volume,
                    min: f64::from(*VOLUME_RANGE.start()),
                    max: f64::from(*VOLUME_RANGE.end()),
                });
            }
        }
        Ok(())
    }

    /// Build a single-field patch from a persisted key and its text value.
    ///
    /// # Errors
    ///
    /// `ConfigError::UnknownKey` for keys outside the record,
    /// `ConfigError::InvalidValue` when the text does not fit the key's type,
    /// `ValidationError::UnknownSound` for an unknown `soundId`.
    pub fn from_key_value(key: &str, value: &str) -> Result<Self, CoreError> {
        let template = serde_json::to_value(Settings::default())?;
        let existing = template
            .get(key)
            .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;

        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let new_value = match existing {
            serde_json::Value::String(_) if key == "soundId" => {
                let sound: Sound = value.parse()?;
                serde_json::to_value(sound)?
            }
            serde_json::Value::Number(n) if n.is_f64() => {
                let parsed = value
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?;
                serde_json::Number::from_f64(parsed)
                    .map(serde_json::Value::Number)
                    .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
            }
            serde_json::Value::Number(_) => {
                let parsed = value
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| invalid(format!("cannot parse '{value}' as whole number")))?;
                serde_json::Value::Number(parsed.into())
            }
            _ => serde_json::Value::String(value.to_string()),
        };

        let mut obj = serde_json::Map::new();
        obj.insert(key.to_string(), new_value);
        serde_json::from_value(serde_json::Value::Object(obj))
            .map_err(|e| invalid(e.to_string()).into())
    }
}

impl From<&Settings> for SettingsPatch {
    fn from(s: &Settings) -> Self {
        Self {
            work_minutes: Some(s.work_minutes),
            short_break_minutes: Some(s.short_break_minutes),
            long_break_minutes: Some(s.long_break_minutes),
            sessions_until_long_break: Some(s.sessions_until_long_break),
            sound: Some(s.sound),
            volume: Some(s.volume),
        }
    }
}

fn check_u32(
    field: &'static str,
    value: Option<u32>,
    range: RangeInclusive<u32>,
) -> Result<(), ValidationError> {
    match value {
        Some(v) if !range.contains(&v) => Err(ValidationError::OutOfRange {
            field,
            value: f64::from(v),
            min: f64::from(*range.start()),
            max: f64::from(*range.end()),
        }),
        _ => Ok(()),
    }
}

/// Which parts of the settings an update actually changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettingsChange {
    pub durations: bool,
    pub sessions_until_long_break: bool,
    pub sound: bool,
    pub volume: bool,
}

impl SettingsChange {
    pub fn is_empty(&self) -> bool {
        !(self.durations || self.sessions_until_long_break || self.sound || self.volume)
    }

    /// True when the Pomodoro cycle or counter may need re-deriving.
    pub fn affects_pomodoro(&self) -> bool {
        self.durations || self.sessions_until_long_break
    }
}
