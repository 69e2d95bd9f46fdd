use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::InvalidInputError;

pub const HOURS_MAX: u32 = 23;
pub const MINUTES_MAX: u32 = 59;
pub const SECONDS_MAX: u32 = 59;

/// Countdown length entered by the user for Timer mode.
///
/// Fields are always within range; constructors clamp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerInput {
    hours: u32,
    minutes: u32,
    seconds: u32,
}

impl TimerInput {
    /// Build from raw field values, clamping each to its range
    /// (negative values become 0).
    pub fn clamped(hours: i64, minutes: i64, seconds: i64) -> Self {
        Self {
            hours: clamp_field(hours, HOURS_MAX),
            minutes: clamp_field(minutes, MINUTES_MAX),
            seconds: clamp_field(seconds, SECONDS_MAX),
        }
    }

    pub fn hours(&self) -> u32 {
        self.hours
    }

    pub fn minutes(&self) -> u32 {
        self.minutes
    }

    pub fn seconds(&self) -> u32 {
        self.seconds
    }

    pub fn total_secs(&self) -> u64 {
        u64::from(self.hours) * 3600 + u64::from(self.minutes) * 60 + u64::from(self.seconds)
    }

    pub fn is_zero(&self) -> bool {
        self.total_secs() == 0
    }
}

fn clamp_field(value: i64, max: u32) -> u32 {
    value.clamp(0, i64::from(max)) as u32
}

impl FromStr for TimerInput {
    type Err = InvalidInputError;

    /// Accepts `H:M:S`, `M:S` or `S`. Empty fields count as zero.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unparseable = || InvalidInputError::Unparseable(s.to_string());
        let parts: Vec<&str> = s.trim().split(':').collect();
        if parts.len() > 3 {
            return Err(unparseable());
        }

        let mut values = [0i64; 3];
        let offset = 3 - parts.len();
        for (i, part) in parts.iter().enumerate() {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            values[offset + i] = part.parse::<i64>().map_err(|_| unparseable())?;
        }
        Ok(Self::clamped(values[0], values[1], values[2]))
    }
}

/// Format seconds as `HH:MM:SS`. Hours are not wrapped.
pub fn format_hms(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}
