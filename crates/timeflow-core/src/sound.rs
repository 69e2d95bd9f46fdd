//! Notification sounds.
//!
//! A sound is described as a list of tones so any shell (terminal bell,
//! audio backend, web audio) can render it the same way.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sound {
    Sine,
    Square,
    Triangle,
    Chime,
    Bell,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    Sine,
    Square,
    Triangle,
}

/// One oscillator burst.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tone {
    pub waveform: Waveform,
    pub frequency_hz: f64,
    /// Offset from the start of the sound.
    pub start_ms: u32,
    pub duration_ms: u32,
    /// Peak gain, already scaled by the playback volume.
    pub gain: f64,
}

const BELL_FUNDAMENTAL_HZ: f64 = 200.0;
const BELL_PARTIALS: [f64; 5] = [1.0, 2.0, 2.4, 3.0, 4.2];
// C5, E5, G5
const CHIME_NOTES_HZ: [f64; 3] = [523.25, 659.25, 783.99];

impl Sound {
    pub const ALL: [Sound; 6] = [
        Sound::Sine,
        Sound::Square,
        Sound::Triangle,
        Sound::Chime,
        Sound::Bell,
        Sound::None,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Sound::Sine => "sine",
            Sound::Square => "square",
            Sound::Triangle => "triangle",
            Sound::Chime => "chime",
            Sound::Bell => "bell",
            Sound::None => "none",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Sound::Sine => "Gentle Chime",
            Sound::Square => "Digital Beep",
            Sound::Triangle => "Soft Bell",
            Sound::Chime => "Wind Chime",
            Sound::Bell => "Church Bell",
            Sound::None => "Silent",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Sound::Sine => "Soft, pleasant tone perfect for focus work",
            Sound::Square => "Clear, attention-grabbing alert",
            Sound::Triangle => "Mellow, calming notification",
            Sound::Chime => "Natural, harmonious sequence",
            Sound::Bell => "Deep, resonant tone",
            Sound::None => "No sound notification",
        }
    }

    pub fn is_silent(&self) -> bool {
        matches!(self, Sound::None)
    }

    /// Tone pattern for this sound at the given volume (0.0 ..= 1.0).
    pub fn tones(&self, volume: f64) -> Vec<Tone> {
        let volume = volume.clamp(0.0, 1.0);
        let tone = |waveform, frequency_hz, start_ms, duration_ms, gain| Tone {
            waveform,
            frequency_hz,
            start_ms,
            duration_ms,
            gain,
        };
        match self {
            Sound::Sine => vec![tone(Waveform::Sine, 880.0, 0, 1000, volume)],
            Sound::Square => vec![
                tone(Waveform::Square, 800.0, 0, 200, volume),
                tone(Waveform::Square, 800.0, 300, 200, volume),
            ],
            Sound::Triangle => vec![tone(Waveform::Triangle, 600.0, 0, 800, volume)],
            Sound::Chime => CHIME_NOTES_HZ
                .iter()
                .enumerate()
                .map(|(i, &hz)| tone(Waveform::Sine, hz, i as u32 * 300, 800, volume))
                .collect(),
            Sound::Bell => BELL_PARTIALS
                .iter()
                .enumerate()
                .map(|(i, &partial)| {
                    tone(
                        Waveform::Sine,
                        BELL_FUNDAMENTAL_HZ * partial,
                        0,
                        2000,
                        volume / (i as f64 + 1.0),
                    )
                })
                .collect(),
            Sound::None => Vec::new(),
        }
    }
}

impl Default for Sound {
    fn default() -> Self {
        Sound::Sine
    }
}

impl fmt::Display for Sound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Sound {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Sound::ALL
            .iter()
            .copied()
            .find(|sound| sound.id().eq_ignore_ascii_case(s))
            .ok_or_else(|| ValidationError::UnknownSound(s.to_string()))
    }
}
