use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::settings::Settings;
use crate::timer::{Lap, Mode, PomodoroPhase};

/// Every state change in the engine produces an Event.
/// Shells log or display them; the snapshot is what they render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        mode: Mode,
        /// Countdown length, or the stopwatch's starting value.
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        mode: Mode,
        time_counter: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        mode: Mode,
        time_counter: u64,
        at: DateTime<Utc>,
    },
    /// A Timer-mode countdown reached zero.
    TimerCompleted {
        at: DateTime<Utc>,
    },
    /// A Pomodoro phase ended, by reaching zero or by being skipped.
    PhaseAdvanced {
        from: PomodoroPhase,
        to: PomodoroPhase,
        session_index: u32,
        completed_work_sessions: u32,
        duration_secs: u64,
        skipped: bool,
        at: DateTime<Utc>,
    },
    LapRecorded {
        lap: Lap,
        at: DateTime<Utc>,
    },
    TimerReset {
        mode: Mode,
        at: DateTime<Utc>,
    },
    ModeSwitched {
        from: Mode,
        to: Mode,
        at: DateTime<Utc>,
    },
    SettingsUpdated {
        settings: Settings,
        at: DateTime<Utc>,
    },
}
