//! Pomodoro cycle state machine.
//!
//! ## Transitions (on a phase reaching zero)
//!
//! ```text
//! Work       -- completed+1 <  sessions --> ShortBreak
//! Work       -- completed+1 >= sessions --> LongBreak
//! ShortBreak ---------------------------> Work
//! LongBreak  ---------------------------> Work (new cycle)
//! ```
//!
//! The cycle only tracks counters. Durations come from the settings and
//! the countdown itself lives in the engine.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PomodoroPhase {
    Work,
    ShortBreak,
    LongBreak,
}

impl PomodoroPhase {
    pub fn label(&self) -> &'static str {
        match self {
            PomodoroPhase::Work => "Work Session",
            PomodoroPhase::ShortBreak => "Short Break",
            PomodoroPhase::LongBreak => "Long Break",
        }
    }

    pub fn is_break(&self) -> bool {
        !matches!(self, PomodoroPhase::Work)
    }
}

/// What happened when a phase completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTransition {
    pub from: PomodoroPhase,
    pub to: PomodoroPhase,
    /// Message for the user.
    pub message: &'static str,
}

/// Progress indicator for one work session of the current cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionDot {
    Completed,
    Current,
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PomodoroCycle {
    phase: PomodoroPhase,
    /// 1-based number of the work session in progress (or up next).
    session_index: u32,
    completed_work_sessions: u32,
}

impl Default for PomodoroCycle {
    fn default() -> Self {
        Self::new()
    }
}

impl PomodoroCycle {
    pub fn new() -> Self {
        Self {
            phase: PomodoroPhase::Work,
            session_index: 1,
            completed_work_sessions: 0,
        }
    }

    pub fn phase(&self) -> PomodoroPhase {
        self.phase
    }

    pub fn session_index(&self) -> u32 {
        self.session_index
    }

    pub fn completed_work_sessions(&self) -> u32 {
        self.completed_work_sessions
    }

    /// Apply the transition for the current phase finishing.
    pub fn complete_phase(&mut self, sessions_until_long_break: u32) -> PhaseTransition {
        let from = self.phase;
        let (to, message) = match from {
            PomodoroPhase::Work => {
                self.completed_work_sessions += 1;
                if self.completed_work_sessions < sessions_until_long_break {
                    self.session_index = self.completed_work_sessions + 1;
                    (
                        PomodoroPhase::ShortBreak,
                        "Work session complete! Time for a short break.",
                    )
                } else {
                    (PomodoroPhase::LongBreak, "Great job! Time for a long break!")
                }
            }
            PomodoroPhase::ShortBreak => {
                (PomodoroPhase::Work, "Break over! Let's get back to work.")
            }
            PomodoroPhase::LongBreak => {
                self.completed_work_sessions = 0;
                self.session_index = 1;
                (
                    PomodoroPhase::Work,
                    "Long break over! Starting a new cycle.",
                )
            }
        };
        self.phase = to;
        PhaseTransition { from, to, message }
    }

    /// Bring the counters back within a (possibly smaller) cycle length.
    /// Returns whether anything was clamped.
    ///
    /// Outside a long break at most `sessions - 1` work sessions can be
    /// complete, otherwise the next work session would overshoot the cycle.
    pub fn reconcile(&mut self, sessions_until_long_break: u32) -> bool {
        let sessions = sessions_until_long_break.max(1);
        let limit = match self.phase {
            PomodoroPhase::LongBreak => sessions,
            _ => sessions - 1,
        };
        let before = *self;
        if self.completed_work_sessions > limit {
            self.completed_work_sessions = sessions - 1;
        }
        self.session_index = self.session_index.min(sessions).max(1);
        *self != before
    }

    /// Check `completed <= sessions` and `1 <= session_index <= sessions`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvariantViolation` describing the bad state.
    pub fn check_invariant(&self, sessions_until_long_break: u32) -> Result<(), CoreError> {
        let ok = self.completed_work_sessions <= sessions_until_long_break
            && (1..=sessions_until_long_break).contains(&self.session_index);
        if ok {
            Ok(())
        } else {
            Err(CoreError::InvariantViolation(format!(
                "pomodoro cycle {self:?} does not fit {sessions_until_long_break} sessions"
            )))
        }
    }

    /// One dot per work session of the cycle.
    pub fn dots(&self, sessions_until_long_break: u32) -> Vec<SessionDot> {
        (0..sessions_until_long_break)
            .map(|i| {
                if i < self.completed_work_sessions {
                    SessionDot::Completed
                } else if i == self.completed_work_sessions && self.phase == PomodoroPhase::Work {
                    SessionDot::Current
                } else {
                    SessionDot::Pending
                }
            })
            .collect()
    }
}
