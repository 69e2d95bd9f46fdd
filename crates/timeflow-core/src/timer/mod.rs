mod clock;
mod engine;
mod input;
mod pomodoro;

pub use clock::{ClockDriver, Tick, TICK_PERIOD};
pub use engine::{
    user_message, Lap, Mode, RunState, Snapshot, TimerEngine, SET_TIME_FIRST, SKIP_QUESTION,
    TIMES_UP, UNSAVED_SETTINGS_QUESTION,
};
pub use input::{format_hms, TimerInput, HOURS_MAX, MINUTES_MAX, SECONDS_MAX};
pub use pomodoro::{PhaseTransition, PomodoroCycle, PomodoroPhase, SessionDot};
