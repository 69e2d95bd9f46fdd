//! # TimeFlow Core Library
//!
//! This library provides the core logic for the TimeFlow timer: a countdown
//! timer, a stopwatch with laps, and a Pomodoro cycle. Shells (the CLI, or
//! any GUI) call into a single [`TimerEngine`] and render from its
//! [`Snapshot`].
//!
//! ## Architecture
//!
//! - **Timer Engine**: one state machine for all three modes, advanced by
//!   1-second ticks from a [`ClockDriver`]
//! - **Pomodoro Cycle**: work / short break / long break transitions and
//!   the clamp rule applied when the cycle length changes
//! - **Settings**: validated settings with debounced TOML persistence
//! - **Gateway**: the engine's only way to reach the user (messages,
//!   yes/no questions, sounds)
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Core timer state machine
//! - [`SettingsStore`]: Settings with change tracking and debounced writes
//! - [`NotificationGateway`]: Trait shells implement to talk to the user

pub mod error;
pub mod events;
pub mod gateway;
pub mod settings;
pub mod sound;
pub mod timer;

pub use error::{ConfigError, CoreError, InvalidInputError, ValidationError};
pub use events::Event;
pub use gateway::{ConfirmFuture, NotificationGateway, RecordingGateway};
pub use settings::{Settings, SettingsPatch, SettingsStore, TomlFileBackend};
pub use sound::Sound;
pub use timer::{
    ClockDriver, Lap, Mode, PomodoroCycle, PomodoroPhase, RunState, Snapshot, Tick, TimerEngine,
    TimerInput, TICK_PERIOD,
};
