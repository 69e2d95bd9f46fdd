//! Timer engine implementation.
//!
//! One engine drives all three modes. It owns every piece of mutable timer
//! state and is advanced only by its own methods and by ticks from the
//! [`ClockDriver`].
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> Paused -> Running -> ... -> Idle (countdown reached zero)
//!   ^                                              |
//!   +------------------ reset / switch_mode -------+
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new(store, gateway, ClockDriver::interval(tx, TICK_PERIOD));
//! engine.switch_mode(Mode::Pomodoro);
//! engine.start().await?;
//! // In the shell's loop:
//! while let Some(tick) = rx.recv().await {
//!     engine.handle_tick(tick);
//!     render(engine.snapshot());
//! }
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use super::clock::{ClockDriver, Tick};
use super::input::{format_hms, TimerInput};
use super::pomodoro::{PomodoroCycle, SessionDot};
use crate::error::{CoreError, InvalidInputError, Result};
use crate::events::Event;
use crate::gateway::NotificationGateway;
use crate::settings::{Settings, SettingsPatch, SettingsStore};
use crate::sound::Sound;

pub const UNSAVED_SETTINGS_QUESTION: &str =
    "You have unsaved settings. Would you like to save them before continuing?";
pub const SKIP_QUESTION: &str = "Skip this session?";
pub const SET_TIME_FIRST: &str = "Please set a time first!";
pub const TIMES_UP: &str = "Time's up!";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Timer,
    Stopwatch,
    Pomodoro,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Timer => "timer",
            Mode::Stopwatch => "stopwatch",
            Mode::Pomodoro => "pomodoro",
        }
    }

    /// Whether the counter runs down to zero.
    pub fn counts_down(&self) -> bool {
        !matches!(self, Mode::Stopwatch)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = InvalidInputError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "timer" => Ok(Mode::Timer),
            "stopwatch" => Ok(Mode::Stopwatch),
            "pomodoro" => Ok(Mode::Pomodoro),
            other => Err(InvalidInputError::UnknownMode(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lap {
    /// 1-based, the lap count when it was recorded.
    pub index: usize,
    pub seconds: u64,
}

/// Read-only view a shell renders from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub mode: Mode,
    pub run_state: RunState,
    pub time_counter: u64,
    /// `time_counter` as `HH:MM:SS`.
    pub display: String,
    /// Most recent first.
    pub laps: Vec<Lap>,
    pub pomodoro_cycle: PomodoroCycle,
    pub pomodoro_phase_label: String,
    pub session_dots: Vec<SessionDot>,
    pub settings: Settings,
}

/// Core timer engine.
///
/// Owns the settings store, the notification gateway and the clock.
pub struct TimerEngine<G: NotificationGateway> {
    mode: Mode,
    run_state: RunState,
    /// Elapsed seconds (stopwatch) or remaining seconds (timer, pomodoro).
    time_counter: u64,
    laps: Vec<Lap>,
    cycle: PomodoroCycle,
    timer_input: TimerInput,
    settings: SettingsStore,
    gateway: G,
    clock: ClockDriver,
}

impl<G: NotificationGateway> TimerEngine<G> {
    /// Create an engine in Timer mode, idle, with a zero counter.
    pub fn new(settings: SettingsStore, gateway: G, clock: ClockDriver) -> Self {
        Self {
            mode: Mode::Timer,
            run_state: RunState::Idle,
            time_counter: 0,
            laps: Vec::new(),
            cycle: PomodoroCycle::new(),
            timer_input: TimerInput::default(),
            settings,
            gateway,
            clock,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    pub fn is_running(&self) -> bool {
        self.run_state == RunState::Running
    }

    pub fn time_counter(&self) -> u64 {
        self.time_counter
    }

    /// Laps in recording order.
    pub fn laps(&self) -> &[Lap] {
        &self.laps
    }

    pub fn laps_recent_first(&self) -> impl Iterator<Item = &Lap> {
        self.laps.iter().rev()
    }

    pub fn pomodoro_cycle(&self) -> &PomodoroCycle {
        &self.cycle
    }

    pub fn settings(&self) -> &Settings {
        self.settings.settings()
    }

    pub fn settings_store(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn timer_input(&self) -> TimerInput {
        self.timer_input
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn clock(&self) -> &ClockDriver {
        &self.clock
    }

    pub fn snapshot(&self) -> Snapshot {
        let settings = self.settings.settings().clone();
        Snapshot {
            mode: self.mode,
            run_state: self.run_state,
            time_counter: self.time_counter,
            display: format_hms(self.time_counter),
            laps: self.laps_recent_first().copied().collect(),
            pomodoro_cycle: self.cycle,
            pomodoro_phase_label: self.cycle.phase().label().to_string(),
            session_dots: self.cycle.dots(settings.sessions_until_long_break),
            settings,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Set the countdown used by the next Timer-mode start.
    pub fn set_timer_input(&mut self, input: TimerInput) {
        self.timer_input = input;
    }

    /// Start or resume.
    ///
    /// In Pomodoro mode with settings still waiting to be written, the user
    /// is first asked whether to save them; declining aborts the start.
    ///
    /// # Errors
    ///
    /// `InvalidInputError::ZeroDuration` when a Timer-mode start has no
    /// time set. Nothing changes in that case.
    pub async fn start(&mut self) -> Result<Option<Event>> {
        if self.run_state == RunState::Running {
            return Ok(None);
        }

        if self.mode == Mode::Pomodoro && !self.save_pending_settings().await? {
            info!("start cancelled, unsaved settings kept pending");
            return Ok(None);
        }

        let resuming = self.run_state == RunState::Paused;
        match self.mode {
            Mode::Timer if self.time_counter == 0 => {
                let total = self.timer_input.total_secs();
                if total == 0 {
                    warn!("timer start rejected, no time set");
                    self.gateway.notify(SET_TIME_FIRST);
                    return Err(InvalidInputError::ZeroDuration.into());
                }
                self.time_counter = total;
            }
            Mode::Pomodoro if self.time_counter == 0 => {
                self.time_counter = self.settings.settings().phase_secs(self.cycle.phase());
            }
            _ => {}
        }

        self.run_state = RunState::Running;
        self.clock.start_ticking();

        let at = Utc::now();
        let event = if resuming {
            Event::TimerResumed {
                mode: self.mode,
                time_counter: self.time_counter,
                at,
            }
        } else {
            info!(mode = %self.mode, secs = self.time_counter, "timer started");
            Event::TimerStarted {
                mode: self.mode,
                duration_secs: self.time_counter,
                at,
            }
        };
        Ok(Some(event))
    }

    /// Set the timer input and start in one go.
    pub async fn start_with(&mut self, input: TimerInput) -> Result<Option<Event>> {
        self.set_timer_input(input);
        self.start().await
    }

    pub fn pause(&mut self) -> Option<Event> {
        if self.run_state != RunState::Running {
            return None;
        }
        self.clock.stop_ticking();
        self.run_state = RunState::Paused;
        Some(Event::TimerPaused {
            mode: self.mode,
            time_counter: self.time_counter,
            at: Utc::now(),
        })
    }

    pub fn reset(&mut self) -> Event {
        self.clock.stop_ticking();
        self.reset_state();
        Event::TimerReset {
            mode: self.mode,
            at: Utc::now(),
        }
    }

    /// Record a lap. Only does something for a running stopwatch.
    pub fn lap(&mut self) -> Option<Event> {
        if self.mode != Mode::Stopwatch || self.run_state != RunState::Running {
            return None;
        }
        let lap = Lap {
            index: self.laps.len() + 1,
            seconds: self.time_counter,
        };
        self.laps.push(lap);
        debug!(index = lap.index, seconds = lap.seconds, "lap recorded");
        Some(Event::LapRecorded {
            lap,
            at: Utc::now(),
        })
    }

    /// Switch modes. The clock is stopped before the mode changes so no
    /// tick can touch the new mode's counter.
    pub fn switch_mode(&mut self, mode: Mode) -> Event {
        self.clock.stop_ticking();
        let from = self.mode;
        self.mode = mode;
        self.reset_state();
        info!(%from, to = %mode, "mode switched");
        Event::ModeSwitched {
            from,
            to: mode,
            at: Utc::now(),
        }
    }

    /// Skip the current Pomodoro phase after the user confirms.
    /// Returns `None` outside Pomodoro mode or when declined.
    ///
    /// Pending settings are offered for saving first, as on start.
    pub async fn skip_pomodoro(&mut self) -> Option<Event> {
        if self.mode != Mode::Pomodoro {
            return None;
        }
        if !matches!(self.save_pending_settings().await, Ok(true)) {
            debug!("skip cancelled");
            return None;
        }
        if !self.gateway.confirm(SKIP_QUESTION).await {
            debug!("skip declined");
            return None;
        }
        self.clock.stop_ticking();
        self.time_counter = 0;
        self.run_state = RunState::Paused;
        Some(self.advance_phase(true))
    }

    /// Play `sound` at the current volume without selecting it.
    pub fn preview_sound(&self, sound: Sound) {
        if !sound.is_silent() {
            self.gateway.play_sound(sound, self.settings.settings().volume);
        }
    }

    /// Handle a tick from the clock driver. Ticks from a stopped or
    /// replaced source are dropped.
    pub fn handle_tick(&mut self, tick: Tick) -> Option<Event> {
        if !self.clock.accepts(tick) {
            debug!(generation = tick.generation(), "stale tick dropped");
            return None;
        }
        self.on_tick()
    }

    /// Advance time by one second.
    pub fn on_tick(&mut self) -> Option<Event> {
        if self.run_state != RunState::Running {
            return None;
        }
        if !self.mode.counts_down() {
            self.time_counter = self.time_counter.saturating_add(1);
            return None;
        }

        self.time_counter = self.time_counter.saturating_sub(1);
        if self.time_counter > 0 {
            return None;
        }

        self.clock.stop_ticking();
        self.run_state = RunState::Idle;
        let settings = self.settings.settings();
        if !settings.sound.is_silent() {
            self.gateway.play_sound(settings.sound, settings.volume);
        }

        match self.mode {
            Mode::Pomodoro => Some(self.advance_phase(false)),
            _ => {
                info!("timer finished");
                self.gateway.notify(TIMES_UP);
                Some(Event::TimerCompleted { at: Utc::now() })
            }
        }
    }

    /// Validate and apply a settings change, then bring the Pomodoro cycle
    /// back in line with it.
    ///
    /// # Errors
    ///
    /// `ValidationError` if any field is out of range (nothing is applied),
    /// `InvariantViolation` if the cycle could not be reconciled.
    pub fn update_settings(&mut self, patch: &SettingsPatch) -> Result<Option<Event>> {
        self.update_settings_at(patch, Instant::now())
    }

    pub fn update_settings_at(
        &mut self,
        patch: &SettingsPatch,
        now: Instant,
    ) -> Result<Option<Event>> {
        let change = match self.settings.update(patch, now) {
            Ok(change) => change,
            Err(e) => {
                warn!(error = %e, "settings update rejected");
                self.gateway.notify(&format!("Invalid setting: {e}"));
                return Err(e.into());
            }
        };
        if change.is_empty() {
            return Ok(None);
        }
        if change.affects_pomodoro() {
            self.reconcile_pomodoro()?;
        }
        Ok(Some(Event::SettingsUpdated {
            settings: self.settings.settings().clone(),
            at: Utc::now(),
        }))
    }

    /// Set one setting by its persisted key from text (`workMinutes`, `30`).
    pub fn set_setting(&mut self, key: &str, value: &str) -> Result<Option<Event>> {
        let patch = match SettingsPatch::from_key_value(key, value) {
            Ok(patch) => patch,
            Err(e) => {
                self.gateway.notify(&format!("Invalid setting: {e}"));
                return Err(e);
            }
        };
        self.update_settings(&patch)
    }

    /// Write pending settings whose debounce deadline has passed.
    pub fn flush_settings_due(&mut self) -> Result<bool> {
        self.flush_settings_due_at(Instant::now())
    }

    pub fn flush_settings_due_at(&mut self, now: Instant) -> Result<bool> {
        self.settings.flush_due(now)
    }

    /// Stop the clock and write any pending settings.
    pub fn shutdown(&mut self) -> Result<()> {
        self.clock.stop_ticking();
        self.settings.flush()?;
        Ok(())
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Ask to save pending settings. `Ok(false)` when the user declines;
    /// the caller then leaves its action undone.
    async fn save_pending_settings(&mut self) -> Result<bool> {
        if !self.settings.has_pending_write() {
            return Ok(true);
        }
        if !self.gateway.confirm(UNSAVED_SETTINGS_QUESTION).await {
            return Ok(false);
        }
        if let Err(e) = self.settings.flush() {
            self.gateway.notify(&format!("Could not save settings: {e}"));
            return Err(e);
        }
        Ok(true)
    }

    fn reset_state(&mut self) {
        self.run_state = RunState::Idle;
        self.time_counter = 0;
        self.laps.clear();
        self.timer_input = TimerInput::default();
        if self.mode == Mode::Pomodoro {
            self.cycle = PomodoroCycle::new();
            self.time_counter = self.settings.settings().work_secs();
        }
    }

    fn advance_phase(&mut self, skipped: bool) -> Event {
        let settings = self.settings.settings();
        let transition = self.cycle.complete_phase(settings.sessions_until_long_break);
        self.time_counter = settings.phase_secs(transition.to);
        self.run_state = RunState::Idle;
        info!(
            from = ?transition.from,
            to = ?transition.to,
            session = self.cycle.session_index(),
            completed = self.cycle.completed_work_sessions(),
            skipped,
            "pomodoro phase advanced"
        );
        self.gateway.notify(transition.message);
        Event::PhaseAdvanced {
            from: transition.from,
            to: transition.to,
            session_index: self.cycle.session_index(),
            completed_work_sessions: self.cycle.completed_work_sessions(),
            duration_secs: self.time_counter,
            skipped,
            at: Utc::now(),
        }
    }

    fn reconcile_pomodoro(&mut self) -> Result<()> {
        let settings = self.settings.settings();
        let sessions = settings.sessions_until_long_break;
        if self.cycle.reconcile(sessions) {
            info!(
                sessions,
                completed = self.cycle.completed_work_sessions(),
                session = self.cycle.session_index(),
                "pomodoro cycle clamped to new length"
            );
        }
        if let Err(e) = self.cycle.check_invariant(sessions) {
            error!(error = %e, "pomodoro cycle out of range after settings change");
            return Err(e);
        }
        if self.mode == Mode::Pomodoro && self.run_state != RunState::Running {
            self.time_counter = settings.phase_secs(self.cycle.phase());
        }
        Ok(())
    }
}

impl<G: NotificationGateway> fmt::Debug for TimerEngine<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerEngine")
            .field("mode", &self.mode)
            .field("run_state", &self.run_state)
            .field("time_counter", &self.time_counter)
            .field("laps", &self.laps)
            .field("cycle", &self.cycle)
            .field("settings", &self.settings)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

/// Convert a raw `CoreError` from a rejected input into the message shown
/// to the user.
pub fn user_message(err: &CoreError) -> String {
    match err {
        CoreError::InvalidInput(InvalidInputError::ZeroDuration) => SET_TIME_FIRST.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{GatewayCall, RecordingGateway};
    use crate::timer::PomodoroPhase;
    use crate::settings::MemoryBackend;
    use std::time::Duration;

    fn engine_with(gateway: RecordingGateway) -> TimerEngine<RecordingGateway> {
        TimerEngine::new(SettingsStore::in_memory(), gateway, ClockDriver::manual())
    }

    fn engine() -> TimerEngine<RecordingGateway> {
        engine_with(RecordingGateway::new())
    }

    fn pomodoro_engine() -> TimerEngine<RecordingGateway> {
        let mut engine = engine();
        engine.switch_mode(Mode::Pomodoro);
        engine
    }

    /// Tick until the countdown ends, returning the completion event.
    fn run_out(engine: &mut TimerEngine<RecordingGateway>) -> Option<Event> {
        let mut last = None;
        while engine.is_running() {
            last = engine.on_tick();
        }
        last
    }

    #[tokio::test]
    async fn start_timer_uses_input() {
        let mut engine = engine();
        let event = engine
            .start_with(TimerInput::clamped(1, 2, 3))
            .await
            .unwrap();
        assert!(matches!(
            event,
            Some(Event::TimerStarted {
                mode: Mode::Timer,
                duration_secs: 3723,
                ..
            })
        ));
        assert_eq!(engine.time_counter(), 3723);
        assert_eq!(engine.run_state(), RunState::Running);
        assert!(engine.clock().is_ticking());
    }

    #[tokio::test]
    async fn start_timer_without_time_is_rejected() {
        let mut engine = engine();
        let err = engine.start().await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidInput(InvalidInputError::ZeroDuration)
        ));
        assert_eq!(engine.run_state(), RunState::Idle);
        assert_eq!(engine.time_counter(), 0);
        assert!(!engine.clock().is_ticking());
        assert_eq!(engine.gateway().notifications(), vec![SET_TIME_FIRST]);
        assert_eq!(user_message(&err), SET_TIME_FIRST);
    }

    #[tokio::test]
    async fn start_while_running_is_noop() {
        let mut engine = engine();
        engine.start_with(TimerInput::clamped(0, 1, 0)).await.unwrap();
        let generation = engine.clock().generation();
        assert!(engine.start().await.unwrap().is_none());
        assert_eq!(engine.clock().generation(), generation);
    }

    #[tokio::test]
    async fn pause_twice_equals_pause_once() {
        let mut engine = engine();
        engine.start_with(TimerInput::clamped(0, 0, 10)).await.unwrap();
        engine.on_tick();
        assert!(engine.pause().is_some());
        let after_first = engine.snapshot();
        assert!(engine.pause().is_none());
        assert_eq!(engine.snapshot(), after_first);
        assert_eq!(engine.run_state(), RunState::Paused);
        assert_eq!(engine.time_counter(), 9);
    }

    #[tokio::test]
    async fn paused_timer_ignores_ticks_and_resumes() {
        let mut engine = engine();
        engine.start_with(TimerInput::clamped(0, 0, 10)).await.unwrap();
        engine.pause();
        assert!(engine.on_tick().is_none());
        assert_eq!(engine.time_counter(), 10);

        let event = engine.start().await.unwrap();
        assert!(matches!(
            event,
            Some(Event::TimerResumed { time_counter: 10, .. })
        ));
        engine.on_tick();
        assert_eq!(engine.time_counter(), 9);
    }

    #[tokio::test]
    async fn timer_reaching_zero_notifies_and_plays_sound() {
        let mut engine = engine();
        engine.start_with(TimerInput::clamped(0, 0, 3)).await.unwrap();
        let event = run_out(&mut engine);
        assert!(matches!(event, Some(Event::TimerCompleted { .. })));
        assert_eq!(engine.time_counter(), 0);
        assert_eq!(engine.run_state(), RunState::Idle);
        assert!(!engine.clock().is_ticking());
        assert_eq!(
            engine.gateway().calls(),
            vec![
                GatewayCall::PlaySound(Sound::Sine),
                GatewayCall::Notify(TIMES_UP.to_string()),
            ]
        );
        // Counter stays at zero.
        assert!(engine.on_tick().is_none());
        assert_eq!(engine.time_counter(), 0);
    }

    #[tokio::test]
    async fn silent_sound_is_not_played() {
        let mut engine = engine();
        engine
            .update_settings(&SettingsPatch {
                sound: Some(Sound::None),
                ..Default::default()
            })
            .unwrap();
        engine.start_with(TimerInput::clamped(0, 0, 1)).await.unwrap();
        run_out(&mut engine);
        assert!(engine.gateway().sounds_played().is_empty());
    }

    #[tokio::test]
    async fn stopwatch_laps_do_not_disturb_counting() {
        let mut engine = engine();
        engine.switch_mode(Mode::Stopwatch);
        engine.start().await.unwrap();
        for _ in 0..3 {
            engine.on_tick();
        }
        let event = engine.lap();
        assert!(matches!(
            event,
            Some(Event::LapRecorded {
                lap: Lap { index: 1, seconds: 3 },
                ..
            })
        ));
        engine.on_tick();
        engine.on_tick();
        engine.lap();
        assert_eq!(engine.time_counter(), 5);
        assert_eq!(
            engine.laps(),
            &[Lap { index: 1, seconds: 3 }, Lap { index: 2, seconds: 5 }]
        );
        let recent: Vec<u64> = engine.laps_recent_first().map(|l| l.seconds).collect();
        assert_eq!(recent, vec![5, 3]);
    }

    #[tokio::test]
    async fn lap_requires_running_stopwatch() {
        let mut engine = engine();
        engine.start_with(TimerInput::clamped(0, 1, 0)).await.unwrap();
        assert!(engine.lap().is_none());

        engine.switch_mode(Mode::Stopwatch);
        assert!(engine.lap().is_none());
        assert!(engine.laps().is_empty());
    }

    #[tokio::test]
    async fn reset_clears_laps_and_input() {
        let mut engine = engine();
        engine.switch_mode(Mode::Stopwatch);
        engine.start().await.unwrap();
        engine.on_tick();
        engine.lap();
        engine.reset();
        assert_eq!(engine.time_counter(), 0);
        assert!(engine.laps().is_empty());
        assert_eq!(engine.run_state(), RunState::Idle);
        assert!(!engine.clock().is_ticking());

        engine.switch_mode(Mode::Timer);
        engine.set_timer_input(TimerInput::clamped(0, 5, 0));
        engine.reset();
        assert!(engine.timer_input().is_zero());
    }

    #[tokio::test]
    async fn switch_mode_invalidates_queued_ticks() {
        let mut engine = engine();
        engine.switch_mode(Mode::Stopwatch);
        engine.start().await.unwrap();
        let queued = engine.clock().pending_tick().unwrap();

        engine.switch_mode(Mode::Timer);
        assert!(!engine.clock().is_ticking());
        assert!(engine.handle_tick(queued).is_none());
        assert_eq!(engine.time_counter(), 0);
    }

    #[tokio::test]
    async fn pause_invalidates_queued_ticks() {
        let mut engine = engine();
        engine.start_with(TimerInput::clamped(0, 0, 30)).await.unwrap();
        let queued = engine.clock().pending_tick().unwrap();
        engine.handle_tick(queued);
        assert_eq!(engine.time_counter(), 29);

        engine.pause();
        engine.handle_tick(queued);
        assert_eq!(engine.time_counter(), 29);

        // Resuming starts a new generation; the old tick stays stale.
        engine.start().await.unwrap();
        engine.handle_tick(queued);
        assert_eq!(engine.time_counter(), 29);
        let fresh = engine.clock().pending_tick().unwrap();
        engine.handle_tick(fresh);
        assert_eq!(engine.time_counter(), 28);
    }

    #[tokio::test]
    async fn switching_to_pomodoro_loads_work_duration() {
        let engine = pomodoro_engine();
        assert_eq!(engine.time_counter(), 25 * 60);
        assert_eq!(*engine.pomodoro_cycle(), PomodoroCycle::new());
        assert_eq!(engine.snapshot().display, "00:25:00");
    }

    #[tokio::test]
    async fn pomodoro_full_cycle() {
        let mut engine = pomodoro_engine();
        let mut phases = vec![engine.pomodoro_cycle().phase()];
        while phases.len() < 8 {
            engine.start().await.unwrap();
            let event = run_out(&mut engine);
            assert!(matches!(event, Some(Event::PhaseAdvanced { skipped: false, .. })));
            // Engine waits for the user before the next phase.
            assert_eq!(engine.run_state(), RunState::Idle);
            phases.push(engine.pomodoro_cycle().phase());
        }
        use PomodoroPhase::*;
        assert_eq!(
            phases,
            vec![Work, ShortBreak, Work, ShortBreak, Work, ShortBreak, Work, LongBreak]
        );
        assert_eq!(engine.time_counter(), 15 * 60);

        engine.start().await.unwrap();
        run_out(&mut engine);
        assert_eq!(*engine.pomodoro_cycle(), PomodoroCycle::new());
        assert_eq!(engine.time_counter(), 25 * 60);
        assert_eq!(
            engine.gateway().notifications().last().map(String::as_str),
            Some("Long break over! Starting a new cycle.")
        );
    }

    #[tokio::test]
    async fn work_completion_sets_break_duration() {
        let mut engine = pomodoro_engine();
        engine.start().await.unwrap();
        let event = run_out(&mut engine);
        match event {
            Some(Event::PhaseAdvanced {
                from,
                to,
                session_index,
                completed_work_sessions,
                duration_secs,
                ..
            }) => {
                assert_eq!(from, PomodoroPhase::Work);
                assert_eq!(to, PomodoroPhase::ShortBreak);
                assert_eq!(session_index, 2);
                assert_eq!(completed_work_sessions, 1);
                assert_eq!(duration_secs, 300);
            }
            other => panic!("expected PhaseAdvanced, got {other:?}"),
        }
        assert_eq!(engine.time_counter(), 300);
        assert_eq!(engine.gateway().sounds_played(), vec![Sound::Sine]);
    }

    #[tokio::test]
    async fn skip_requires_confirmation() {
        let mut engine = engine_with(RecordingGateway::with_answers([false]));
        engine.switch_mode(Mode::Pomodoro);
        engine.start().await.unwrap();
        engine.on_tick();
        let before = engine.snapshot();

        assert!(engine.skip_pomodoro().await.is_none());
        assert_eq!(engine.snapshot(), before);
        assert!(engine.clock().is_ticking());
        assert_eq!(
            engine.gateway().calls(),
            vec![GatewayCall::Confirm(SKIP_QUESTION.to_string())]
        );
    }

    #[tokio::test]
    async fn confirmed_skip_runs_transition() {
        let mut engine = engine_with(RecordingGateway::with_answers([true]));
        engine.switch_mode(Mode::Pomodoro);
        engine.start().await.unwrap();
        let queued = engine.clock().pending_tick().unwrap();

        let event = engine.skip_pomodoro().await;
        assert!(matches!(
            event,
            Some(Event::PhaseAdvanced {
                to: PomodoroPhase::ShortBreak,
                skipped: true,
                ..
            })
        ));
        assert_eq!(engine.run_state(), RunState::Idle);
        assert_eq!(engine.time_counter(), 300);
        assert!(engine.handle_tick(queued).is_none());
        assert_eq!(engine.time_counter(), 300);
        // Skipping is silent.
        assert!(engine.gateway().sounds_played().is_empty());
    }

    #[tokio::test]
    async fn skip_offers_to_save_pending_settings() {
        let backend = MemoryBackend::new();
        let store = SettingsStore::open(backend.clone()).unwrap();
        let mut engine = TimerEngine::new(store, RecordingGateway::new(), ClockDriver::manual());
        engine.switch_mode(Mode::Pomodoro);
        engine.set_setting("shortBreakMinutes", "7").unwrap();

        // Declined: nothing saved, nothing skipped.
        engine.gateway().push_answer(false);
        assert!(engine.skip_pomodoro().await.is_none());
        assert_eq!(engine.pomodoro_cycle().phase(), PomodoroPhase::Work);
        assert!(engine.settings_store().has_pending_write());
        assert_eq!(backend.writes(), 0);

        engine.gateway().push_answer(true);
        engine.gateway().push_answer(true);
        let event = engine.skip_pomodoro().await;
        assert!(matches!(
            event,
            Some(Event::PhaseAdvanced {
                to: PomodoroPhase::ShortBreak,
                duration_secs: 420,
                ..
            })
        ));
        assert_eq!(backend.writes(), 1);
        let questions: Vec<_> = engine
            .gateway()
            .calls()
            .into_iter()
            .filter(|c| matches!(c, GatewayCall::Confirm(_)))
            .collect();
        assert_eq!(
            questions,
            vec![
                GatewayCall::Confirm(UNSAVED_SETTINGS_QUESTION.to_string()),
                GatewayCall::Confirm(UNSAVED_SETTINGS_QUESTION.to_string()),
                GatewayCall::Confirm(SKIP_QUESTION.to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn skip_outside_pomodoro_does_nothing() {
        let mut engine = engine_with(RecordingGateway::with_answers([true]));
        assert!(engine.skip_pomodoro().await.is_none());
        assert!(engine.gateway().calls().is_empty());
    }

    #[test]
    fn settings_round_trip_derives_seconds() {
        let mut engine = engine();
        engine
            .update_settings(&SettingsPatch {
                work_minutes: Some(30),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(engine.settings().work_minutes, 30);
        assert_eq!(engine.settings().phase_secs(PomodoroPhase::Work), 1800);
    }

    #[test]
    fn idle_pomodoro_picks_up_new_duration() {
        let mut engine = pomodoro_engine();
        let event = engine.set_setting("workMinutes", "40").unwrap();
        assert!(matches!(event, Some(Event::SettingsUpdated { .. })));
        assert_eq!(engine.time_counter(), 40 * 60);
    }

    #[tokio::test]
    async fn running_session_keeps_remaining_time() {
        let mut engine = pomodoro_engine();
        engine.start().await.unwrap();
        engine.on_tick();
        engine.set_setting("workMinutes", "50").unwrap();
        assert_eq!(engine.time_counter(), 25 * 60 - 1);
        assert!(engine.is_running());
    }

    #[tokio::test]
    async fn paused_session_picks_up_new_duration() {
        let mut engine = pomodoro_engine();
        engine.start().await.unwrap();
        engine.on_tick();
        engine.pause();
        engine.set_setting("workMinutes", "40").unwrap();
        assert_eq!(engine.time_counter(), 40 * 60);
        assert_eq!(engine.run_state(), RunState::Paused);
    }

    #[tokio::test]
    async fn durations_do_not_touch_other_modes() {
        let mut engine = engine();
        engine
            .start_with(TimerInput::clamped(0, 0, 30))
            .await
            .unwrap();
        engine.on_tick();
        engine.set_setting("workMinutes", "40").unwrap();
        assert_eq!(engine.time_counter(), 29);
        assert!(engine.is_running());

        engine.switch_mode(Mode::Stopwatch);
        engine.start().await.unwrap();
        engine.on_tick();
        engine.set_setting("shortBreakMinutes", "10").unwrap();
        assert_eq!(engine.time_counter(), 1);
    }

    #[tokio::test]
    async fn shrinking_sessions_clamps_cycle() {
        let mut engine = pomodoro_engine();
        // Finish three work sessions and their breaks.
        for _ in 0..6 {
            engine.start().await.unwrap();
            run_out(&mut engine);
        }
        assert_eq!(engine.pomodoro_cycle().completed_work_sessions(), 3);
        assert_eq!(engine.pomodoro_cycle().phase(), PomodoroPhase::Work);

        engine.set_setting("sessionsUntilLongBreak", "2").unwrap();
        let cycle = engine.pomodoro_cycle();
        assert_eq!(cycle.completed_work_sessions(), 1);
        assert!(cycle.session_index() <= 2);
        assert_eq!(engine.snapshot().session_dots.len(), 2);

        // Let the debounced write land so start does not prompt.
        engine
            .flush_settings_due_at(Instant::now() + Duration::from_secs(1))
            .unwrap();
        // Next work session completes the shortened cycle.
        engine.start().await.unwrap();
        run_out(&mut engine);
        assert_eq!(engine.pomodoro_cycle().phase(), PomodoroPhase::LongBreak);
    }

    #[test]
    fn invalid_settings_leave_everything_unchanged() {
        let mut engine = pomodoro_engine();
        let before = engine.snapshot();
        let err = engine
            .update_settings(&SettingsPatch {
                work_minutes: Some(45),
                long_break_minutes: Some(0),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(engine.snapshot(), before);
        assert!(!engine.settings_store().has_pending_write());
        assert_eq!(engine.gateway().notifications().len(), 1);
    }

    #[tokio::test]
    async fn unsaved_settings_prompt_declined_blocks_start() {
        let mut engine = engine_with(RecordingGateway::with_answers([false]));
        engine.switch_mode(Mode::Pomodoro);
        engine.set_setting("shortBreakMinutes", "10").unwrap();

        assert!(engine.start().await.unwrap().is_none());
        assert_eq!(engine.run_state(), RunState::Idle);
        assert!(engine.settings_store().has_pending_write());
    }

    #[tokio::test]
    async fn unsaved_settings_prompt_accepted_saves_then_starts() {
        let backend = MemoryBackend::new();
        let store = SettingsStore::open(backend.clone()).unwrap();
        let mut engine = TimerEngine::new(
            store,
            RecordingGateway::with_answers([true]),
            ClockDriver::manual(),
        );
        engine.switch_mode(Mode::Pomodoro);
        engine.set_setting("workMinutes", "20").unwrap();

        let event = engine.start().await.unwrap();
        assert!(matches!(
            event,
            Some(Event::TimerStarted { duration_secs: 1200, .. })
        ));
        assert_eq!(backend.writes(), 1);
        assert!(!engine.settings_store().has_pending_write());
    }

    #[test]
    fn settings_flush_after_debounce() {
        let backend = MemoryBackend::new();
        let store = SettingsStore::open(backend.clone()).unwrap();
        let mut engine = TimerEngine::new(store, RecordingGateway::new(), ClockDriver::manual());
        let t0 = Instant::now();
        let patch = SettingsPatch {
            volume: Some(0.8),
            ..Default::default()
        };
        engine.update_settings_at(&patch, t0).unwrap();
        assert!(!engine.flush_settings_due_at(t0).unwrap());
        assert!(engine
            .flush_settings_due_at(t0 + Duration::from_millis(300))
            .unwrap());
        assert_eq!(backend.writes(), 1);
    }

    #[test]
    fn shutdown_flushes_pending_settings() {
        let backend = MemoryBackend::new();
        let store = SettingsStore::open(backend.clone()).unwrap();
        let mut engine = TimerEngine::new(store, RecordingGateway::new(), ClockDriver::manual());
        engine.set_setting("soundId", "bell").unwrap();
        engine.shutdown().unwrap();
        assert_eq!(backend.stored().unwrap().sound, Sound::Bell);
    }

    #[test]
    fn preview_plays_without_selecting() {
        let engine = engine();
        engine.preview_sound(Sound::Chime);
        engine.preview_sound(Sound::None);
        assert_eq!(engine.gateway().sounds_played(), vec![Sound::Chime]);
        assert_eq!(engine.settings().sound, Sound::Sine);
    }

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("Pomodoro".parse::<Mode>().unwrap(), Mode::Pomodoro);
        assert!(matches!(
            "lap".parse::<Mode>(),
            Err(InvalidInputError::UnknownMode(_))
        ));
    }

    #[test]
    fn snapshot_serializes_for_shells() {
        let engine = pomodoro_engine();
        let json = serde_json::to_value(engine.snapshot()).unwrap();
        assert_eq!(json["mode"], "pomodoro");
        assert_eq!(json["run_state"], "idle");
        assert_eq!(json["pomodoro_cycle"]["phase"], "work");
        assert_eq!(json["settings"]["workMinutes"], 25);
    }
}
