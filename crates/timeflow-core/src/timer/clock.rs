//! Clock tick driver.
//!
//! The driver owns at most one tick source. Every `start_ticking` bumps a
//! generation number and each [`Tick`] carries the generation it was
//! produced for; the engine only acts on ticks the driver still `accepts`.
//! A tick already queued in a channel when the clock is stopped or
//! restarted is therefore ignored.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    generation: u64,
}

impl Tick {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug)]
enum Source {
    /// No background task; the owner produces ticks via `pending_tick`.
    Manual,
    /// A tokio interval task sending ticks over a channel.
    Interval {
        sender: mpsc::UnboundedSender<Tick>,
        period: Duration,
    },
}

#[derive(Debug)]
pub struct ClockDriver {
    source: Source,
    generation: u64,
    ticking: bool,
    task: Option<JoinHandle<()>>,
}

impl ClockDriver {
    /// Driver without a background source, for tests and callers that
    /// advance time themselves.
    pub fn manual() -> Self {
        Self {
            source: Source::Manual,
            generation: 0,
            ticking: false,
            task: None,
        }
    }

    /// Driver that sends one tick per `period` to `sender` while ticking.
    /// The interval task is spawned on the current tokio runtime.
    pub fn interval(sender: mpsc::UnboundedSender<Tick>, period: Duration) -> Self {
        Self {
            source: Source::Interval { sender, period },
            generation: 0,
            ticking: false,
            task: None,
        }
    }

    /// Begin ticking. Any previous source is stopped first, so there is
    /// never more than one live source.
    pub fn start_ticking(&mut self) {
        self.stop_ticking();
        self.generation += 1;
        self.ticking = true;

        if let Source::Interval { sender, period } = &self.source {
            let tick = Tick {
                generation: self.generation,
            };
            let sender = sender.clone();
            let period = *period;
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    self.task = Some(handle.spawn(async move {
                        let start = tokio::time::Instant::now() + period;
                        let mut interval = tokio::time::interval_at(start, period);
                        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                        loop {
                            interval.tick().await;
                            if sender.send(tick).is_err() {
                                break;
                            }
                        }
                    }));
                }
                Err(e) => warn!(error = %e, "no tokio runtime, clock will not tick"),
            }
        }
        debug!(generation = self.generation, "clock started");
    }

    /// Stop ticking. Safe to call when already stopped.
    pub fn stop_ticking(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        if self.ticking {
            debug!(generation = self.generation, "clock stopped");
        }
        self.ticking = false;
    }

    pub fn is_ticking(&self) -> bool {
        self.ticking
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether `tick` belongs to the live source.
    pub fn accepts(&self, tick: Tick) -> bool {
        self.ticking && tick.generation == self.generation
    }

    /// The tick the live source would deliver next, if ticking.
    pub fn pending_tick(&self) -> Option<Tick> {
        self.ticking.then_some(Tick {
            generation: self.generation,
        })
    }
}

impl Drop for ClockDriver {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
