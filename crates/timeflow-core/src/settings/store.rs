//! Settings store with debounced persistence.
//!
//! Updates apply immediately in memory. Writing to the backend is deferred:
//! each successful change arms (or pushes back) a pending write with a
//! trailing deadline, so a burst of slider moves produces one write. The
//! shell calls [`SettingsStore::flush_due`] from its scheduler and
//! [`SettingsStore::flush`] on shutdown.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::{MemoryBackend, Settings, SettingsBackend, SettingsChange, SettingsPatch};
use crate::error::{Result, ValidationError};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// A write waiting for its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingWrite {
    /// When the first change of the current burst arrived.
    pub first_change: Instant,
    /// Write once `now >= deadline`.
    pub deadline: Instant,
    /// Number of updates collapsed into this write.
    pub changes: u32,
}

pub struct SettingsStore {
    settings: Settings,
    backend: Box<dyn SettingsBackend>,
    debounce: Duration,
    pending: Option<PendingWrite>,
}

impl std::fmt::Debug for SettingsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsStore")
            .field("settings", &self.settings)
            .field("debounce", &self.debounce)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

impl SettingsStore {
    /// Load settings from `backend`, falling back to defaults when nothing
    /// is stored yet. Out-of-range stored values are replaced by defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend exists but cannot be read or parsed.
    pub fn open(backend: impl SettingsBackend + 'static) -> Result<Self> {
        let settings = match backend.load()? {
            Some(stored) => {
                let sanitized = stored.clone().sanitized();
                if sanitized != stored {
                    warn!("stored settings had out-of-range values, using defaults for them");
                }
                sanitized
            }
            None => Settings::default(),
        };
        Ok(Self {
            settings,
            backend: Box::new(backend),
            debounce: DEFAULT_DEBOUNCE,
            pending: None,
        })
    }

    /// Store backed by a fresh [`MemoryBackend`].
    pub fn in_memory() -> Self {
        Self {
            settings: Settings::default(),
            backend: Box::new(MemoryBackend::new()),
            debounce: DEFAULT_DEBOUNCE,
            pending: None,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    pub fn pending_write(&self) -> Option<PendingWrite> {
        self.pending
    }

    pub fn has_pending_write(&self) -> bool {
        self.pending.is_some()
    }

    /// Validate and apply `patch`.
    ///
    /// Every present field is validated before anything is applied, so a
    /// rejected patch leaves the settings exactly as they were.
    pub fn update(
        &mut self,
        patch: &SettingsPatch,
        now: Instant,
    ) -> Result<SettingsChange, ValidationError> {
        patch.validate()?;

        let before = self.settings.clone();
        let s = &mut self.settings;
        if let Some(v) = patch.work_minutes {
            s.work_minutes = v;
        }
        if let Some(v) = patch.short_break_minutes {
            s.short_break_minutes = v;
        }
        if let Some(v) = patch.long_break_minutes {
            s.long_break_minutes = v;
        }
        if let Some(v) = patch.sessions_until_long_break {
            s.sessions_until_long_break = v;
        }
        if let Some(v) = patch.sound {
            s.sound = v;
        }
        if let Some(v) = patch.volume {
            s.volume = v;
        }

        let change = SettingsChange {
            durations: before.work_minutes != s.work_minutes
                || before.short_break_minutes != s.short_break_minutes
                || before.long_break_minutes != s.long_break_minutes,
            sessions_until_long_break: before.sessions_until_long_break
                != s.sessions_until_long_break,
            sound: before.sound != s.sound,
            volume: before.volume != s.volume,
        };

        if !change.is_empty() {
            self.schedule_write(now);
        }
        Ok(change)
    }

    /// Set one field by its persisted key from text.
    pub fn set(&mut self, key: &str, value: &str, now: Instant) -> Result<SettingsChange> {
        let patch = SettingsPatch::from_key_value(key, value)?;
        Ok(self.update(&patch, now)?)
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.settings.get(key)
    }

    /// Restore every field to its default.
    pub fn reset_to_defaults(&mut self, now: Instant) -> SettingsChange {
        let patch = SettingsPatch::from(&Settings::default());
        // Defaults always validate.
        self.update(&patch, now).unwrap_or_default()
    }

    /// Write if a pending write's deadline has passed. Returns whether a
    /// write happened.
    pub fn flush_due(&mut self, now: Instant) -> Result<bool> {
        match self.pending {
            Some(pending) if now >= pending.deadline => self.flush(),
            _ => Ok(false),
        }
    }

    /// Write now if anything is pending.
    pub fn flush(&mut self) -> Result<bool> {
        let Some(pending) = self.pending.take() else {
            return Ok(false);
        };
        match self.backend.save(&self.settings) {
            Ok(()) => {
                debug!(changes = pending.changes, "settings persisted");
                Ok(true)
            }
            Err(e) => {
                warn!(error = %e, "failed to persist settings");
                Err(e)
            }
        }
    }

    fn schedule_write(&mut self, now: Instant) {
        let deadline = now + self.debounce;
        self.pending = Some(match self.pending {
            Some(p) => PendingWrite {
                first_change: p.first_change,
                deadline,
                changes: p.changes + 1,
            },
            None => PendingWrite {
                first_change: now,
                deadline,
                changes: 1,
            },
        });
    }
}

impl Drop for SettingsStore {
    fn drop(&mut self) {
        if self.pending.is_some() {
            if let Err(e) = self.flush() {
                warn!(error = %e, "settings lost on drop");
            }
        }
    }
}
