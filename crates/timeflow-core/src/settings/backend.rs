//! Where settings are persisted.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::debug;

use super::Settings;
use crate::error::{ConfigError, Result};

/// Returns `~/.config/timeflow[-dev]/` based on TIMEFLOW_ENV.
///
/// Set TIMEFLOW_ENV=dev to use the development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("TIMEFLOW_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("timeflow-dev")
    } else {
        base_dir.join("timeflow")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Storage for the flat settings record.
pub trait SettingsBackend: Send {
    /// Read the stored record. `Ok(None)` means nothing has been saved yet.
    fn load(&self) -> Result<Option<Settings>>;

    /// Overwrite the stored record.
    fn save(&self, settings: &Settings) -> Result<()>;
}

/// TOML file backend, `settings.toml` in the data directory by default.
#[derive(Debug, Clone)]
pub struct TomlFileBackend {
    path: PathBuf,
}

impl TomlFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backend at `<data_dir>/settings.toml`.
    pub fn default_location() -> Result<Self> {
        Ok(Self::new(data_dir()?.join("settings.toml")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsBackend for TomlFileBackend {
    fn load(&self) -> Result<Option<Settings>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ConfigError::LoadFailed {
                    path: self.path.clone(),
                    message: e.to_string(),
                }
                .into())
            }
        };
        let settings: Settings =
            toml::from_str(&content).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Ok(Some(settings))
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: self.path.clone(),
            message,
        };
        let content = toml::to_string_pretty(settings).map_err(|e| save_failed(e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| save_failed(e.to_string()))?;
        }
        std::fs::write(&self.path, content).map_err(|e| save_failed(e.to_string()))?;
        debug!(path = %self.path.display(), "settings written");
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    stored: Option<Settings>,
    writes: usize,
}

/// In-memory backend. Clones share the same storage, so a test can keep a
/// handle and inspect what the store wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend that already holds `settings`.
    pub fn with_settings(settings: Settings) -> Self {
        let backend = Self::new();
        if let Ok(mut state) = backend.state.lock() {
            state.stored = Some(settings);
        }
        backend
    }

    /// Number of `save` calls so far.
    pub fn writes(&self) -> usize {
        self.state.lock().map(|s| s.writes).unwrap_or(0)
    }

    pub fn stored(&self) -> Option<Settings> {
        self.state.lock().ok().and_then(|s| s.stored.clone())
    }
}

impl SettingsBackend for MemoryBackend {
    fn load(&self) -> Result<Option<Settings>> {
        Ok(self.stored())
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| crate::error::CoreError::InvariantViolation(e.to_string()))?;
        state.stored = Some(settings.clone());
        state.writes += 1;
        Ok(())
    }
}
