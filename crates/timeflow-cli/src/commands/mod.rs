pub mod config;
pub mod run;
pub mod sound;

use std::path::PathBuf;

use timeflow_core::{SettingsStore, TomlFileBackend};

/// Open the settings store at `path`, or at the default location.
pub fn open_store(path: Option<PathBuf>) -> Result<SettingsStore, Box<dyn std::error::Error>> {
    let backend = match path {
        Some(path) => TomlFileBackend::new(path),
        None => TomlFileBackend::default_location()?,
    };
    Ok(SettingsStore::open(backend)?)
}
