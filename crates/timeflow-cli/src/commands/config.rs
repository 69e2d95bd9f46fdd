use clap::Subcommand;
use std::path::PathBuf;
use std::time::Instant;

use timeflow_core::Settings;

use super::open_store;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a settings value
    Get {
        /// Settings key (e.g. "workMinutes", "soundId")
        key: String,
    },
    /// Set a settings value
    Set {
        /// Settings key
        key: String,
        /// New value
        value: String,
    },
    /// List all settings
    List,
    /// List the available keys
    Keys,
    /// Reset settings to defaults
    Reset,
}

pub fn run(action: ConfigAction, path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = open_store(path)?;
    match action {
        ConfigAction::Get { key } => match store.get(&key) {
            Some(value) => println!("{value}"),
            None => return Err(format!("unknown key: {key}").into()),
        },
        ConfigAction::Set { key, value } => {
            store.set(&key, &value, Instant::now())?;
            store.flush()?;
            println!("ok");
        }
        ConfigAction::List => {
            let json = serde_json::to_string_pretty(store.settings())?;
            println!("{json}");
        }
        ConfigAction::Keys => {
            for key in Settings::keys() {
                println!("{key}");
            }
        }
        ConfigAction::Reset => {
            store.reset_to_defaults(Instant::now());
            store.flush()?;
            println!("settings reset to defaults");
        }
    }
    Ok(())
}
