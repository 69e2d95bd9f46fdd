use clap::Subcommand;
use serde_json::json;
use std::path::PathBuf;

use timeflow_core::{ClockDriver, Sound, TimerEngine};

use super::open_store;
use crate::gateway::TerminalGateway;

#[derive(Subcommand)]
pub enum SoundAction {
    /// List the available sounds
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Play a sound at the configured volume
    Preview {
        /// Sound id (sine, square, triangle, chime, bell, none)
        sound: Sound,
        /// Print tones as JSON instead of ringing the terminal bell
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: SoundAction, path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        SoundAction::List { json } => {
            if json {
                let sounds: Vec<_> = Sound::ALL
                    .iter()
                    .map(|s| {
                        json!({
                            "id": s.id(),
                            "name": s.display_name(),
                            "description": s.description(),
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&sounds)?);
            } else {
                for sound in Sound::ALL {
                    println!(
                        "{:<9} {:<13} {}",
                        sound.id(),
                        sound.display_name(),
                        sound.description()
                    );
                }
            }
        }
        SoundAction::Preview { sound, json } => {
            let store = open_store(path)?;
            let engine = TimerEngine::new(
                store,
                TerminalGateway::without_input(json),
                ClockDriver::manual(),
            );
            if sound.is_silent() {
                println!("{} plays nothing", sound.id());
            }
            engine.preview_sound(sound);
        }
    }
    Ok(())
}
