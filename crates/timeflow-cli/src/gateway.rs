//! Terminal implementation of the notification gateway.
//!
//! Messages and sounds go to stdout. Confirmations read the next line from
//! the same stdin line source the shell reads commands from, so answers are
//! consumed in the order they were typed.

use std::sync::Arc;

use serde_json::json;
use timeflow_core::{ConfirmFuture, NotificationGateway, Sound};
use tokio::sync::{mpsc, Mutex};

/// Lines read from stdin, shared between the shell loop and prompts.
pub type LineSource = Arc<Mutex<mpsc::UnboundedReceiver<String>>>;

pub struct TerminalGateway {
    lines: Option<LineSource>,
    json: bool,
}

impl TerminalGateway {
    pub fn new(lines: LineSource, json: bool) -> Self {
        Self {
            lines: Some(lines),
            json,
        }
    }

    /// Gateway with no input; every confirmation is declined.
    pub fn without_input(json: bool) -> Self {
        Self { lines: None, json }
    }
}

/// `Some(true)` for yes, `Some(false)` for no, `None` for anything else.
pub fn parse_answer(line: &str) -> Option<bool> {
    match line.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "ok" | "confirm" => Some(true),
        "n" | "no" | "cancel" => Some(false),
        _ => None,
    }
}

impl NotificationGateway for TerminalGateway {
    fn notify(&self, message: &str) {
        if self.json {
            println!("{}", json!({ "type": "Notification", "message": message }));
        } else {
            println!("** {message}");
        }
    }

    fn confirm(&self, question: &str) -> ConfirmFuture<'_> {
        if self.json {
            println!("{}", json!({ "type": "Confirm", "question": question }));
        } else {
            println!("?? {question} [y/n]");
        }
        let lines = self.lines.clone();
        Box::pin(async move {
            let Some(lines) = lines else {
                return false;
            };
            let mut rx = lines.lock().await;
            loop {
                match rx.recv().await {
                    Some(line) => match parse_answer(&line) {
                        Some(answer) => return answer,
                        None => println!("please answer y or n"),
                    },
                    // stdin closed
                    None => return false,
                }
            }
        })
    }

    fn play_sound(&self, sound: Sound, volume: f64) {
        let tones = sound.tones(volume);
        if self.json {
            println!(
                "{}",
                json!({ "type": "Sound", "sound": sound, "volume": volume, "tones": tones })
            );
        } else {
            // One terminal bell per tone.
            let bells = "\x07".repeat(tones.len());
            println!("{bells}~ {} ~", sound.display_name());
        }
    }
}
