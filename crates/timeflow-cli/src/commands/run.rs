//! Interactive shell over the timer engine.
//!
//! Reads one command per line from stdin, forwards clock ticks to the
//! engine, and renders after every command and tick. Pending settings
//! writes are flushed on a short scheduler interval and on exit.

use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use timeflow_core::timer::{format_hms, user_message, SessionDot};
use timeflow_core::{
    ClockDriver, CoreError, Event, Mode, RunState, Snapshot, Sound, TimerEngine, TimerInput,
    TICK_PERIOD,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

use super::open_store;
use crate::gateway::{LineSource, TerminalGateway};

const FLUSH_INTERVAL: Duration = Duration::from_millis(100);

const HELP: &str = "\
commands:
  start [H:M:S]     start or resume (timer mode takes an optional duration)
  pause             pause
  reset             reset the current mode
  lap               record a stopwatch lap
  mode <m>          switch to timer, stopwatch or pomodoro
  skip              skip the current pomodoro phase
  set <key> <val>   change a setting (see `timeflow config keys`)
  preview <sound>   play a sound
  status            show the current state
  help              show this help
  quit              exit";

#[derive(Args)]
pub struct RunArgs {
    /// Mode to start in
    #[arg(long, default_value = "timer")]
    mode: Mode,
    /// Print events and snapshots as JSON lines
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum ShellCommand {
    Start(Option<TimerInput>),
    Pause,
    Reset,
    Lap,
    Mode(Mode),
    Skip,
    Set { key: String, value: String },
    Preview(Sound),
    Status,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Option<ShellCommand>, Box<dyn std::error::Error>> {
    let mut words = line.split_whitespace();
    let Some(name) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();
    let command = match (name.to_ascii_lowercase().as_str(), arg) {
        ("start" | "s", None) => ShellCommand::Start(None),
        ("start" | "s", Some(time)) => ShellCommand::Start(Some(time.parse()?)),
        ("pause" | "p", _) => ShellCommand::Pause,
        ("reset" | "r", _) => ShellCommand::Reset,
        ("lap" | "l", _) => ShellCommand::Lap,
        ("mode" | "m", Some(mode)) => ShellCommand::Mode(mode.parse()?),
        ("skip", _) => ShellCommand::Skip,
        ("set", Some(key)) => {
            let value = words.next().ok_or("usage: set <key> <value>")?;
            ShellCommand::Set {
                key: key.to_string(),
                value: value.to_string(),
            }
        }
        ("preview", Some(sound)) => ShellCommand::Preview(sound.parse()?),
        ("status", _) => ShellCommand::Status,
        ("help" | "?", _) => ShellCommand::Help,
        ("quit" | "exit" | "q", _) => ShellCommand::Quit,
        (other, _) => return Err(format!("unknown command '{other}', try 'help'").into()),
    };
    Ok(Some(command))
}

pub fn run(args: RunArgs, path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(shell(args, path));
    // The stdin reader may still be parked in a blocking read.
    runtime.shutdown_background();
    result
}

async fn shell(args: RunArgs, path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(path)?;

    let (line_tx, line_rx) = mpsc::unbounded_channel();
    let lines: LineSource = Arc::new(Mutex::new(line_rx));
    tokio::spawn(read_stdin(line_tx));

    let (tick_tx, mut tick_rx) = mpsc::unbounded_channel();
    let mut engine = TimerEngine::new(
        store,
        TerminalGateway::new(lines.clone(), args.json),
        ClockDriver::interval(tick_tx, TICK_PERIOD),
    );
    let json = args.json;

    if args.mode != engine.mode() {
        engine.switch_mode(args.mode);
    }
    render(&engine.snapshot(), json);

    let mut flush = tokio::time::interval(FLUSH_INTERVAL);
    loop {
        tokio::select! {
            Some(tick) = tick_rx.recv() => {
                if let Some(event) = engine.handle_tick(tick) {
                    print_event(&event, json);
                }
                render(&engine.snapshot(), json);
            }
            line = next_line(&lines) => {
                let Some(line) = line else {
                    debug!("stdin closed");
                    break;
                };
                match parse_command(&line) {
                    Ok(Some(ShellCommand::Quit)) => break,
                    Ok(Some(command)) => execute(&mut engine, command, json).await,
                    Ok(None) => {}
                    Err(e) => eprintln!("error: {e}"),
                }
            }
            _ = flush.tick() => {
                if let Err(e) = engine.flush_settings_due() {
                    warn!(error = %e, "settings flush failed");
                    eprintln!("error: {e}");
                }
            }
        }
    }

    engine.shutdown()?;
    Ok(())
}

async fn next_line(lines: &LineSource) -> Option<String> {
    lines.lock().await.recv().await
}

async fn read_stdin(tx: mpsc::UnboundedSender<String>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if tx.send(line).is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "stdin read failed");
                break;
            }
        }
    }
}

async fn execute(engine: &mut TimerEngine<TerminalGateway>, command: ShellCommand, json: bool) {
    let result: Result<Option<Event>, CoreError> = match command {
        ShellCommand::Start(Some(input)) => engine.start_with(input).await,
        ShellCommand::Start(None) => engine.start().await,
        ShellCommand::Pause => Ok(engine.pause()),
        ShellCommand::Reset => Ok(Some(engine.reset())),
        ShellCommand::Lap => Ok(engine.lap()),
        ShellCommand::Mode(mode) => Ok(Some(engine.switch_mode(mode))),
        ShellCommand::Skip => Ok(engine.skip_pomodoro().await),
        ShellCommand::Set { key, value } => engine.set_setting(&key, &value),
        ShellCommand::Preview(sound) => {
            engine.preview_sound(sound);
            Ok(None)
        }
        ShellCommand::Status => Ok(None),
        ShellCommand::Help => {
            println!("{HELP}");
            return;
        }
        ShellCommand::Quit => return,
    };

    match result {
        Ok(Some(event)) => print_event(&event, json),
        Ok(None) => {}
        // Already reported through the gateway.
        Err(CoreError::InvalidInput(_) | CoreError::Validation(_) | CoreError::Config(_)) => {}
        Err(e) => eprintln!("error: {}", user_message(&e)),
    }
    render(&engine.snapshot(), json);
}

fn print_event(event: &Event, json: bool) {
    if json {
        match serde_json::to_string(event) {
            Ok(line) => println!("{line}"),
            Err(e) => warn!(error = %e, "event not serializable"),
        }
    } else {
        debug!(?event, "engine event");
    }
}

fn render(snapshot: &Snapshot, json: bool) {
    if json {
        let line = serde_json::json!({ "type": "Snapshot", "snapshot": snapshot });
        println!("{line}");
        return;
    }

    let state = match snapshot.run_state {
        RunState::Idle => "idle",
        RunState::Running => "running",
        RunState::Paused => "paused",
    };
    let mut line = format!("[{}] {} {}", snapshot.mode, snapshot.display, state);
    match snapshot.mode {
        Mode::Pomodoro => {
            let cycle = &snapshot.pomodoro_cycle;
            let dots: String = snapshot
                .session_dots
                .iter()
                .map(|d| match d {
                    SessionDot::Completed => '●',
                    SessionDot::Current => '◐',
                    SessionDot::Pending => '○',
                })
                .collect();
            if cycle.phase().is_break() {
                line.push_str(&format!("  {}  {dots}", cycle.phase().label()));
            } else {
                line.push_str(&format!(
                    "  {} {} of {}  {dots}",
                    cycle.phase().label(),
                    cycle.session_index(),
                    snapshot.settings.sessions_until_long_break
                ));
            }
        }
        Mode::Stopwatch if !snapshot.laps.is_empty() => {
            let laps: Vec<String> = snapshot
                .laps
                .iter()
                .map(|lap| format!("#{} {}", lap.index, format_hms(lap.seconds)))
                .collect();
            line.push_str(&format!("  laps: {}", laps.join(", ")));
        }
        _ => {}
    }
    println!("{line}");
}
