use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod gateway;

#[derive(Parser)]
#[command(name = "timeflow", version, about = "TimeFlow timer, stopwatch and pomodoro CLI")]
struct Cli {
    /// Settings file (defaults to ~/.config/timeflow/settings.toml)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the interactive timer
    Run(commands::run::RunArgs),
    /// Settings management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Notification sounds
    Sound {
        #[command(subcommand)]
        action: commands::sound::SoundAction,
    },
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_logging();

    let cli = Cli::parse();
    let settings = cli.settings;
    let result = match cli.command {
        Commands::Run(args) => commands::run::run(args, settings),
        Commands::Config { action } => commands::config::run(action, settings),
        Commands::Sound { action } => commands::sound::run(action, settings),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
