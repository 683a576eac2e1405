//! Headless build processor.
//!
//! This binary runs one build world without graphics, controlled via JSON on
//! stdin/stdout.
//!
//! # Usage
//!
//! ```bash
//! # Interactive mode - read commands from stdin
//! cargo run -p fort_headless
//!
//! # Interactive mode with a custom config
//! cargo run -p fort_headless -- run --config build.ron
//!
//! # Replay a command file, responses on stdout
//! cargo run -p fort_headless -- script --input build.jsonl
//!
//! # Check a config file and print it with defaults filled in
//! cargo run -p fort_headless -- check-config build.ron
//! ```
//!
//! # Protocol
//!
//! Input (stdin): JSON commands, one per line
//! Output (stdout): JSON responses, one per line
//! Logs (stderr): Debug information

use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use fort_core::prelude::*;
use fort_headless::{Session, SessionError, SessionStats};

#[derive(Parser)]
#[command(name = "fort_headless")]
#[command(about = "Headless build-grid processor speaking JSON lines")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Read commands from stdin until quit or end of input
    Run {
        /// RON build config (defaults apply when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Run a JSON-lines command file
    Script {
        /// Command file, one JSON command per line
        #[arg(short, long)]
        input: PathBuf,

        /// RON build config (defaults apply when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Exit with failure if any command was answered with an error
        #[arg(long)]
        strict: bool,
    },

    /// Validate a RON build config and print it with defaults filled in
    CheckConfig {
        /// Config file
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command.unwrap_or(Commands::Run { config: None }) {
        Commands::Run { config } => run_stdin(config.as_deref()).map(|_| ExitCode::SUCCESS),
        Commands::Script {
            input,
            config,
            strict,
        } => run_script(&input, config.as_deref()).map(|stats| {
            if strict && stats.errors > 0 {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }),
        Commands::CheckConfig { file } => check_config(&file).map(|()| ExitCode::SUCCESS),
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = %err, "fort_headless failed");
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr; stdout is reserved for protocol responses.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn open_session(config: Option<&Path>) -> Result<Session> {
    match config {
        Some(path) => {
            tracing::info!(config = %path.display(), "Loading build config");
            Session::from_config_file(path)
        }
        None => Session::new(BuildConfig::default()),
    }
}

fn run_stdin(config: Option<&Path>) -> std::result::Result<SessionStats, SessionError> {
    let mut session = open_session(config)?;
    let stdin = io::stdin();
    let stdout = io::stdout();
    session.run(stdin.lock(), stdout.lock())
}

fn run_script(
    input: &Path,
    config: Option<&Path>,
) -> std::result::Result<SessionStats, SessionError> {
    let mut session = open_session(config)?;
    tracing::info!(input = %input.display(), "Running command script");
    let reader = BufReader::new(File::open(input)?);
    let stdout = io::stdout();
    session.run(reader, stdout.lock())
}

fn check_config(file: &Path) -> std::result::Result<(), SessionError> {
    let config = BuildConfig::load(file)?;
    println!("{}", config.to_ron_string()?);
    Ok(())
}
