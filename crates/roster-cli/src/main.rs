//! Roster CLI
//!
//! Replays a recorded chat protocol transcript through the roster core and
//! prints every roster change, followed by the final roster.

use clap::Parser;
use roster_core::config::defaults::{CONFIG_DIR_NAME, CONFIG_FILE_NAME};
use roster_core::events::StdoutRosterSink;
use roster_core::RosterConfig;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

mod replay;

use replay::{Fixture, FixtureConnection};

/// Roster - replay chat presence transcripts against the roster core
///
/// Each transcript line is one JSON inbound item: a lifecycle event
/// (`{"event": "connecting", "isReconnect": false}`) or a server message
/// (`{"cmd": "NLN", "data": {...}}`).
#[derive(Parser, Debug)]
#[command(name = "roster")]
#[command(version, about, long_about = None)]
struct Args {
    /// Transcript file, or `-` for stdin
    #[arg(short, long, default_value = "-")]
    transcript: String,

    /// Fixture with API responses and profiles to serve during replay
    #[arg(long)]
    fixture: Option<PathBuf>,

    /// Character the recorded connection logged in as (overrides the fixture)
    #[arg(short, long, env = "ROSTER_CHARACTER")]
    character: Option<String>,

    /// Output format: text or json
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Configuration file
    #[arg(long, env = "ROSTER_CONFIG")]
    config: Option<PathBuf>,

    /// Print the final roster when the transcript ends
    #[arg(long)]
    dump: bool,
}

#[derive(Debug, Clone, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn load_config(path: Option<PathBuf>) -> Result<RosterConfig, String> {
    let path = match path {
        Some(path) => path,
        None => match dirs::config_dir()
            .map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
            .filter(|path| path.exists())
        {
            Some(path) => path,
            None => return Ok(RosterConfig::default()),
        },
    };
    tracing::info!("Loading configuration from {}", path.display());
    RosterConfig::from_json_file(&path).map_err(String::from)
}

async fn run(args: Args) -> Result<(), String> {
    let config = load_config(args.config)?;

    let mut fixture = match &args.fixture {
        Some(path) => Fixture::from_json_file(path)?,
        None => Fixture::default(),
    };
    if let Some(character) = args.character {
        fixture.character = character;
    }
    if fixture.character.is_empty() {
        tracing::warn!("No own character given; identity will never be confirmed");
    }

    let json_output = matches!(args.format, OutputFormat::Json);
    let sink = Arc::new(StdoutRosterSink::new(json_output));
    let connection = Arc::new(FixtureConnection::new(fixture));

    tracing::info!("Replaying transcript from {}", args.transcript);
    let outcome = if args.transcript == "-" {
        let reader = BufReader::new(tokio::io::stdin());
        replay::run_replay(reader, connection, sink, config).await?
    } else {
        let file = tokio::fs::File::open(&args.transcript)
            .await
            .map_err(|e| format!("Failed to open {}: {e}", args.transcript))?;
        replay::run_replay(BufReader::new(file), connection, sink, config).await?
    };

    tracing::info!(
        "Replayed {} items ({} skipped, {} failed follow-ups)",
        outcome.stats.processed,
        outcome.skipped,
        outcome.stats.failed
    );

    if args.dump {
        if json_output {
            let json = serde_json::to_string_pretty(&outcome.snapshot)
                .map_err(|e| format!("Failed to serialize roster: {e}"))?;
            println!("{json}");
        } else {
            println!("{}", replay::format_summary(&outcome.snapshot));
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
