//! Desktop Activity Tracker CLI
//!
//! Background activity tracking with sensitive-input redaction.

use anyhow::Context;
use clap::{Parser, Subcommand};
use crossbeam_channel::{bounded, Sender};
use desktop_activity_tracker::{
    collector::Collector,
    config::Config,
    core::{Collaborators, Command, LoggingSummarizer, Pipeline},
    foreground::{system_foreground, ManualForeground, SharedForeground},
    replay::{load_script, Replayer},
    storage::{JsonlSink, SealedFileStore},
    transparency::{create_shared_log_with_persistence, load_stats},
    PRIVACY_DECLARATION, VERSION,
};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "activity-tracker")]
#[command(version = VERSION)]
#[command(about = "Background desktop activity tracker with sensitive-input redaction", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the per-user config location)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the data directory from the configuration
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install the input hooks and track until Ctrl+C
    Start,

    /// Drive the pipeline from a JSON Lines replay script
    Replay {
        /// Path to the replay script
        script: PathBuf,
    },

    /// Show cumulative collection statistics
    Status,

    /// Display privacy declaration
    Privacy,

    /// Show configuration
    Config,

    /// Decrypt and list sealed credential records
    Credentials,
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("could not load configuration")?;
    if let Some(data_dir) = cli.data_dir {
        config.data_path = data_dir;
    }

    match cli.command {
        Commands::Start => cmd_start(&config),
        Commands::Replay { script } => cmd_replay(&config, &script),
        Commands::Status => cmd_status(&config),
        Commands::Privacy => {
            println!("{PRIVACY_DECLARATION}");
            Ok(())
        }
        Commands::Config => cmd_config(&config, cli.config.as_deref()),
        Commands::Credentials => cmd_credentials(&config),
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Build the file-backed collaborators rooted at the configured data path.
fn file_collaborators(
    config: &Config,
    foreground: SharedForeground,
) -> anyhow::Result<Collaborators> {
    config
        .ensure_directories()
        .context("could not create data directory")?;

    let sink = JsonlSink::open(&config.data_path).context("could not open activity files")?;
    let store =
        SealedFileStore::open(&config.data_path).context("could not open credential store")?;

    Ok(Collaborators {
        foreground,
        sink: Arc::new(sink),
        store: Arc::new(store),
        summarizer: Arc::new(LoggingSummarizer),
        stats: create_shared_log_with_persistence(config.transparency_path()),
    })
}

fn cmd_start(config: &Config) -> anyhow::Result<()> {
    println!("Desktop Activity Tracker v{VERSION}");
    println!();

    let collaborators = file_collaborators(config, system_foreground())?;
    let pipeline = Pipeline::start(config, collaborators).context("could not start tracking")?;

    let mut collector = Collector::new(pipeline.input_hook());
    if let Err(e) = collector.start() {
        pipeline.stop();
        return Err(e).context("could not install input hooks");
    }

    println!("Tracking started.");
    println!("  Session: {}", pipeline.session_id());
    println!("  Data directory: {:?}", config.data_path);
    println!("  Batch size: {}", config.batch_size);
    println!(
        "  Flush interval: {:.1}s",
        config.flush_interval.as_secs_f64()
    );
    println!("  Idle threshold: {}s", config.idle_threshold_secs);
    println!();
    println!("Type `summarize` and press Enter to request a summary.");
    println!("Press Ctrl+C to stop");
    println!();

    let (stop_tx, stop_rx) = bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = stop_tx.try_send(());
    })
    .context("could not set Ctrl+C handler")?;

    spawn_stdin_commands(pipeline.commands());

    let _ = stop_rx.recv();

    println!();
    println!("Stopping...");
    collector.stop();
    let stats = pipeline.stop();
    println!();
    println!("{}", stats.summary());
    Ok(())
}

/// Forward commands typed on stdin to the pipeline.
///
/// The reader thread is detached; a blocked stdin read cannot be cancelled.
fn spawn_stdin_commands(commands: Sender<Command>) {
    let spawned = thread::Builder::new()
        .name("stdin-commands".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<Command>() {
                    Ok(command) => {
                        if commands.send(command).is_err() {
                            return;
                        }
                    }
                    Err(e) => eprintln!("{e}"),
                }
            }
            debug!("stdin closed");
        });

    if let Err(e) = spawned {
        warn!("stdin commands unavailable: {e}");
    }
}

fn cmd_replay(config: &Config, script: &Path) -> anyhow::Result<()> {
    let steps = load_script(script).with_context(|| format!("could not read {script:?}"))?;

    let foreground = Arc::new(ManualForeground::new());
    let collaborators = file_collaborators(config, foreground.clone())?;
    let pipeline = Pipeline::start(config, collaborators).context("could not start tracking")?;

    println!("Replaying {} step(s) from {script:?}", steps.len());
    let report = Replayer::new(
        &foreground,
        pipeline.input_hook(),
        pipeline.commands(),
        pipeline.stats(),
    )
    .play(&steps);

    let stats = pipeline.stop();
    println!("  Keys sent: {}", report.keys_sent);
    println!("  Keys dropped: {}", report.keys_dropped);
    println!("  Window changes: {}", report.window_changes);
    println!("  Summaries requested: {}", report.summaries);
    println!();
    println!("{}", stats.summary());
    Ok(())
}

fn cmd_status(config: &Config) -> anyhow::Result<()> {
    println!("Desktop Activity Tracker Status");
    println!("===============================");
    println!();
    println!("Data directory: {:?}", config.data_path);
    println!("Sensitive keywords: {}", config.sensitive_keywords.join(", "));
    println!();

    match load_stats(&config.transparency_path()).context("could not read statistics")? {
        Some(stats) => println!("{}", stats.summary()),
        None => println!("No previous session data found."),
    }
    Ok(())
}

fn cmd_config(config: &Config, path: Option<&Path>) -> anyhow::Result<()> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(Config::config_path);

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {path:?}");
    println!();
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

fn cmd_credentials(config: &Config) -> anyhow::Result<()> {
    let store =
        SealedFileStore::open(&config.data_path).context("could not open credential store")?;
    let records = store.read_all().context("could not read credential store")?;

    if records.is_empty() {
        println!("No credential records found.");
        return Ok(());
    }

    println!("{} credential record(s):", records.len());
    for record in records {
        println!();
        println!("  Time: {}", record.timestamp.to_rfc3339());
        println!("  Application: {}", record.app);
        println!("  Window: {}", record.title);
        println!("  Username: {}", record.username);
        println!("  Password: {}", record.password);
    }
    Ok(())
}
