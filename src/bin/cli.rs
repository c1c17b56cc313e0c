//! spec-watch CLI
//!
//! Meant to be invoked on a schedule (cron, CI); each `run` is one pass.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;
use spec_watch::{
    error::Result,
    models::{Config, ENV_SOURCE_URL, ENV_STORAGE_DIR, ENV_WEBHOOK_URL, RunOutcome},
    pipeline,
};

/// spec-watch - OpenAPI Drift Watcher
#[derive(Parser, Debug)]
#[command(
    name = "spec-watch",
    version,
    about = "Alerts a team channel when a live OpenAPI contract drifts"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "spec-watch.toml")]
    config: PathBuf,

    /// URL of the script carrying the embedded spec
    #[arg(long, env = ENV_SOURCE_URL, global = true)]
    source_url: Option<String>,

    /// Incoming-webhook URL of the team channel
    #[arg(long, env = ENV_WEBHOOK_URL, global = true, hide_env_values = true)]
    webhook_url: Option<String>,

    /// Directory holding the baseline and latest documents
    #[arg(long, env = ENV_STORAGE_DIR, global = true)]
    storage_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch, diff against the baseline, notify on drift (default)
    Run {
        /// Print the run report as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Fetch and print the embedded spec without touching storage
    Extract {
        /// Write the document here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the stored baseline and latest documents
    Status {
        /// Print the slot summary as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Validate configuration
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Apply file, environment and flag layers in that order.
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load_or_default(&cli.config)?;
    config.apply_env();

    if let Some(url) = &cli.source_url {
        config.source.url = Some(url.clone());
    }
    if let Some(url) = &cli.webhook_url {
        config.notify.webhook_url = Some(url.clone());
    }
    if let Some(dir) = &cli.storage_dir {
        config.storage.dir = Some(dir.clone());
    }
    Ok(config)
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging level may come from the file, so peek at it first
    let level = Config::load(&cli.config)
        .map(|c| c.logging.level)
        .unwrap_or_else(|_| "info".to_string());
    init_logging(cli.verbose, &level);

    let config = load_config(&cli).inspect_err(|e| log::error!("{}", e))?;

    match cli.command.unwrap_or(Command::Run { json: false }) {
        Command::Run { json } => {
            log::info!("spec-watch starting...");
            match pipeline::run_pipeline(&config).await {
                Ok(report) => {
                    if let RunOutcome::Changed { notified: false } = report.outcome {
                        log::warn!("Drift was recorded but the channel was not notified");
                    }
                    log::info!("Done! ({})", report.outcome);
                    if json {
                        print_json(&report)?;
                    }
                }
                Err(e) => {
                    log::error!("Run aborted, baseline untouched: {}", e);
                    return Err(e);
                }
            }
        }

        Command::Extract { output } => {
            let doc = pipeline::run_extract(&config).await?;
            let json = pipeline::extract::to_pretty_json(&doc)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)?;
                    log::info!("Spec saved to {}", path.display());
                }
                None => println!("{json}"),
            }
        }

        Command::Status { json } => {
            let status = pipeline::run_status(&config).await?;
            if json {
                print_json(&status)?;
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");
        }
    }

    Ok(())
}
