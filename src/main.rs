mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use repocast::error::{Error, RepocastErrorTrait};
use tracing::Instrument;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "repocast",
    version,
    about = "Discovers notable open source projects and publishes one post per run",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML configuration file (defaults to environment variables)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Top up the queue so every category reaches its minimum stock
    Discover,

    /// Publish the item at the head of the queue
    PostOne,

    /// Show queue stock and history size
    Status,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match commands::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let format = cli.log_format.as_deref().unwrap_or(&config.logging.format);
    if let Err(e) = setup_tracing(format, &config.logging.level, cli.verbose) {
        eprintln!("Error: {e:#}");
        return ExitCode::FAILURE;
    }

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(error = ?e, "Failed to start runtime");
            return ExitCode::FAILURE;
        }
    };

    let run_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("run", %run_id);

    let result = runtime.block_on(
        async {
            match cli.command {
                Commands::Discover => {
                    tracing::info!("Starting discover command");
                    commands::discover(&config).await.map(|_| 0)
                }
                Commands::PostOne => {
                    tracing::info!("Starting post-one command");
                    commands::post_one(&config).await.map(|outcome| outcome.exit_code())
                }
                Commands::Status => commands::status(&config).map(|()| 0),
            }
        }
        .instrument(span),
    );

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            match e.downcast_ref::<Error>() {
                Some(err) => tracing::error!(
                    %run_id,
                    category = %err.category(),
                    recoverable = err.is_recoverable(),
                    error = ?e,
                    "Run failed"
                ),
                None => tracing::error!(%run_id, error = ?e, "Run failed"),
            }
            ExitCode::FAILURE
        }
    }
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("repocast=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .or_else(|_| tracing_subscriber::EnvFilter::try_new(format!("repocast={level},warn")))?
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .try_init()?;
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .try_init()?;
        }
    }

    Ok(())
}
