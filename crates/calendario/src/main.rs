use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

use calendario::commands;
use calendario::config::Config;
use calendario::server;
use calendario::store::HttpScheduleStore;

const DEFAULT_PORT: u16 = 8080;

#[derive(Parser, Debug)]
#[command(name = "calendario")]
#[command(about = "Pick a fixed number of dates inside a schedule range and submit them")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Read configuration from this env file instead of the environment
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the web server (default)
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },

    /// Fetch a schedule and print its bounds
    Show {
        /// Schedule id
        id: String,
    },

    /// Validate dates against the schedule rules and submit them
    Submit {
        /// Schedule id
        id: String,

        /// Dates to select (YYYY-MM-DD); repeat a date to select it more than once
        #[arg(required = true)]
        dates: Vec<NaiveDate>,
    },
}

/// No subcommand means serve on the default port
fn or_serve(command: Option<Commands>) -> Commands {
    command.unwrap_or(Commands::Serve { port: DEFAULT_PORT })
}

fn init_tracing(log_level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(log_level)
            .with_context(|| format!("Invalid log level: {log_level}"))?,
    };
    let filter = filter
        .add_directive("hyper=warn".parse()?)
        .add_directive("reqwest=warn".parse()?);

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_max_level(Level::TRACE)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(&args.log_level)?;

    let config = match &args.env_file {
        Some(path) => Config::from_env_file(path)?,
        None => Config::from_env()?,
    };
    info!(
        api = %config.api_url,
        rules = %config.variant,
        padding_days = config.rules.padding_days,
        "Configuration loaded"
    );

    let store = Arc::new(
        HttpScheduleStore::new(config.api_url.clone(), config.timeout)
            .context("Failed to build HTTP client")?,
    );

    match or_serve(args.command) {
        Commands::Serve { port } => {
            let state = server::AppState::new(store, config.rules, config.default_id);
            server::serve(port, Arc::new(state)).await?;
        }
        Commands::Show { id } => {
            commands::show(store.as_ref(), &id).await?;
        }
        Commands::Submit { id, dates } => {
            commands::submit(store.as_ref(), &config.rules, &id, &dates).await?;
        }
    }

    Ok(())
}
