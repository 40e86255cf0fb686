//! UniPath CLI — the main entry point.
//!
//! Commands:
//! - `init-config` — Write a default config file
//! - `serve`       — Start the HTTP API
//! - `chat`        — Talk to the counsellor from the terminal
//! - `seed`        — Load the starter catalog (and a demo profile)
//! - `doctor`      — Diagnose configuration, store and provider

use anyhow::Context;
use clap::{Parser, Subcommand};
use unipath_config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "unipath",
    about = "UniPath — study-abroad counselling agent",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "UNIPATH_JSON_LOGS")]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file to ~/.unipath/config.toml
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Start the HTTP API server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,

        /// Seed the starter catalog before serving
        #[arg(long)]
        seed: bool,
    },

    /// Chat with the counsellor as a given student
    Chat {
        /// Student profile id
        #[arg(short, long, default_value = "demo")]
        user: String,

        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Answer through this configured provider instead of the default
        #[arg(short, long)]
        provider: Option<String>,
    },

    /// Seed the university catalog
    Seed {
        /// Also create a demo profile under this id
        #[arg(long)]
        demo_user: Option<String>,
    },

    /// Diagnose system health
    Doctor,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::InitConfig { force } = cli.command {
        init_tracing(cli.verbose, cli.json_logs);
        return commands::init_config::run(force);
    }

    let config = AppConfig::load().context("Failed to load config")?;
    init_tracing(cli.verbose, cli.json_logs || config.logging.json);

    match cli.command {
        Commands::InitConfig { .. } => {}
        Commands::Serve { port, seed } => commands::serve::run(config, port, seed).await?,
        Commands::Chat {
            user,
            message,
            provider,
        } => commands::chat::run(config, &user, provider.as_deref(), message).await?,
        Commands::Seed { demo_user } => commands::seed::run(config, demo_user).await?,
        Commands::Doctor => commands::doctor::run(config).await?,
    }

    Ok(())
}

fn init_tracing(verbose: bool, json: bool) {
    let filter = if verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }
}
