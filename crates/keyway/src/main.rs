//! keyway - command-line HTTP client with pluggable authentication.
//!
//! This is the main entry point for the keyway CLI.

mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use commands::{handle_auth, handle_fetch, init_logging, AuthCommands};
use keyway_auth::{
    default_config_dir, ApiKeyHandler, AuthConfig, AuthSystem, HttpPipeline, API_KEY_TYPE,
    DEFAULT_PROFILE,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

const BIN_NAME: &str = env!("CARGO_BIN_NAME");

#[derive(Parser)]
#[command(name = "keyway")]
#[command(author, version, about = "HTTP client with pluggable authentication", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Profile to use
    #[arg(long, global = true, env = "KEYWAY_PROFILE", default_value = DEFAULT_PROFILE)]
    profile: String,

    /// Directory holding settings.json and secrets.json
    #[arg(long, global = true, env = "KEYWAY_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage auth servers, credentials and profiles
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// Send a GET request using the active profile's credentials
    Fetch {
        /// URL to fetch
        url: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => default_config_dir().context("Could not determine config directory")?,
    };
    debug!(config_dir = %config_dir.display(), profile = %cli.profile, "Starting");

    let client = reqwest::Client::builder()
        .user_agent(concat!("keyway/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;
    let pipeline = Arc::new(HttpPipeline::new(client));
    let config = Arc::new(AuthConfig::in_dir(&config_dir, cli.profile));

    let system = AuthSystem::new(config, pipeline.clone());
    system.register(API_KEY_TYPE, Arc::new(ApiKeyHandler::new()));

    match cli.command {
        Commands::Auth { command } => handle_auth(&system, command, BIN_NAME).await,
        Commands::Fetch { url } => handle_fetch(&pipeline, &url).await,
    }
}
