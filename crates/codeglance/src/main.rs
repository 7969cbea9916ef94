//! codeglance CLI - syntax-highlighted previews and language tags for DAM files.
//!
//! The service listens for DAM change notifications, renders a thumbnail of
//! every added or modified source file, uploads it as the file's preview and
//! tags the file with its coding language.
//!
//! # Usage
//!
//! ```bash
//! # Run the webhook service (needs DAM_URL and ACCOUNT_KEY)
//! codeglance serve --port 8080
//!
//! # Render a local file to check fonts and themes
//! codeglance render src/main.rs -o main.png
//!
//! # View configuration
//! codeglance config show
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;
mod logging;
mod server;

/// codeglance - syntax-highlighted previews and language tags for DAM files.
#[derive(Parser, Debug)]
#[command(name = "codeglance")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file (defaults to the platform config directory)
    #[arg(short, long, global = true, env = "CODEGLANCE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the webhook listener and worker pool
    Serve(cli::serve::ServeArgs),

    /// Render a local source file to a PNG thumbnail
    Render(cli::render::RenderArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go through eprintln.
    let loaded = match &cli.config {
        Some(path) => codeglance_core::Config::load_from(path),
        None => codeglance_core::Config::load(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(e) if matches!(cli.command, Commands::Serve(_)) => {
            return Err(anyhow::anyhow!(e).context("Failed to load config"));
        }
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `codeglance config path`."
            );
            codeglance_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("codeglance v{}", codeglance_core::VERSION);

    match cli.command {
        Commands::Serve(args) => cli::serve::execute(args, config).await,
        Commands::Render(args) => cli::render::execute(args, config).await,
        Commands::Config(args) => cli::config::execute(args, config, cli.config).await,
    }
}
