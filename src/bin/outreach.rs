//! Outreach service binary
//!
//! Loads configuration, initializes logging, and serves the email generation
//! API.

use clap::Parser;
use outreach::config::OutreachConfig;
use outreach::logging::init_logging;
use outreach::server;
use std::path::PathBuf;
use std::process;
use tracing::error;

#[derive(Parser)]
#[command(name = "outreach", about = "Personalized email draft generation service")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match OutreachConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = init_logging(Some(&config.logging)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    if let Err(e) = server::serve(config).await {
        error!("Server error: {}", e);
        eprintln!("Server error: {}", e);
        process::exit(1);
    }
}
