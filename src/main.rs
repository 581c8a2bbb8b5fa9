//! TextBlast-RS - batch SMS dispatch service
//!
//! Fans one message out to many recipients, streams per-recipient
//! progress over SSE, and keeps a durable outcome log.

#![allow(missing_docs)]

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use textblast_rs::config::{Config, LoggingConfig};
use textblast_rs::server::HttpServer;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Batch SMS dispatch service
#[derive(Debug, Parser)]
#[command(name = "dispatcher", version, about)]
struct Args {
    /// Path to the YAML config file
    #[arg(short, long, env = "TEXTBLAST_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Print error using Display (not Debug) to preserve newlines
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> textblast_rs::Result<()> {
    let config = Config::load(args.config.as_deref()).await?;

    init_logging(config.logging());
    info!(
        "{} {} starting on {}",
        textblast_rs::NAME,
        textblast_rs::VERSION,
        config.server().address()
    );

    HttpServer::new(config).await?.start().await
}

/// Initialize the logging system
///
/// `RUST_LOG` wins over the configured level so operators can turn up
/// verbosity without touching the config file.
fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    if logging.is_json() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}
