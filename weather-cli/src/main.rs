//! Binary crate for the `weather` command-line tool and HTTP service.
//!
//! This crate focuses on:
//! - Parsing CLI arguments and interactive configuration
//! - Serving the HTTP API and running the notification scheduler
//! - Local collaborators: JSON subscription file, logging mailer

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod mailer;
mod scheduler;
mod server;
mod store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cmd = cli::Cli::parse();
    cmd.run().await
}
