//! CLI for sending HTTP requests through the rebound retry layer.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rebound_core::config;

use commands::{run_backoff, run_config, run_send, BackoffArgs, SendArgs};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "rebound")]
#[command(about = "rebound: HTTP requests with exponential-backoff retries", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Send one request, retrying transient failures.
    Send(SendArgs),

    /// Print the backoff schedule for a budget without sleeping.
    Backoff(BackoffArgs),

    /// Show the config file path and effective configuration.
    Config,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Send(args) => run_send(&cfg, args).await?,
            CliCommand::Backoff(args) => run_backoff(&cfg, args)?,
            CliCommand::Config => run_config(&cfg)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
