//! Command-line interface

mod download;
mod extract;
pub mod progress;

use clap::{Parser, Subcommand};
use indicatif::MultiProgress;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "amass-dl")]
#[command(about = "Download and extract AMASS motion-capture datasets")]
#[command(version)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Download the configured dataset archives
    Download(download::Args),

    /// Extract downloaded archives
    Extract(extract::Args),
}

/// Execute the parsed command
pub async fn run(cli: Cli, multi: MultiProgress) -> anyhow::Result<ExitCode> {
    match cli.command {
        Command::Download(args) => download::execute(args, multi).await,
        Command::Extract(args) => extract::execute(args, multi).await,
    }
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
