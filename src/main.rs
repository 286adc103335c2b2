//! amass-dl - download and extract AMASS motion-capture datasets.

mod cli;

use clap::Parser;
use indicatif::MultiProgress;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = cli::Cli::parse();

    // Initialize logging based on verbosity; RUST_LOG takes precedence
    let default_filter = match args.verbose {
        0 => "warn,amass_dl=info",
        1 => "warn,amass_dl=debug",
        _ => "info,amass_dl=trace",
    };

    // Log lines are printed above the progress bars instead of through them
    let multi = MultiProgress::new();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(cli::progress::IndicatifWriter::new(multi.clone()))
                .with_target(false)
                .without_time(),
        )
        .init();

    cli::run(args, multi).await
}
