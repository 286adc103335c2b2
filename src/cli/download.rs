use super::exit_code;
use super::progress::DownloadProgress;
use amass_dl::{
    AuthContext, Config, Downloader, KNOWN_DATASETS, Outcome, Resolver, RunReport,
    cancel_on_signal,
};
use anyhow::Context;
use clap::Parser;
use indicatif::{HumanBytes, MultiProgress};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
pub struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// Download only this dataset instead of the configured list
    #[arg(short, long)]
    pub dataset: Option<String>,

    /// Print the available datasets and exit
    #[arg(long)]
    pub list: bool,
}

pub async fn execute(args: Args, multi: MultiProgress) -> anyhow::Result<ExitCode> {
    if args.list {
        println!("Available datasets:");
        for dataset in KNOWN_DATASETS {
            println!("  {dataset}");
        }
        return Ok(ExitCode::SUCCESS);
    }

    let mut config = Config::load(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;

    if let Some(dataset) = args.dataset {
        config.download_options.datasets = vec![dataset];
        config.validate()?;
    }

    let settings = &config.download_settings;
    let auth = AuthContext::from_cookie_file(&settings.cookie_file)
        .with_context(|| format!("failed to read {}", settings.cookie_file.display()))?;
    let tasks = Resolver::from_config(&config).resolve_all(&config)?;

    tokio::fs::create_dir_all(&settings.output_dir)
        .await
        .with_context(|| format!("failed to create {}", settings.output_dir.display()))?;

    println!(
        "Downloading {} dataset(s) ({} {}) to {} with {} worker(s)",
        tasks.len(),
        config.download_options.body_model,
        config.download_options.gender,
        settings.output_dir.display(),
        settings.max_workers,
    );

    let downloader = Downloader::new(config.engine_config(), auth)?;
    let progress = DownloadProgress::spawn(multi, downloader.subscribe());
    let signal = tokio::spawn(cancel_on_signal(downloader.cancellation_token()));

    let report = downloader.run(tasks).await;

    signal.abort();
    // Closes the event channel so the display can drain and exit
    drop(downloader);
    progress.finish().await;

    print_report(&report);
    Ok(exit_code(report.summary().is_success()))
}

fn print_report(report: &RunReport) {
    println!();
    for result in &report.results {
        let detail = match (&result.outcome, &result.error_detail) {
            (Outcome::Failed, Some(error)) => format!(": {}", error.message),
            (Outcome::Success, _) => format!(
                " ({}, {} attempt(s))",
                HumanBytes(result.bytes_transferred),
                result.attempts_used
            ),
            _ => String::new(),
        };
        println!("  {:<18} {}{detail}", result.task.dataset, result.outcome);
    }

    let summary = report.summary();
    println!();
    println!(
        "{} downloaded, {} already present, {} failed ({} transferred)",
        summary.succeeded,
        summary.already_existed,
        summary.failed,
        HumanBytes(summary.bytes_transferred)
    );

    let auth_failures = report
        .failures()
        .filter(|r| r.error_detail.as_ref().is_some_and(|d| d.is_auth()))
        .count();
    if auth_failures > 0 {
        println!(
            "{auth_failures} dataset(s) were rejected by the server: log in to the AMASS website and export a fresh cookie file"
        );
    }
}
