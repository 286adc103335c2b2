use super::exit_code;
use super::progress::spinner;
use amass_dl::extraction::{
    ExtractState, ExtractionSummary, extract_all_with_progress, extract_one,
};
use amass_dl::Config;
use anyhow::Context;
use clap::Parser;
use indicatif::MultiProgress;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Subdirectory of the download directory that receives extracted datasets
const EXTRACTED_DIR: &str = "extracted";

#[derive(Debug, Parser)]
pub struct Args {
    /// Path to the configuration file (used for default directories)
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// Directory holding the downloaded archives [default: configured output_dir]
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Directory to extract into [default: <output_dir>/extracted]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Number of archives extracted in parallel (1-10)
    #[arg(short, long, default_value_t = 1)]
    pub workers: usize,

    /// Delete each archive after it was extracted successfully
    #[arg(long)]
    pub delete: bool,

    /// Extract a single archive instead of a whole directory
    #[arg(long, conflicts_with = "input")]
    pub file: Option<PathBuf>,
}

fn configured_output_dir(config: &Path) -> anyhow::Result<PathBuf> {
    let config = Config::load(config)
        .with_context(|| format!("failed to load {}", config.display()))?;
    Ok(config.download_settings.output_dir)
}

pub async fn execute(args: Args, multi: MultiProgress) -> anyhow::Result<ExitCode> {
    // The configuration is only needed for directories not given on the command line
    let needs_config = args.output.is_none() || (args.file.is_none() && args.input.is_none());
    let download_dir = if needs_config {
        Some(configured_output_dir(&args.config)?)
    } else {
        None
    };

    let default_dir = || {
        download_dir
            .clone()
            .context("no directory given and no configuration loaded")
    };

    let output = match args.output {
        Some(output) => output,
        None => default_dir()?.join(EXTRACTED_DIR),
    };

    let summary = if let Some(file) = args.file {
        let pb = spinner(&multi, format!("extracting {}", file.display()));
        let entry = extract_one(&file, &output, args.delete).await;
        pb.finish_and_clear();
        ExtractionSummary {
            archives: vec![entry],
        }
    } else {
        let input = match args.input {
            Some(input) => input,
            None => default_dir()?,
        };
        let pb = spinner(
            &multi,
            format!("extracting archives from {}", input.display()),
        );
        let summary =
            extract_all_with_progress(&input, &output, args.delete, args.workers, |archive, state| {
                if state == ExtractState::Extracting
                    && let Some(name) = archive.file_name()
                {
                    pb.set_message(format!("extracting {}", name.to_string_lossy()));
                }
            })
            .await;
        pb.finish_and_clear();
        summary.with_context(|| format!("failed to scan {}", input.display()))?
    };

    print_summary(&summary, &output);
    Ok(exit_code(summary.is_success()))
}

fn print_summary(summary: &ExtractionSummary, output: &Path) {
    if summary.archives.is_empty() {
        println!("No archives found to extract");
        return;
    }

    for entry in &summary.archives {
        let name = entry
            .archive
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| entry.archive.display().to_string());
        match &entry.error_detail {
            Some(error) => println!("  {name:<36} {}: {}", entry.state, error.message),
            None => println!("  {name:<36} {} ({} entries)", entry.state, entry.entries),
        }
    }

    println!();
    println!(
        "{} extracted, {} failed -> {}",
        summary.succeeded(),
        summary.failed(),
        output.display()
    );
}
