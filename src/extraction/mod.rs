//! Extraction of downloaded dataset archives
//!
//! Every `*.tar.bz2` in the input directory is decompressed into the output
//! directory on the blocking thread pool. Failures are recorded per archive;
//! a corrupt archive never stops the others and is never deleted.

mod tarball;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use crate::config::clamp_workers;
use crate::error::{Error, ErrorDetail, Result};
use crate::resolver::ARCHIVE_EXTENSION;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::task::spawn_blocking;
use tracing::{debug, error, info, warn};

/// Where an archive is in the extraction lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractState {
    /// Discovered, not yet started
    Pending,
    /// Being decompressed
    Extracting,
    /// Contents written, source archive kept
    Extracted,
    /// Decompression failed; the source archive is untouched
    ExtractFailed,
    /// Contents written and source archive removed
    SourceDeleted,
}

impl ExtractState {
    /// Whether the archive contents are on disk
    pub fn is_extracted(&self) -> bool {
        matches!(self, ExtractState::Extracted | ExtractState::SourceDeleted)
    }
}

impl std::fmt::Display for ExtractState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExtractState::Pending => "pending",
            ExtractState::Extracting => "extracting",
            ExtractState::Extracted => "extracted",
            ExtractState::ExtractFailed => "failed",
            ExtractState::SourceDeleted => "extracted, source deleted",
        };
        f.write_str(s)
    }
}

/// Outcome for one archive
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArchiveEntry {
    /// Path of the source archive
    pub archive: PathBuf,
    /// Final state
    pub state: ExtractState,
    /// Number of tar entries written
    pub entries: usize,
    /// Why extraction failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<ErrorDetail>,
}

/// Per-archive outcomes of an extraction run, in discovery order
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExtractionSummary {
    /// One entry per discovered archive
    pub archives: Vec<ArchiveEntry>,
}

impl ExtractionSummary {
    /// Archives whose contents are on disk
    pub fn succeeded(&self) -> usize {
        self.archives
            .iter()
            .filter(|a| a.state.is_extracted())
            .count()
    }

    /// Archives that failed to extract
    pub fn failed(&self) -> usize {
        self.archives
            .iter()
            .filter(|a| a.state == ExtractState::ExtractFailed)
            .count()
    }

    /// True when no archive failed
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

/// Dataset archives directly inside `input_dir`, sorted by file name
///
/// In-progress downloads (`.part` files) and subdirectories are ignored.
pub fn find_archives(input_dir: &Path) -> Result<Vec<PathBuf>> {
    let suffix = format!(".{ARCHIVE_EXTENSION}");
    let mut archives = Vec::new();

    for entry in std::fs::read_dir(input_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        let is_archive = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(&suffix));
        if is_archive {
            archives.push(path);
        }
    }

    archives.sort();
    debug!(dir = %input_dir.display(), count = archives.len(), "found archives");
    Ok(archives)
}

/// Extract one archive into `output_dir`
///
/// Never returns an error: failures are recorded on the returned entry.
pub async fn extract_one(archive: &Path, output_dir: &Path, delete_after: bool) -> ArchiveEntry {
    info!(archive = %archive.display(), output = %output_dir.display(), "extracting");

    let archive_owned = archive.to_path_buf();
    let output_owned = output_dir.to_path_buf();
    let result = spawn_blocking(move || tarball::unpack_tar_bz2(&archive_owned, &output_owned))
        .await
        .unwrap_or_else(|e| {
            Err(Error::Extraction {
                archive: archive.to_path_buf(),
                reason: format!("extraction task panicked: {e}"),
            })
        });

    let mut entry = match result {
        Ok(count) => {
            info!(archive = %archive.display(), entries = count, "extracted");
            ArchiveEntry {
                archive: archive.to_path_buf(),
                state: ExtractState::Extracted,
                entries: count,
                error_detail: None,
            }
        }
        Err(e) => {
            error!(archive = %archive.display(), error = %e, "extraction failed, keeping archive");
            return ArchiveEntry {
                archive: archive.to_path_buf(),
                state: ExtractState::ExtractFailed,
                entries: 0,
                error_detail: Some(ErrorDetail::from(&e)),
            };
        }
    };

    if delete_after {
        match tokio::fs::remove_file(archive).await {
            Ok(()) => {
                debug!(archive = %archive.display(), "deleted source archive");
                entry.state = ExtractState::SourceDeleted;
            }
            Err(e) => {
                warn!(archive = %archive.display(), error = %e, "failed to delete source archive");
            }
        }
    }

    entry
}

/// Extract every archive found in `input_dir`
///
/// At most `max_workers` (clamped to 1..=10) archives are decompressed at a
/// time. A missing input directory yields an empty summary.
pub async fn extract_all(
    input_dir: &Path,
    output_dir: &Path,
    delete_after: bool,
    max_workers: usize,
) -> Result<ExtractionSummary> {
    extract_all_with_progress(input_dir, output_dir, delete_after, max_workers, |_, _| {}).await
}

/// [`extract_all`] reporting every state change through `on_state`
///
/// All discovered archives are announced as [`ExtractState::Pending`] first,
/// then each one moves to [`ExtractState::Extracting`] and finally to its
/// terminal state. Calls for different archives may interleave.
pub async fn extract_all_with_progress<F>(
    input_dir: &Path,
    output_dir: &Path,
    delete_after: bool,
    max_workers: usize,
    on_state: F,
) -> Result<ExtractionSummary>
where
    F: Fn(&Path, ExtractState) + Sync,
{
    if !input_dir.is_dir() {
        warn!(dir = %input_dir.display(), "input directory does not exist, nothing to extract");
        return Ok(ExtractionSummary::default());
    }

    let archives = find_archives(input_dir)?;
    if archives.is_empty() {
        info!(dir = %input_dir.display(), "no archives to extract");
        return Ok(ExtractionSummary::default());
    }

    let workers = clamp_workers(max_workers);
    info!(count = archives.len(), workers, delete_after, "starting extraction");

    for archive in &archives {
        on_state(archive, ExtractState::Pending);
    }

    let on_state = &on_state;
    let archives = stream::iter(archives)
        .map(|archive| async move {
            on_state(&archive, ExtractState::Extracting);
            let entry = extract_one(&archive, output_dir, delete_after).await;
            on_state(&archive, entry.state);
            entry
        })
        .buffered(workers)
        .collect::<Vec<_>>()
        .await;

    let summary = ExtractionSummary { archives };
    info!(
        succeeded = summary.succeeded(),
        failed = summary.failed(),
        "extraction finished"
    );
    Ok(summary)
}
