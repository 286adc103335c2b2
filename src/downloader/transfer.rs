//! Single-task download with resume and retry.
//!
//! Bytes are streamed into `<local_path>.part` and the file is renamed into place
//! only after the server has delivered everything it announced. A non-empty
//! final file therefore always means a complete archive, and a `.part` file
//! is always something to resume.

use crate::error::{Error, Result};
use crate::retry::{Backoff, IsRetryable};
use crate::types::{DownloadResult, DownloadTask, Event, Outcome};
use crate::utils::file_len;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_RANGE, COOKIE, HeaderMap, RANGE};
use tokio::io::AsyncWriteExt;

use super::Downloader;

/// Minimum number of bytes between two progress events for the same task
const PROGRESS_EVENT_INTERVAL: u64 = 256 * 1024;

/// Where a task is in its download lifecycle
#[derive(Debug)]
enum TransferState {
    /// No local data; the next attempt starts at byte 0
    NotStarted,
    /// A partial file of this size exists; the next attempt resumes after it
    PartiallyDownloaded(u64),
    /// The previous attempt failed transiently; the next attempt re-reads the partial size
    Retrying { attempt: u32 },
    /// All bytes are in the partial file
    Succeeded,
    /// Permanent failure or retries exhausted
    Failed(Error),
}

/// How a single HTTP attempt ended when it did not error
#[derive(Debug, PartialEq, Eq)]
enum AttemptOutcome {
    /// The partial file holds the complete archive
    Complete,
    /// The partial file does not match the remote archive and must be discarded
    Restart,
}

/// Parsed `Content-Range` response header
#[derive(Debug, PartialEq, Eq)]
struct ContentRange {
    /// First byte of the body (`None` for `bytes */N`)
    start: Option<u64>,
    /// Full size of the archive (`None` for `bytes a-b/*`)
    total: Option<u64>,
}

fn parse_content_range(value: &str) -> Option<ContentRange> {
    let rest = value.trim().strip_prefix("bytes")?.trim_start();
    let (range, total) = rest.split_once('/')?;

    let total = match total.trim() {
        "*" => None,
        t => Some(t.parse().ok()?),
    };
    let start = match range.trim() {
        "*" => None,
        r => Some(r.split_once('-')?.0.trim().parse().ok()?),
    };

    Some(ContentRange { start, total })
}

fn content_range(headers: &HeaderMap) -> Option<ContentRange> {
    headers
        .get(CONTENT_RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_content_range)
}

impl Downloader {
    /// Download one archive
    ///
    /// Never returns an error: every failure is captured in the returned
    /// result. At most `max_retries + 1` HTTP attempts are made; discarding a
    /// stale partial file does not count as a retry.
    pub async fn download(&self, task: DownloadTask) -> DownloadResult {
        let _active = self.stats.begin_task();

        let result = self.run_transfer(task).await;

        self.stats.record(&result);
        self.emit(Event::Finished {
            dataset: result.task.dataset.clone(),
            outcome: result.outcome,
            bytes_transferred: result.bytes_transferred,
            error: result.error_detail.as_ref().map(|d| d.message.clone()),
        });
        result
    }

    async fn run_transfer(&self, task: DownloadTask) -> DownloadResult {
        match self.is_complete_on_disk(&task).await {
            Ok(true) => {
                tracing::info!(
                    dataset = %task.dataset,
                    path = %task.local_path.display(),
                    "archive already present, skipping"
                );
                return DownloadResult::already_exists(task);
            }
            Ok(false) => {}
            Err(e) => {
                tracing::error!(dataset = %task.dataset, error = %e, "failed to inspect local archive");
                return DownloadResult::failed(task, &e, 0, 0);
            }
        }

        let partial = task.partial_path();
        let mut state = match file_len(&partial).await {
            Ok(Some(len)) if len > 0 => TransferState::PartiallyDownloaded(len),
            Ok(_) => TransferState::NotStarted,
            Err(e) => TransferState::Failed(e.into()),
        };

        let resume_from = match state {
            TransferState::PartiallyDownloaded(len) => {
                tracing::info!(dataset = %task.dataset, bytes = len, "resuming partial download");
                len
            }
            _ => 0,
        };
        self.emit(Event::Started {
            dataset: task.dataset.clone(),
            resume_from,
        });

        let mut backoff = Backoff::new(&self.config.retry);
        let mut attempts = 0u32;
        let mut retries = 0u32;
        let mut transferred = 0u64;

        loop {
            state = match state {
                TransferState::NotStarted
                | TransferState::PartiallyDownloaded(_)
                | TransferState::Retrying { .. } => {
                    if self.cancel.is_cancelled() {
                        TransferState::Failed(Error::Cancelled)
                    } else {
                        attempts += 1;
                        match self.attempt(&task, &mut transferred).await {
                            Ok(AttemptOutcome::Complete) => TransferState::Succeeded,
                            Ok(AttemptOutcome::Restart) => match discard_partial(&task).await {
                                Ok(()) => TransferState::NotStarted,
                                Err(e) => TransferState::Failed(e),
                            },
                            Err(e) if e.is_retryable() && retries < self.config.max_retries => {
                                retries += 1;
                                let delay = backoff.next_delay();
                                tracing::warn!(
                                    dataset = %task.dataset,
                                    attempt = attempts,
                                    max_attempts = self.config.max_retries + 1,
                                    delay_ms = delay.as_millis() as u64,
                                    error = %e,
                                    "transient failure, retrying"
                                );
                                self.emit(Event::Retrying {
                                    dataset: task.dataset.clone(),
                                    attempt: attempts,
                                    delay,
                                    error: e.to_string(),
                                });

                                tokio::select! {
                                    _ = tokio::time::sleep(delay) => TransferState::Retrying { attempt: attempts },
                                    _ = self.cancel.cancelled() => TransferState::Failed(Error::Cancelled),
                                }
                            }
                            Err(e) => TransferState::Failed(e),
                        }
                    }
                }
                TransferState::Succeeded => match tokio::fs::rename(&partial, &task.local_path).await
                {
                    Ok(()) => {
                        tracing::info!(
                            dataset = %task.dataset,
                            bytes = transferred,
                            attempts,
                            path = %task.local_path.display(),
                            "download complete"
                        );
                        return DownloadResult {
                            task,
                            outcome: Outcome::Success,
                            bytes_transferred: transferred,
                            attempts_used: attempts,
                            error_detail: None,
                        };
                    }
                    Err(e) => TransferState::Failed(e.into()),
                },
                TransferState::Failed(e) => {
                    match &e {
                        Error::Auth { status } => tracing::error!(
                            dataset = %task.dataset,
                            status,
                            "authentication rejected, refresh the cookie file"
                        ),
                        Error::Cancelled => {
                            tracing::info!(dataset = %task.dataset, "download cancelled")
                        }
                        _ => tracing::error!(
                            dataset = %task.dataset,
                            attempts,
                            error = %e,
                            "download failed"
                        ),
                    }
                    return DownloadResult::failed(task, &e, transferred, attempts);
                }
            };

            if let TransferState::Retrying { attempt } = state {
                tracing::debug!(dataset = %task.dataset, next_attempt = attempt + 1, "retry backoff elapsed");
            }
        }
    }

    /// Whether a complete archive is already at the final path
    ///
    /// A final file below `expected_min_size` is moved back to the partial path
    /// so the download resumes from it.
    async fn is_complete_on_disk(&self, task: &DownloadTask) -> Result<bool> {
        match file_len(&task.local_path).await? {
            Some(len) if len > 0 => match task.expected_min_size {
                Some(min) if len < min => {
                    tracing::warn!(
                        dataset = %task.dataset,
                        size = len,
                        expected_min = min,
                        "existing archive is smaller than expected, resuming it"
                    );
                    tokio::fs::rename(&task.local_path, task.partial_path()).await?;
                    Ok(false)
                }
                _ => Ok(true),
            },
            _ => Ok(false),
        }
    }

    /// One HTTP request, streaming the body into the partial file
    ///
    /// `transferred` accumulates bytes written even when the attempt fails.
    async fn attempt(&self, task: &DownloadTask, transferred: &mut u64) -> Result<AttemptOutcome> {
        let partial = task.partial_path();
        let offset = file_len(&partial).await?.unwrap_or(0);
        let timeout = self.config.timeout;

        let mut request = self.client.get(task.remote_url.clone());
        if let Some(cookies) = self.auth.cookie_header() {
            request = request.header(COOKIE, cookies);
        }
        if offset > 0 {
            request = request.header(RANGE, format!("bytes={offset}-"));
        }

        tracing::debug!(dataset = %task.dataset, url = %task.remote_url, offset, "sending request");

        let mut response = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(Error::Cancelled),
            sent = tokio::time::timeout(timeout, request.send()) => {
                sent.map_err(|_| Error::Timeout {
                    operation: "response",
                    after: timeout,
                })??
            }
        };

        let status = response.status();
        let (start, total) = match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(Error::Auth {
                    status: status.as_u16(),
                });
            }
            StatusCode::RANGE_NOT_SATISFIABLE if offset > 0 => {
                let total = content_range(response.headers()).and_then(|r| r.total);
                if total == Some(offset) {
                    tracing::debug!(dataset = %task.dataset, bytes = offset, "partial file already complete");
                    return Ok(AttemptOutcome::Complete);
                }
                tracing::warn!(
                    dataset = %task.dataset,
                    local = offset,
                    remote = ?total,
                    "partial file does not match the remote archive, restarting"
                );
                return Ok(AttemptOutcome::Restart);
            }
            StatusCode::PARTIAL_CONTENT => {
                let range = content_range(response.headers());
                let start = range.as_ref().and_then(|r| r.start).unwrap_or(offset);
                if start != offset {
                    if offset == 0 {
                        return Err(Error::HttpStatus {
                            status: status.as_u16(),
                        });
                    }
                    tracing::warn!(
                        dataset = %task.dataset,
                        requested = offset,
                        received = start,
                        "server resumed at a different offset, restarting"
                    );
                    return Ok(AttemptOutcome::Restart);
                }
                let total = range
                    .and_then(|r| r.total)
                    .or_else(|| response.content_length().map(|len| start + len));
                if let Some(total) = total
                    && total < offset
                {
                    tracing::warn!(
                        dataset = %task.dataset,
                        local = offset,
                        remote = total,
                        "partial file is larger than the remote archive, restarting"
                    );
                    return Ok(AttemptOutcome::Restart);
                }
                (start, total)
            }
            StatusCode::OK => {
                if offset > 0 {
                    tracing::info!(
                        dataset = %task.dataset,
                        discarded = offset,
                        "server ignored the range request, downloading from scratch"
                    );
                }
                (0, response.content_length())
            }
            other => {
                return Err(Error::HttpStatus {
                    status: other.as_u16(),
                });
            }
        };

        if let Some(parent) = partial.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = if start > 0 {
            tokio::fs::OpenOptions::new()
                .append(true)
                .open(&partial)
                .await?
        } else {
            tokio::fs::File::create(&partial).await?
        };

        let mut written = start;
        let mut last_event = written;
        self.emit(Event::Progress {
            dataset: task.dataset.clone(),
            downloaded: written,
            total,
        });

        loop {
            let chunk = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    file.flush().await?;
                    return Err(Error::Cancelled);
                }
                next = tokio::time::timeout(timeout, response.chunk()) => {
                    next.map_err(|_| Error::Timeout { operation: "read", after: timeout })??
                }
            };
            let Some(chunk) = chunk else { break };

            file.write_all(&chunk).await?;
            let len = chunk.len() as u64;
            written += len;
            *transferred += len;
            self.stats.add_bytes(len);

            if written - last_event >= PROGRESS_EVENT_INTERVAL {
                last_event = written;
                self.emit(Event::Progress {
                    dataset: task.dataset.clone(),
                    downloaded: written,
                    total,
                });
            }
        }
        file.flush().await?;

        if let Some(total) = total
            && written < total
        {
            return Err(Error::Truncated {
                expected: total,
                received: written,
            });
        }

        self.emit(Event::Progress {
            dataset: task.dataset.clone(),
            downloaded: written,
            total,
        });
        Ok(AttemptOutcome::Complete)
    }
}

async fn discard_partial(task: &DownloadTask) -> Result<()> {
    match tokio::fs::remove_file(task.partial_path()).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
