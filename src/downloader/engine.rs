//! Bounded worker pool running a batch of download tasks.

use crate::error::Error;
use crate::types::{DownloadResult, DownloadTask, RunReport};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;

use super::Downloader;

impl Downloader {
    /// Download every task with at most `max_workers` transfers in flight
    ///
    /// Returns exactly one result per task, in submission order. Individual
    /// failures never abort the run. After cancellation, tasks not yet handed
    /// to a worker are reported as failed with code `cancelled`.
    pub async fn run(&self, tasks: Vec<DownloadTask>) -> RunReport {
        let total = tasks.len();
        if total == 0 {
            return RunReport::default();
        }

        let workers = self.config.worker_count().min(total);
        tracing::info!(tasks = total, workers, "starting downloads");

        // Kept so a worker that dies mid-task still yields a result for it
        let submitted: Vec<DownloadTask> = tasks.clone();

        let (task_tx, task_rx) = mpsc::channel::<(usize, DownloadTask)>(workers);
        let task_rx = Arc::new(Mutex::new(task_rx));
        let (result_tx, mut result_rx) = mpsc::unbounded_channel::<(usize, DownloadResult)>();

        let mut pool = JoinSet::new();
        for worker_id in 0..workers {
            let downloader = self.clone();
            let queue = Arc::clone(&task_rx);
            let results = result_tx.clone();

            pool.spawn(async move {
                loop {
                    let next = queue.lock().await.recv().await;
                    let Some((index, task)) = next else { break };

                    tracing::debug!(worker_id, dataset = %task.dataset, "worker picked up task");
                    let result = downloader.download(task).await;
                    if results.send((index, result)).is_err() {
                        break;
                    }
                }
                tracing::debug!(worker_id, "worker finished");
            });
        }
        drop(result_tx);

        let mut unsubmitted = Vec::new();
        let mut pending = tasks.into_iter().enumerate();
        while let Some((index, task)) = pending.next() {
            let permit = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                permit = task_tx.reserve() => permit.ok(),
            };
            match permit {
                Some(permit) => permit.send((index, task)),
                None => {
                    unsubmitted.push((index, task));
                    unsubmitted.extend(pending.by_ref());
                    break;
                }
            }
        }
        // Workers exit once the queue is drained
        drop(task_tx);

        let mut slots: Vec<Option<DownloadResult>> = vec![None; total];

        if !unsubmitted.is_empty() {
            let reason = self.unsubmitted_reason();
            tracing::warn!(
                count = unsubmitted.len(),
                reason = %reason,
                "skipping tasks that never reached a worker"
            );
            for (index, task) in unsubmitted {
                slots[index] = Some(self.skipped(task, &reason));
            }
        }

        while let Some((index, result)) = result_rx.recv().await {
            slots[index] = Some(result);
        }

        while let Some(joined) = pool.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "download worker panicked");
            }
        }

        let results = slots
            .into_iter()
            .zip(submitted)
            .map(|(slot, task)| {
                slot.unwrap_or_else(|| {
                    let lost = Error::Io(std::io::Error::other(
                        "download worker terminated unexpectedly",
                    ));
                    self.skipped(task, &lost)
                })
            })
            .collect();

        let report = RunReport { results };
        let summary = report.summary();
        tracing::info!(
            succeeded = summary.succeeded,
            already_existed = summary.already_existed,
            failed = summary.failed,
            bytes = summary.bytes_transferred,
            "downloads finished"
        );
        report
    }

    /// Why submission stopped early
    ///
    /// The queue also closes when every worker has died, which is not a
    /// cancellation.
    pub(super) fn unsubmitted_reason(&self) -> Error {
        if self.cancel.is_cancelled() {
            Error::Cancelled
        } else {
            Error::Io(std::io::Error::other(
                "all download workers exited before the queue was drained",
            ))
        }
    }

    /// Final result for a task that never reached a worker
    fn skipped(&self, task: DownloadTask, error: &Error) -> DownloadResult {
        let result = DownloadResult::failed(task, error, 0, 0);
        self.stats.record(&result);
        self.emit(crate::types::Event::Finished {
            dataset: result.task.dataset.clone(),
            outcome: result.outcome,
            bytes_transferred: 0,
            error: Some(error.to_string()),
        });
        result
    }
}
