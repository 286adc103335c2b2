//! Terminal progress display driven by download events

use amass_dl::types::Event;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io::{self, Write};
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing_subscriber::fmt::MakeWriter;

/// Log writer that suspends the progress bars while a line is printed
#[derive(Clone)]
pub struct IndicatifWriter {
    progress_bars: MultiProgress,
}

impl IndicatifWriter {
    pub fn new(pb: MultiProgress) -> Self {
        Self { progress_bars: pb }
    }
}

impl io::Write for IndicatifWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.progress_bars.suspend(|| io::stderr().write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.progress_bars.suspend(|| io::stderr().flush())
    }
}

impl<'a> MakeWriter<'a> for IndicatifWriter {
    type Writer = IndicatifWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn bytes_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{prefix:>18.bold} [{bar:30.cyan/blue}] {bytes}/{total_bytes} {bytes_per_sec:>12} {wide_msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("█▓░")
}

fn unknown_size_style() -> ProgressStyle {
    ProgressStyle::with_template("{prefix:>18.bold} {spinner:.green} {bytes} {bytes_per_sec:>12} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// Spinner shown while work without byte progress runs
pub fn spinner(multi: &MultiProgress, message: String) -> ProgressBar {
    let pb = multi.add(ProgressBar::new_spinner());
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// One progress bar per in-flight download
pub struct DownloadProgress {
    handle: JoinHandle<()>,
}

impl DownloadProgress {
    /// Start rendering events from `events` until the channel closes
    pub fn spawn(multi: MultiProgress, mut events: broadcast::Receiver<Event>) -> Self {
        let handle = tokio::spawn(async move {
            let mut bars: HashMap<String, ProgressBar> = HashMap::new();

            loop {
                match events.recv().await {
                    Ok(Event::Started {
                        dataset,
                        resume_from,
                    }) => {
                        let bar = multi.add(ProgressBar::new(0));
                        bar.set_style(unknown_size_style());
                        bar.set_prefix(dataset.clone());
                        bar.set_position(resume_from);
                        if resume_from > 0 {
                            bar.set_message("resuming");
                        }
                        bars.insert(dataset, bar);
                    }
                    Ok(Event::Progress {
                        dataset,
                        downloaded,
                        total,
                    }) => {
                        if let Some(bar) = bars.get(&dataset) {
                            if let Some(total) = total
                                && bar.length() != Some(total)
                            {
                                bar.set_style(bytes_style());
                                bar.set_length(total);
                            }
                            bar.set_position(downloaded);
                        }
                    }
                    Ok(Event::Retrying {
                        dataset,
                        attempt,
                        delay,
                        error,
                    }) => {
                        if let Some(bar) = bars.get(&dataset) {
                            bar.set_message(format!(
                                "attempt {attempt} failed ({error}), retrying in {:.1}s",
                                delay.as_secs_f64()
                            ));
                        }
                    }
                    Ok(Event::Finished {
                        dataset, outcome, ..
                    }) => {
                        if let Some(bar) = bars.remove(&dataset) {
                            bar.finish_with_message(outcome.to_string());
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "progress display fell behind");
                    }
                    Err(RecvError::Closed) => break,
                }
            }

            for bar in bars.into_values() {
                bar.abandon();
            }
        });

        Self { handle }
    }

    /// Wait until every event has been rendered
    ///
    /// Resolves once all senders (the downloader and its workers) are dropped.
    pub async fn finish(self) {
        if let Err(e) = self.handle.await {
            tracing::debug!(error = %e, "progress display task failed");
        }
    }
}
