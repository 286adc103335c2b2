//! Core types for amass-dl

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::error::{Error, ErrorDetail};

/// Body model representation requested from the server
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodyModel {
    /// SMPL+H (body and hands)
    #[serde(rename = "SMPL-H")]
    SmplH,
    /// SMPL-X (body, hands and face)
    #[serde(rename = "SMPL-X")]
    SmplX,
}

impl BodyModel {
    /// Path segment used by the download server and in local filenames
    pub fn path_segment(&self) -> &'static str {
        match self {
            BodyModel::SmplH => "smplh",
            BodyModel::SmplX => "smplx",
        }
    }
}

impl std::fmt::Display for BodyModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BodyModel::SmplH => write!(f, "SMPL-H"),
            BodyModel::SmplX => write!(f, "SMPL-X"),
        }
    }
}

impl std::str::FromStr for BodyModel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SMPL-H" => Ok(BodyModel::SmplH),
            "SMPL-X" => Ok(BodyModel::SmplX),
            other => Err(Error::config(
                format!("unknown body model '{other}' (expected SMPL-H or SMPL-X)"),
                "download_options.body_model",
            )),
        }
    }
}

/// Gender variant of the fitted body model
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    /// Male-specific model
    Male,
    /// Female-specific model
    Female,
    /// Gender-neutral model
    Neutral,
}

impl Gender {
    /// Server directory holding archives for this gender
    ///
    /// Male and female fits share the `gender_specific` archives.
    pub fn path_segment(&self) -> &'static str {
        match self {
            Gender::Male | Gender::Female => "gender_specific",
            Gender::Neutral => "neutral",
        }
    }

    /// Lowercase name used in local filenames
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Neutral => "neutral",
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Gender {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "neutral" => Ok(Gender::Neutral),
            other => Err(Error::config(
                format!("unknown gender '{other}' (expected male, female or neutral)"),
                "download_options.gender",
            )),
        }
    }
}

/// One dataset archive to fetch
///
/// Built by [`crate::resolver::Resolver`]; immutable afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadTask {
    /// Dataset name (e.g. "ACCAD")
    pub dataset: String,
    /// Requested body model
    pub body_model: BodyModel,
    /// Requested gender
    pub gender: Gender,
    /// Fully resolved download URL
    pub remote_url: Url,
    /// Final location of the archive on disk
    pub local_path: PathBuf,
    /// Minimum size an existing file must have to be considered complete
    pub expected_min_size: Option<u64>,
}

impl DownloadTask {
    /// Location of the in-progress download for this task
    pub fn partial_path(&self) -> PathBuf {
        crate::utils::partial_path(&self.local_path)
    }
}

/// How a single task ended
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The archive was downloaded completely in this run
    Success,
    /// A complete archive was already on disk; no request was made
    AlreadyExists,
    /// The archive could not be downloaded
    Failed,
}

impl Outcome {
    /// Whether this outcome counts towards a successful run
    pub fn is_ok(&self) -> bool {
        !matches!(self, Outcome::Failed)
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Success => write!(f, "downloaded"),
            Outcome::AlreadyExists => write!(f, "already present"),
            Outcome::Failed => write!(f, "failed"),
        }
    }
}

/// Result of one task, produced exactly once per [`DownloadTask`]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadResult {
    /// The task this result belongs to
    pub task: DownloadTask,
    /// How the task ended
    pub outcome: Outcome,
    /// Bytes written to disk during this run (across all attempts)
    pub bytes_transferred: u64,
    /// Number of HTTP attempts made (0 when no request was needed)
    pub attempts_used: u32,
    /// Why the task failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<ErrorDetail>,
}

impl DownloadResult {
    /// Result for a task whose archive is already complete on disk
    pub fn already_exists(task: DownloadTask) -> Self {
        Self {
            task,
            outcome: Outcome::AlreadyExists,
            bytes_transferred: 0,
            attempts_used: 0,
            error_detail: None,
        }
    }

    /// Result for a failed task
    pub fn failed(task: DownloadTask, error: &Error, bytes_transferred: u64, attempts_used: u32) -> Self {
        Self {
            task,
            outcome: Outcome::Failed,
            bytes_transferred,
            attempts_used,
            error_detail: Some(ErrorDetail::from(error)),
        }
    }
}

/// Aggregated counts for a run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Tasks downloaded in this run
    pub succeeded: usize,
    /// Tasks skipped because the archive was already present
    pub already_existed: usize,
    /// Tasks that failed
    pub failed: usize,
    /// Total bytes written across all tasks
    pub bytes_transferred: u64,
}

impl RunSummary {
    /// Total number of tasks
    pub fn total(&self) -> usize {
        self.succeeded + self.already_existed + self.failed
    }

    /// True when no task failed
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Results of a download run, in task submission order
#[derive(Clone, Debug, Default)]
pub struct RunReport {
    /// One result per submitted task
    pub results: Vec<DownloadResult>,
}

impl RunReport {
    /// Count outcomes and bytes
    pub fn summary(&self) -> RunSummary {
        self.results
            .iter()
            .fold(RunSummary::default(), |mut summary, result| {
                match result.outcome {
                    Outcome::Success => summary.succeeded += 1,
                    Outcome::AlreadyExists => summary.already_existed += 1,
                    Outcome::Failed => summary.failed += 1,
                }
                summary.bytes_transferred += result.bytes_transferred;
                summary
            })
    }

    /// Results that failed
    pub fn failures(&self) -> impl Iterator<Item = &DownloadResult> {
        self.results
            .iter()
            .filter(|r| r.outcome == Outcome::Failed)
    }
}

/// Events emitted by the download engine
///
/// Subscribers receive these through [`crate::Downloader::subscribe`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A worker picked up a task
    Started {
        /// Dataset name
        dataset: String,
        /// Bytes already on disk from an earlier attempt
        resume_from: u64,
    },

    /// Bytes arrived for a task
    Progress {
        /// Dataset name
        dataset: String,
        /// Size of the partial file so far
        downloaded: u64,
        /// Total archive size when the server reported one
        #[serde(skip_serializing_if = "Option::is_none")]
        total: Option<u64>,
    },

    /// An attempt failed with a transient error and will be retried
    Retrying {
        /// Dataset name
        dataset: String,
        /// The attempt that just failed (1-based)
        attempt: u32,
        /// Delay before the next attempt
        #[serde(with = "duration_millis")]
        delay: Duration,
        /// Error message of the failed attempt
        error: String,
    },

    /// A task reached its final outcome
    Finished {
        /// Dataset name
        dataset: String,
        /// Final outcome
        outcome: Outcome,
        /// Bytes written in this run
        bytes_transferred: u64,
        /// Error message when failed
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
