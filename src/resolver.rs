//! Dataset name → download URL and local filename

use crate::config::{Config, DEFAULT_BASE_URL};
use crate::error::{Error, Result};
use crate::types::{BodyModel, DownloadTask, Gender};
use std::path::PathBuf;
use url::Url;

/// Datasets published per-dataset on the AMASS download server
pub const KNOWN_DATASETS: &[&str] = &[
    "ACCAD",
    "BMLhandball",
    "BMLmovi",
    "BMLrub",
    "CMU",
    "CNRS",
    "DanceDB",
    "DFaust",
    "EKUT",
    "EyesJapanDataset",
    "GRAB",
    "HDM05",
    "HUMAN4D",
    "HumanEva",
    "KIT",
    "MoSh",
    "PosePrior",
    "SFU",
    "SOMA",
    "SSM",
    "TCDHands",
    "TotalCapture",
    "Transitions",
    "WEIZMANN",
];

/// Server-side directory holding the per-dataset archives
const DATASET_FAMILY: &str = "amass_per_dataset";

/// Server-side download domain
const DOWNLOAD_DOMAIN: &str = "amass";

/// Archive extension of every dataset
pub const ARCHIVE_EXTENSION: &str = "tar.bz2";

/// Whether `name` is one of [`KNOWN_DATASETS`] (case-sensitive)
pub fn is_known_dataset(name: &str) -> bool {
    KNOWN_DATASETS.contains(&name)
}

/// Builds [`DownloadTask`]s for a download endpoint and output directory
#[derive(Clone, Debug)]
pub struct Resolver {
    base_url: String,
    output_dir: PathBuf,
}

impl Resolver {
    /// Resolver for the official download endpoint
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            output_dir: output_dir.into(),
        }
    }

    /// Resolver for another endpoint (mirror or test server)
    pub fn with_base_url(base_url: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_url: base_url.into(),
            output_dir: output_dir.into(),
        }
    }

    /// Resolver matching a validated configuration
    pub fn from_config(config: &Config) -> Self {
        Self::with_base_url(
            config.download_settings.base_url.clone(),
            config.download_settings.output_dir.clone(),
        )
    }

    /// Resolve one dataset
    ///
    /// Fails with [`Error::Config`] for datasets outside [`KNOWN_DATASETS`].
    /// Performs no I/O.
    pub fn resolve(
        &self,
        body_model: BodyModel,
        gender: Gender,
        dataset: &str,
    ) -> Result<DownloadTask> {
        if !is_known_dataset(dataset) {
            return Err(Error::config(
                format!("unknown dataset '{dataset}'"),
                "download_options.datasets",
            ));
        }

        let model = body_model.path_segment();
        let sfile = format!(
            "{DATASET_FAMILY}/{model}/{}/mosh_results/{dataset}.{ARCHIVE_EXTENSION}",
            gender.path_segment()
        );
        let mut remote_url = Url::parse(&self.base_url).map_err(|e| {
            Error::config(
                format!("invalid base URL '{}': {e}", self.base_url),
                "download_settings.base_url",
            )
        })?;
        // Parameters already on the base URL (mirror tokens) are kept in front
        let query = match remote_url.query().filter(|q| !q.is_empty()) {
            Some(existing) => {
                format!("{existing}&domain={DOWNLOAD_DOMAIN}&resume=1&sfile={sfile}")
            }
            None => format!("domain={DOWNLOAD_DOMAIN}&resume=1&sfile={sfile}"),
        };
        remote_url.set_query(Some(&query));

        let filename = format!("{dataset}_{model}_{gender}.{ARCHIVE_EXTENSION}");

        Ok(DownloadTask {
            dataset: dataset.to_string(),
            body_model,
            gender,
            remote_url,
            local_path: self.output_dir.join(filename),
            expected_min_size: None,
        })
    }

    /// Resolve every dataset of a configuration, in configuration order
    pub fn resolve_all(&self, config: &Config) -> Result<Vec<DownloadTask>> {
        let options = &config.download_options;
        options
            .datasets
            .iter()
            .map(|dataset| self.resolve(options.body_model, options.gender, dataset))
            .collect()
    }
}
