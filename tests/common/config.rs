//! Test configuration helpers: config files and cookie files pointing at a mock server

use amass_dl::Config;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use wiremock::MockServer;

/// Session cookie written by [`write_cookie_file`]
pub const SESSION_COOKIE: &str = "PHPSESSID=integration-session";

/// Path the mock server serves archives under
pub const DOWNLOAD_PATH: &str = "/download.php";

/// Workspace for one test: download directory, cookie file and config file
pub struct TestWorkspace {
    /// Keeps the directory alive for the duration of the test
    pub dir: TempDir,
    /// Path of the written `config.json`
    pub config_path: PathBuf,
}

impl TestWorkspace {
    /// Configured download directory
    pub fn output_dir(&self) -> PathBuf {
        self.dir.path().join("amass_data")
    }

    /// Load the written configuration through the public API
    pub fn load(&self) -> Config {
        Config::load(&self.config_path).unwrap()
    }
}

/// Write a Netscape-format cookie file holding [`SESSION_COOKIE`]
pub fn write_cookie_file(path: &Path) {
    let (name, value) = SESSION_COOKIE.split_once('=').unwrap();
    let content = format!(
        "# Netscape HTTP Cookie File\n\
         .is.tue.mpg.de\tTRUE\t/\tTRUE\t0\t{name}\t{value}\n"
    );
    std::fs::write(path, content).unwrap();
}

/// Create a workspace whose configuration downloads `datasets` from `server`
pub fn create_workspace(server: &MockServer, datasets: &[&str], max_workers: usize) -> TestWorkspace {
    let dir = tempfile::tempdir().unwrap();
    let cookie_file = dir.path().join("cookies.txt");
    write_cookie_file(&cookie_file);

    let config = serde_json::json!({
        "download_options": {
            "body_model": "SMPL-X",
            "gender": "neutral",
            "datasets": datasets,
        },
        "download_settings": {
            "output_dir": dir.path().join("amass_data"),
            "cookie_file": cookie_file,
            "max_retries": 2,
            "timeout": 10,
            "max_workers": max_workers,
            "base_url": format!("{}{DOWNLOAD_PATH}", server.uri()),
            "retry": { "initial_delay": 0, "max_delay": 0, "backoff_multiplier": 2.0, "jitter": false }
        }
    });

    let config_path = dir.path().join("config.json");
    std::fs::write(&config_path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

    TestWorkspace { dir, config_path }
}
