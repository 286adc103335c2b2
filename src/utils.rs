//! Utility functions for file operations and path manipulation

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Suffix of in-progress downloads
pub const PARTIAL_SUFFIX: &str = ".part";

/// Path of the in-progress download for `path`
///
/// # Examples
///
/// ```
/// use amass_dl::utils::partial_path;
/// use std::path::{Path, PathBuf};
///
/// assert_eq!(
///     partial_path(Path::new("/data/ACCAD_smplx_neutral.tar.bz2")),
///     PathBuf::from("/data/ACCAD_smplx_neutral.tar.bz2.part")
/// );
/// ```
#[must_use]
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

/// Size of a regular file, `None` if it does not exist
///
/// Any error other than "not found" is propagated.
pub async fn file_len(path: &Path) -> std::io::Result<Option<u64>> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(Some(meta.len())),
        Ok(_) => Ok(None),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}
