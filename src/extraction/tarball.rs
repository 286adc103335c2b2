use crate::error::{Error, Result};
use bzip2::read::BzDecoder;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Read buffer in front of the bzip2 decoder
const READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Unpack a `.tar.bz2` archive into `output_dir` (blocking)
///
/// Entries that would land outside `output_dir` are skipped by `tar`.
/// Returns the number of entries written.
pub(crate) fn unpack_tar_bz2(archive: &Path, output_dir: &Path) -> Result<usize> {
    let failed = |reason: String| Error::Extraction {
        archive: archive.to_path_buf(),
        reason,
    };

    std::fs::create_dir_all(output_dir)?;

    let file = File::open(archive).map_err(|e| failed(format!("failed to open archive: {e}")))?;
    let reader = BufReader::with_capacity(READ_BUFFER_SIZE, file);
    let mut tar = tar::Archive::new(BzDecoder::new(reader));

    let entries = tar
        .entries()
        .map_err(|e| failed(format!("failed to read tar stream: {e}")))?;

    let mut unpacked = 0;
    for entry in entries {
        let mut entry = entry.map_err(|e| failed(format!("corrupt tar entry: {e}")))?;
        let entry_path: PathBuf = entry
            .path()
            .map(|p| p.into_owned())
            .unwrap_or_default();

        let written = entry.unpack_in(output_dir).map_err(|e| {
            failed(format!(
                "failed to unpack {}: {e}",
                entry_path.display()
            ))
        })?;
        if written {
            unpacked += 1;
        } else {
            debug!(path = %entry_path.display(), "skipped entry outside the output directory");
        }
    }

    if unpacked == 0 {
        return Err(failed("archive contains no entries".to_string()));
    }

    Ok(unpacked)
}
