use crate::extraction::*;
use bzip2::Compression;
use bzip2::write::BzEncoder;
use std::path::Path;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Create a `.tar.bz2` archive holding the given files
fn create_tar_bz2(archive_path: &Path, files: &[(&str, &[u8])]) {
    let file = std::fs::File::create(archive_path).unwrap();
    let encoder = BzEncoder::new(file, Compression::fast());
    let mut builder = tar::Builder::new(encoder);
    for (name, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, *content).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap();
}

fn motion_files(dataset: &str) -> Vec<(String, Vec<u8>)> {
    vec![
        (format!("{dataset}/subject1/walk_poses.npz"), b"walk".to_vec()),
        (format!("{dataset}/subject1/run_poses.npz"), b"run".to_vec()),
    ]
}

fn create_dataset_archive(dir: &Path, dataset: &str) -> std::path::PathBuf {
    let path = dir.join(format!("{dataset}_smplx_neutral.tar.bz2"));
    let files = motion_files(dataset);
    let refs: Vec<(&str, &[u8])> = files
        .iter()
        .map(|(n, c)| (n.as_str(), c.as_slice()))
        .collect();
    create_tar_bz2(&path, &refs);
    path
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

#[test]
fn find_archives_is_sorted_and_skips_partials() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("SSM_smplx_neutral.tar.bz2"), b"x").unwrap();
    std::fs::write(dir.path().join("ACCAD_smplx_neutral.tar.bz2"), b"x").unwrap();
    std::fs::write(dir.path().join("CMU_smplx_neutral.tar.bz2.part"), b"x").unwrap();
    std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
    std::fs::create_dir(dir.path().join("KIT.tar.bz2")).unwrap();

    let found = find_archives(dir.path()).unwrap();
    let names: Vec<_> = found
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec!["ACCAD_smplx_neutral.tar.bz2", "SSM_smplx_neutral.tar.bz2"]
    );
}

#[tokio::test]
async fn missing_input_directory_yields_empty_summary() {
    let dir = TempDir::new().unwrap();
    let summary = extract_all(&dir.path().join("absent"), dir.path(), false, 2)
        .await
        .unwrap();
    assert!(summary.archives.is_empty());
    assert!(summary.is_success());
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

#[tokio::test]
async fn extract_one_keeps_source_by_default() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let archive = create_dataset_archive(input.path(), "ACCAD");

    let entry = extract_one(&archive, output.path(), false).await;

    assert_eq!(entry.state, ExtractState::Extracted);
    assert_eq!(entry.entries, 2);
    assert!(entry.error_detail.is_none());
    assert!(archive.exists());
    assert_eq!(
        std::fs::read(output.path().join("ACCAD/subject1/walk_poses.npz")).unwrap(),
        b"walk"
    );
}

#[tokio::test]
async fn extract_one_deletes_source_when_asked() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let archive = create_dataset_archive(input.path(), "CMU");

    let entry = extract_one(&archive, output.path(), true).await;

    assert_eq!(entry.state, ExtractState::SourceDeleted);
    assert!(entry.state.is_extracted());
    assert!(!archive.exists());
    assert!(output.path().join("CMU/subject1/run_poses.npz").exists());
}

#[tokio::test]
async fn corrupt_archive_is_kept_and_reported() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let archive = input.path().join("KIT_smplx_neutral.tar.bz2");
    std::fs::write(&archive, b"this is not a bzip2 stream").unwrap();

    let entry = extract_one(&archive, output.path(), true).await;

    assert_eq!(entry.state, ExtractState::ExtractFailed);
    assert_eq!(entry.error_detail.unwrap().code, "extraction_failed");
    assert!(archive.exists(), "failed archive must not be deleted");
}

#[tokio::test]
async fn empty_archive_file_is_a_failure() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let archive = input.path().join("SFU_smplx_neutral.tar.bz2");
    std::fs::write(&archive, b"").unwrap();

    let entry = extract_one(&archive, output.path(), false).await;

    assert_eq!(entry.state, ExtractState::ExtractFailed);
}

#[tokio::test]
async fn extract_all_reports_in_discovery_order() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    create_dataset_archive(input.path(), "SSM");
    create_dataset_archive(input.path(), "ACCAD");
    std::fs::write(input.path().join("GRAB_smplx_neutral.tar.bz2"), b"garbage").unwrap();

    let summary = extract_all(input.path(), output.path(), true, 3)
        .await
        .unwrap();

    let states: Vec<_> = summary
        .archives
        .iter()
        .map(|a| {
            (
                a.archive.file_name().unwrap().to_string_lossy().into_owned(),
                a.state,
            )
        })
        .collect();
    assert_eq!(
        states,
        vec![
            (
                "ACCAD_smplx_neutral.tar.bz2".to_string(),
                ExtractState::SourceDeleted
            ),
            (
                "GRAB_smplx_neutral.tar.bz2".to_string(),
                ExtractState::ExtractFailed
            ),
            (
                "SSM_smplx_neutral.tar.bz2".to_string(),
                ExtractState::SourceDeleted
            ),
        ]
    );
    assert_eq!(summary.succeeded(), 2);
    assert_eq!(summary.failed(), 1);
    assert!(!summary.is_success());
    assert!(input.path().join("GRAB_smplx_neutral.tar.bz2").exists());
    assert!(output.path().join("SSM/subject1/walk_poses.npz").exists());
}

#[tokio::test]
async fn out_of_range_worker_count_is_clamped() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    create_dataset_archive(input.path(), "HDM05");

    let summary = extract_all(input.path(), output.path(), false, 0)
        .await
        .unwrap();

    assert_eq!(summary.succeeded(), 1);
}

#[tokio::test]
async fn progress_hook_sees_every_state_transition() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    create_dataset_archive(input.path(), "ACCAD");
    std::fs::write(input.path().join("CMU_smplx_neutral.tar.bz2"), b"garbage").unwrap();

    let seen = std::sync::Mutex::new(Vec::new());
    let summary = extract_all_with_progress(input.path(), output.path(), false, 1, |archive, state| {
        let name = archive.file_name().unwrap().to_string_lossy().into_owned();
        seen.lock().unwrap().push((name, state));
    })
    .await
    .unwrap();

    assert_eq!(summary.archives.len(), 2);
    let accad = "ACCAD_smplx_neutral.tar.bz2".to_string();
    let cmu = "CMU_smplx_neutral.tar.bz2".to_string();
    assert_eq!(
        seen.into_inner().unwrap(),
        vec![
            (accad.clone(), ExtractState::Pending),
            (cmu.clone(), ExtractState::Pending),
            (accad.clone(), ExtractState::Extracting),
            (accad, ExtractState::Extracted),
            (cmu.clone(), ExtractState::Extracting),
            (cmu, ExtractState::ExtractFailed),
        ]
    );
}
