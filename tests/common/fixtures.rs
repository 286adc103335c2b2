//! Archive fixtures and mock server responses

use bzip2::Compression;
use bzip2::write::BzEncoder;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::config::DOWNLOAD_PATH;

/// Files packed into every dataset archive built by [`dataset_archive`]
pub const MOTION_FILES: &[&str] = &[
    "subject_01/walk_01_poses.npz",
    "subject_01/jog_02_poses.npz",
    "subject_02/jump_01_poses.npz",
];

/// Build an in-memory `.tar.bz2` laid out like an AMASS dataset archive
pub fn dataset_archive(dataset: &str) -> Vec<u8> {
    let encoder = BzEncoder::new(Vec::new(), Compression::fast());
    let mut builder = tar::Builder::new(encoder);
    for file in MOTION_FILES {
        let content = format!("{dataset}:{file}");
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, format!("{dataset}/{file}"), content.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

/// `sfile` query value for an SMPL-X neutral dataset
pub fn sfile_for(dataset: &str) -> String {
    format!("amass_per_dataset/smplx/neutral/mosh_results/{dataset}.tar.bz2")
}

/// Serve `body` for `dataset`
pub async fn mount_archive(server: &MockServer, dataset: &str, body: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(DOWNLOAD_PATH))
        .and(query_param("sfile", sfile_for(dataset).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(server)
        .await;
}

/// Answer every request for `dataset` with `status`
pub async fn mount_status(server: &MockServer, dataset: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(DOWNLOAD_PATH))
        .and(query_param("sfile", sfile_for(dataset).as_str()))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}
