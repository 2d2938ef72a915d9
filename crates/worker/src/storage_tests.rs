// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn setup(resource: &str, bytes: usize) -> (tempfile::TempDir, JobId) {
    let tmp = tempfile::tempdir().unwrap();
    let job_id = JobId::new("job-1");
    let dir = crate::context::job_dir(tmp.path(), &job_id);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(resource), vec![0u8; bytes]).unwrap();
    (tmp, job_id)
}

#[test]
fn download_url_for_stored_file() {
    let (tmp, job_id) = setup("out.tif", 1_048_576);
    let link = LocalStorage
        .download_url(&job_id, "out.tif", tmp.path(), 3600)
        .unwrap()
        .unwrap();

    assert!(link.href.starts_with("file://"));
    assert!(link.href.ends_with("out.tif"));
    assert_eq!(link.length, Some(1_048_576));
    assert_eq!(link.mime_type.as_deref(), Some("image/tiff"));
    assert_eq!(link.title.as_deref(), Some("out.tif"));
}

#[test]
fn missing_resource_is_none() {
    let (tmp, job_id) = setup("out.tif", 16);
    let link = LocalStorage.download_url(&job_id, "nope.bin", tmp.path(), 3600).unwrap();
    assert!(link.is_none());
}

#[test]
fn path_escape_is_rejected() {
    let (tmp, job_id) = setup("out.tif", 16);
    // A sibling file outside the job directory
    std::fs::write(tmp.path().join("secret.txt"), b"shh").unwrap();

    let link = LocalStorage
        .download_url(&job_id, "../secret.txt", tmp.path(), 3600)
        .unwrap();
    assert!(link.is_none());
}

#[test]
fn unknown_extension_falls_back_to_octet_stream() {
    let (tmp, job_id) = setup("data.qqq", 4);
    let link = LocalStorage.download_url(&job_id, "data.qqq", tmp.path(), 3600).unwrap().unwrap();
    assert_eq!(link.mime_type.as_deref(), Some("application/octet-stream"));
}
