// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace-level scenario tests: executor and worker wired over the
//! in-memory substrates, exercising the whole job lifecycle without
//! an external broker.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use qjazz_broker::memory::{MemoryBroker, MemoryResultStore};
use qjazz_core::{JobExecute, JobState, ProcessesError};
use qjazz_executor::{DismissOptions, ExecuteOptions, Executor, ExecutorError, ExecutorOptions};
use qjazz_registry::memory::MemoryRegistry;
use qjazz_worker::cache::LocalCache;
use qjazz_worker::callbacks::Callbacks;
use qjazz_worker::config::{ServiceSection, WorkerConfig};
use qjazz_worker::pool::LocalLauncher;
use qjazz_worker::storage::LocalStorage;
use qjazz_worker::{ProcessSet, Worker};

struct Platform {
    executor: Executor,
    worker: Arc<Worker>,
    registry: Arc<MemoryRegistry>,
    workdir: tempfile::TempDir,
}

impl Drop for Platform {
    fn drop(&mut self) {
        self.worker.stop();
    }
}

async fn platform() -> Platform {
    let workdir = tempfile::tempdir().expect("tempdir");

    let broker = Arc::new(MemoryBroker::new());
    let backend = Arc::new(MemoryResultStore::new());
    let registry = Arc::new(MemoryRegistry::new());

    let config = WorkerConfig {
        worker: ServiceSection {
            service_name: "demo".to_string(),
            workdir: workdir.path().to_path_buf(),
            result_expires: 3_600,
            concurrency: 2,
            ..ServiceSection::default()
        },
        ..WorkerConfig::default()
    };
    let worker = Arc::new(Worker::new(
        config,
        broker.clone(),
        backend.clone(),
        registry.clone(),
        Arc::new(LocalLauncher::new(ProcessSet::builtin())),
        Arc::new(LocalStorage),
        Callbacks::new(),
        Arc::new(LocalCache::new(ProcessSet::builtin())),
    ));
    tokio::spawn(Arc::clone(&worker).run());

    let executor = Executor::new(
        broker,
        backend,
        registry.clone(),
        ExecutorOptions {
            presence_timeout: Duration::from_millis(200),
            command_timeout: Duration::from_millis(500),
            ..ExecutorOptions::default()
        },
    );

    for _ in 0..50 {
        let _ = executor.update_services().await;
        if executor.known_service("demo") {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(executor.known_service("demo"), "worker never came online");

    Platform { executor, worker, registry, workdir }
}

fn request(inputs: serde_json::Value) -> JobExecute {
    serde_json::from_value(json!({"inputs": inputs})).expect("execute request")
}

#[tokio::test]
async fn happy_path_sync() {
    let platform = platform().await;

    let handle = platform
        .executor
        .execute("demo", "echo", request(json!({"msg": "hi"})), ExecuteOptions::default())
        .await
        .expect("enqueue");

    let results = handle.wait_result(Duration::from_secs(5)).await.expect("results");
    assert_eq!(results.get("output"), Some(&json!("hi")));

    let status = handle.status().await.expect("status");
    assert_eq!(status.status, JobState::Successful);
    assert_eq!(status.progress, Some(100));
}

#[tokio::test]
async fn realm_scoping_end_to_end() {
    let platform = platform().await;

    let handle = platform
        .executor
        .execute(
            "demo",
            "echo",
            request(json!({"msg": "hi"})),
            ExecuteOptions::default().realm("abcdefgh"),
        )
        .await
        .expect("enqueue");
    handle.wait_result(Duration::from_secs(5)).await.expect("results");

    // Wrong realm: invisible
    let foreign =
        platform.executor.job_status(&handle.job_id, Some("otherrealm"), false).await.expect("status");
    assert!(foreign.is_none());
    let foreign =
        platform.executor.job_results(&handle.job_id, Some("otherrealm")).await.expect("results");
    assert!(foreign.is_none());

    // Matching realm: visible
    let own =
        platform.executor.job_status(&handle.job_id, Some("abcdefgh"), false).await.expect("status");
    assert_eq!(own.expect("own status").status, JobState::Successful);
}

#[tokio::test]
async fn dismiss_running_job_end_to_end() {
    let platform = platform().await;

    let handle = platform
        .executor
        .execute("demo", "sleep", request(json!({"delay": 8})), ExecuteOptions::default())
        .await
        .expect("enqueue");

    // Wait until the job is observed running
    for _ in 0..50 {
        let status = handle.status().await.expect("status");
        if status.status == JobState::Running {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    let dismissed = platform
        .executor
        .dismiss(&handle.job_id, None, DismissOptions::default())
        .await
        .expect("dismiss")
        .expect("dismissed status");
    assert_eq!(dismissed.status, JobState::Dismissed);

    // A dismissed job stays dismissed; a second dismissal is either
    // an explicit error or "not found", never success
    let again = platform.executor.dismiss(&handle.job_id, None, DismissOptions::default()).await;
    match again {
        Ok(None) => {}
        Err(ExecutorError::Processes(ProcessesError::DismissedTaskError(_))) => {}
        other => panic!("second dismiss must not succeed: {other:?}"),
    }

    // Registry record gone: status reads as not found
    let status = platform.executor.job_status(&handle.job_id, None, false).await.expect("status");
    assert!(status.is_none());
}

#[tokio::test]
async fn progress_stream_is_monotonic() {
    let platform = platform().await;

    let handle = platform
        .executor
        .execute("demo", "sleep", request(json!({"delay": 2})), ExecuteOptions::default())
        .await
        .expect("enqueue");

    let mut seen = Vec::new();
    loop {
        let status = handle.status().await.expect("status");
        if let Some(progress) = status.progress {
            seen.push(progress);
        }
        if status.status.is_terminal() {
            assert_eq!(status.status, JobState::Successful);
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    assert!(seen.windows(2).all(|pair| pair[0] <= pair[1]), "progress regressed: {seen:?}");
    assert_eq!(seen.last().copied(), Some(100));
}

#[tokio::test]
async fn file_outputs_are_advertised() {
    let platform = platform().await;

    let handle = platform
        .executor
        .execute(
            "demo",
            "write_file",
            request(json!({"name": "out.tif", "size": 1_048_576})),
            ExecuteOptions::default(),
        )
        .await
        .expect("enqueue");
    handle.wait_result(Duration::from_secs(5)).await.expect("results");

    let files = platform
        .executor
        .files(&handle.job_id, Some("https://maps.example"), None, Duration::from_secs(2))
        .await
        .expect("files")
        .expect("file list");

    assert_eq!(files.links.len(), 1);
    let link = &files.links[0];
    assert!(link.title.as_deref().is_some_and(|t| t.ends_with("out.tif")));
    assert_eq!(link.length, Some(1_048_576));
    assert_eq!(link.mime_type.as_deref(), Some("image/tiff"));
    assert!(link.href.starts_with("https://maps.example/"));

    // files(X) and files(Y) differ only in the href prefix
    let other = platform
        .executor
        .files(&handle.job_id, Some("https://other.example"), None, Duration::from_secs(2))
        .await
        .expect("files")
        .expect("file list");
    assert_eq!(other.links[0].title, link.title);
    assert_eq!(other.links[0].length, link.length);
    assert!(other.links[0].href.starts_with("https://other.example/"));

    // And the bytes are downloadable through the storage link
    let download = platform
        .executor
        .download_url(&handle.job_id, "out.tif", 60, None, Duration::from_secs(2))
        .await
        .expect("download url")
        .expect("link");
    assert!(download.href.starts_with("file://"));
    let path = download.href.trim_start_matches("file://");
    assert_eq!(std::fs::metadata(path).expect("stored file").len(), 1_048_576);

    drop(platform);
}

#[tokio::test]
async fn input_error_surfaces_verbatim() {
    let platform = platform().await;

    let handle = platform
        .executor
        .execute("demo", "echo", request(json!({})), ExecuteOptions::default())
        .await
        .expect("enqueue");

    let err = handle.wait_result(Duration::from_secs(5)).await.expect_err("must fail");
    match err {
        ExecutorError::Processes(ProcessesError::InputValueError(message)) => {
            assert!(message.contains("msg"));
        }
        other => panic!("expected input error, got {other:?}"),
    }

    let status = handle.status().await.expect("status");
    assert_eq!(status.status, JobState::Failed);
    assert!(status.message.contains("msg"));
}

#[tokio::test]
async fn cleanup_reclaims_dismissed_workdir() {
    let platform = platform().await;

    let handle = platform
        .executor
        .execute("demo", "echo", request(json!({"msg": "hi"})), ExecuteOptions::default())
        .await
        .expect("enqueue");
    handle.wait_result(Duration::from_secs(5)).await.expect("results");

    let job_dir = platform.workdir.path().join(handle.job_id.as_str());
    assert!(job_dir.exists());

    // Dismissing a finished job deletes its registry record; the
    // worker's next cleanup pass reclaims the directory
    platform
        .executor
        .dismiss(&handle.job_id, None, DismissOptions::default())
        .await
        .expect("dismiss");

    let registry: Arc<dyn qjazz_registry::Registry> = platform.registry.clone();
    let storage: Arc<dyn qjazz_worker::storage::Storage> = Arc::new(LocalStorage);
    qjazz_worker::cleanup::cleanup_expired_jobs(&registry, &storage, platform.workdir.path(), "demo")
        .await;

    assert!(!job_dir.exists());
}
