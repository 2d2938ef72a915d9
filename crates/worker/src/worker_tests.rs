// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker daemon integration tests over the in-memory substrates with
//! the in-process launcher.

use super::*;
use crate::cache::LocalCache;
use crate::config::ServiceSection;
use crate::pool::LocalLauncher;
use crate::processes::ProcessSet;
use crate::storage::LocalStorage;

use qjazz_broker::memory::{MemoryBroker, MemoryResultStore};
use qjazz_broker::{RunConfig, TaskKwargs};
use qjazz_core::test_support;
use qjazz_core::JobStatus;
use qjazz_registry::memory::MemoryRegistry;
use serde_json::json;

struct Rig {
    broker: Arc<MemoryBroker>,
    backend: Arc<MemoryResultStore>,
    registry: Arc<MemoryRegistry>,
    worker: Arc<Worker>,
    workdir: tempfile::TempDir,
}

fn rig() -> Rig {
    let workdir = tempfile::tempdir().unwrap();
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

    let broker = Arc::new(MemoryBroker::new());
    let backend = Arc::new(MemoryResultStore::new());
    let registry = Arc::new(MemoryRegistry::new());

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
    Rig { broker, backend, registry, worker, workdir }
}

fn task(job_id: &str, ident: &str, inputs: serde_json::Value) -> TaskMessage {
    TaskMessage {
        id: JobId::new(job_id),
        task: qjazz_broker::PROCESS_EXECUTE.to_string(),
        kwargs: TaskKwargs {
            meta: test_support::meta("demo", ident),
            context: Value::Null,
            run_config: RunConfig {
                ident: ident.to_string(),
                request: serde_json::from_value(json!({"inputs": inputs})).unwrap(),
                project_path: None,
            },
        },
        priority: 0,
        expires_at: None,
        not_before: None,
    }
}

async fn submit(rig: &Rig, message: TaskMessage) -> JobId {
    let job_id = message.id.clone();
    let status =
        JobStatus::new(job_id.clone(), &message.kwargs.run_config.ident, qjazz_core::JobState::Pending, 1);
    rig.registry.register("demo", None, &status, 3_600, 600).await.unwrap();
    rig.broker.send_task("demo", message).await.unwrap();
    job_id
}

async fn wait_terminal(rig: &Rig, job_id: &JobId) -> TaskMeta {
    for _ in 0..100 {
        let meta = rig.backend.get_task_meta(job_id).await.unwrap();
        if meta.status.is_terminal() {
            return meta;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("job {job_id} never reached a terminal state");
}

async fn control(rig: &Rig, command: Command) -> Value {
    use std::sync::atomic::{AtomicU64, Ordering};
    static SEQ: AtomicU64 = AtomicU64::new(0);

    let seq = SEQ.fetch_add(1, Ordering::Relaxed);
    let request = ControlRequest {
        id: format!("c{seq}"),
        command,
        destination: None,
        reply_to: format!("qjazz.reply.c{seq}"),
        expires_at: u64::MAX,
    };
    let reply_to = request.reply_to.clone();
    rig.broker.publish_control(request).await.unwrap();
    let mut replies =
        rig.broker.collect_replies(&reply_to, Duration::from_secs(2), 1).await.unwrap();
    replies.pop().expect("no control reply").payload
}

#[tokio::test]
async fn echo_job_succeeds() {
    let rig = rig();
    let worker = Arc::clone(&rig.worker);
    tokio::spawn(worker.run());

    let job_id = submit(&rig, task("job-echo", "echo", json!({"msg": "hi"}))).await;
    let meta = wait_terminal(&rig, &job_id).await;

    assert_eq!(meta.status, TaskState::Success);
    assert_eq!(meta.result["output"], "hi");
    assert!(meta.date_done.is_some());
    // Kwargs preserved for status composition
    assert_eq!(meta.kwargs.unwrap().meta.process_id, "echo");

    // Workdir layout: sentinel created before the run
    let dir = rig.workdir.path().join("job-echo");
    assert!(dir.join(".job-expire-demo").exists());
    assert!(dir.join(PROCESSING_LOG).exists());

    rig.worker.stop();
}

#[tokio::test]
async fn write_file_job_resolves_links() {
    let rig = rig();
    let worker = Arc::clone(&rig.worker);
    tokio::spawn(worker.run());

    let job_id = submit(
        &rig,
        task("job-file", "write_file", json!({"name": "out.tif", "size": 1_048_576})),
    )
    .await;
    let meta = wait_terminal(&rig, &job_id).await;
    assert_eq!(meta.status, TaskState::Success);

    // links.json written with the placeholder base
    let raw = std::fs::read_to_string(rig.workdir.path().join("job-file").join(FILE_LINKS)).unwrap();
    let links: Vec<Link> = serde_json::from_str(&raw).unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].href, "$public_url/jobs/job-file/files/out.tif");
    assert_eq!(links[0].length, Some(1_048_576));
    assert_eq!(links[0].mime_type.as_deref(), Some("image/tiff"));

    // job_files substitutes the caller's public URL
    let payload = control(
        &rig,
        Command::JobFiles {
            job_id: job_id.clone(),
            public_url: Some("https://maps.example".to_string()),
        },
    )
    .await;
    let files: ProcessFiles = serde_json::from_value(payload).unwrap();
    assert_eq!(files.links[0].href, "https://maps.example/jobs/job-file/files/out.tif");
    assert_eq!(files.links[0].title.as_deref(), Some("out.tif"));

    // Download link for the stored resource
    let payload = control(
        &rig,
        Command::DownloadUrl { job_id: job_id.clone(), resource: "out.tif".into(), expiration: 60 },
    )
    .await;
    let link: Link = serde_json::from_value(payload).unwrap();
    assert!(link.href.starts_with("file://"));

    rig.worker.stop();
}

#[tokio::test]
async fn dismissed_before_start_fails_with_marker() {
    let rig = rig();
    let worker = Arc::clone(&rig.worker);
    tokio::spawn(worker.run());

    let message = task("job-dismissed", "echo", json!({"msg": "hi"}));
    let job_id = message.id.clone();
    let status = JobStatus::new(
        job_id.clone(),
        "echo",
        qjazz_core::JobState::Pending,
        1,
    );
    rig.registry.register("demo", None, &status, 3_600, 600).await.unwrap();
    rig.registry.dismiss(&job_id, false).await.unwrap();
    rig.broker.send_task("demo", message).await.unwrap();

    let meta = wait_terminal(&rig, &job_id).await;
    assert_eq!(meta.status, TaskState::Failure);
    let failure: FailureInfo = serde_json::from_value(meta.result).unwrap();
    assert_eq!(failure.code, ErrorCode::Dismissed);

    // No side effects: the workdir was never created
    assert!(!rig.workdir.path().join("job-dismissed").exists());

    rig.worker.stop();
}

#[tokio::test]
async fn revoke_terminates_running_job() {
    let rig = rig();
    let worker = Arc::clone(&rig.worker);
    tokio::spawn(worker.run());

    let job_id = submit(&rig, task("job-sleep", "sleep", json!({"delay": 4}))).await;

    // Wait until the runner is active
    for _ in 0..50 {
        let payload = control(&rig, Command::QueryTask { job_id: job_id.clone() }).await;
        if payload.get("state") == Some(&json!("active")) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    let payload = control(&rig, Command::Revoke { job_id: job_id.clone() }).await;
    assert_eq!(payload["ok"], true);

    let meta = wait_terminal(&rig, &job_id).await;
    // Cooperative cancellation surfaces as the dismissed marker
    let failure: FailureInfo = serde_json::from_value(meta.result.clone()).unwrap_or_else(|_| {
        FailureInfo::new(ErrorCode::Dismissed, String::new())
    });
    assert!(
        meta.status == TaskState::Revoked
            || (meta.status == TaskState::Failure && failure.code == ErrorCode::Dismissed),
        "unexpected terminal meta: {meta:?}",
    );

    rig.worker.stop();
}

#[tokio::test]
async fn progress_updates_are_monotonic() {
    let rig = rig();
    let worker = Arc::clone(&rig.worker);
    tokio::spawn(worker.run());

    let job_id = submit(&rig, task("job-progress", "sleep", json!({"delay": 2}))).await;

    let mut seen: Vec<u8> = Vec::new();
    loop {
        let meta = rig.backend.get_task_meta(&job_id).await.unwrap();
        match meta.status {
            TaskState::Updated => {
                if let Some(progress) =
                    meta.result.get("progress").and_then(Value::as_u64)
                {
                    seen.push(progress as u8);
                }
            }
            state if state.is_terminal() => break,
            _ => {}
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    assert!(seen.windows(2).all(|pair| pair[0] <= pair[1]), "progress regressed: {seen:?}");
    let meta = rig.backend.get_task_meta(&job_id).await.unwrap();
    assert_eq!(meta.status, TaskState::Success);

    rig.worker.stop();
}

#[tokio::test]
async fn presence_and_inspection() {
    let rig = rig();
    let worker = Arc::clone(&rig.worker);
    tokio::spawn(worker.run());
    // Let the boot-time cache update land
    tokio::time::sleep(Duration::from_millis(100)).await;

    let payload = control(&rig, Command::Presence).await;
    let presence: WorkerPresence = serde_json::from_value(payload).unwrap();
    assert_eq!(presence.service, "demo");
    assert_eq!(presence.result_expires, 3_600);
    assert_eq!(presence.entrypoint.as_deref(), Some(rig.worker.hostname()));

    let payload = control(&rig, Command::ListProcesses).await;
    let summaries: Vec<qjazz_core::ProcessSummary> = serde_json::from_value(payload).unwrap();
    assert_eq!(summaries.len(), 3);

    let payload = control(
        &rig,
        Command::DescribeProcess { ident: "echo".into(), project_path: None },
    )
    .await;
    let description: qjazz_core::ProcessDescription = serde_json::from_value(payload).unwrap();
    assert_eq!(description.summary.id, "echo");

    let payload =
        control(&rig, Command::DescribeProcess { ident: "bogus".into(), project_path: None }).await;
    assert!(payload.is_null());

    rig.worker.stop();
}

#[tokio::test]
async fn job_log_tail_served() {
    let rig = rig();
    let worker = Arc::clone(&rig.worker);
    tokio::spawn(worker.run());

    let job_id = submit(&rig, task("job-logged", "write_file", json!({"name": "a.bin"}))).await;
    wait_terminal(&rig, &job_id).await;

    let payload = control(&rig, Command::JobLog { job_id }).await;
    let log: ProcessLog = serde_json::from_value(payload).unwrap();
    assert!(log.log.contains("wrote a.bin"));

    let payload = control(&rig, Command::JobLog { job_id: JobId::new("job-ghost") }).await;
    let log: ProcessLog = serde_json::from_value(payload).unwrap();
    assert_eq!(log.log, "No log available");

    rig.worker.stop();
}
