// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use qjazz_broker::{RunConfig, TaskKwargs};
use qjazz_core::test_support;
use qjazz_core::JobExecute;
use serde_json::json;
use yare::parameterized;

fn info(created: u64, pending_timeout: u64) -> TaskInfo {
    TaskInfo {
        job_id: JobId::new("job-1"),
        created,
        service: "demo".into(),
        realm: None,
        process_id: "echo".into(),
        dismissed: false,
        pending_timeout,
        tag: Some("batch".into()),
    }
}

fn meta(status: TaskState, result: Value) -> TaskMeta {
    TaskMeta { status, result, kwargs: None, date_done: None }
}

#[parameterized(
    active = { QueryTaskState::Active, JobState::Running },
    scheduled = { QueryTaskState::Scheduled, JobState::Accepted },
    reserved = { QueryTaskState::Reserved, JobState::Accepted },
    revoked = { QueryTaskState::Revoked, JobState::Dismissed },
)]
fn pending_with_worker_answer(query: QueryTaskState, expected: JobState) {
    let status = from_task_meta(
        &JobId::new("job-1"),
        &meta(TaskState::Pending, Value::Null),
        Some(query),
        &info(1_000, 600),
        1_100,
    )
    .unwrap();
    assert_eq!(status.status, expected);
}

#[test]
fn pending_within_window() {
    let status = from_task_meta(
        &JobId::new("job-1"),
        &meta(TaskState::Pending, Value::Null),
        None,
        &info(1_000, 600),
        1_599,
    )
    .unwrap();
    assert_eq!(status.status, JobState::Pending);
    assert_eq!(status.created, 1_000);
    assert_eq!(status.tag.as_deref(), Some("batch"));
}

#[test]
fn pending_beyond_window_expires() {
    let status = from_task_meta(
        &JobId::new("job-1"),
        &meta(TaskState::Pending, Value::Null),
        None,
        &info(1_000, 600),
        1_600,
    );
    assert!(status.is_none());
}

#[test]
fn pending_dismissed_record_reads_as_gone() {
    let mut record = info(1_000, 600);
    record.dismissed = true;
    let status = from_task_meta(
        &JobId::new("job-1"),
        &meta(TaskState::Pending, Value::Null),
        None,
        &record,
        1_100,
    );
    assert!(status.is_none());
}

#[test]
fn started_reports_running() {
    let status = from_task_meta(
        &JobId::new("job-1"),
        &meta(TaskState::Started, json!({"started": 1_050})),
        None,
        &info(1_000, 600),
        1_100,
    )
    .unwrap();
    assert_eq!(status.status, JobState::Running);
    assert_eq!(status.started, Some(1_050));
    assert_eq!(status.message, "Task started");
}

#[test]
fn updated_carries_progress() {
    let status = from_task_meta(
        &JobId::new("job-1"),
        &meta(
            TaskState::Updated,
            json!({"progress": 50, "message": "halfway", "updated": 1_080}),
        ),
        None,
        &info(1_000, 600),
        1_100,
    )
    .unwrap();
    assert_eq!(status.status, JobState::Running);
    assert_eq!(status.progress, Some(50));
    assert_eq!(status.message, "halfway");
    assert_eq!(status.updated, Some(1_080));
}

#[test]
fn success_is_complete() {
    let mut task_meta = meta(TaskState::Success, json!({"output": "hi"}));
    task_meta.date_done = Some(1_090);
    let status =
        from_task_meta(&JobId::new("job-1"), &task_meta, None, &info(1_000, 600), 1_100).unwrap();
    assert_eq!(status.status, JobState::Successful);
    assert_eq!(status.progress, Some(100));
    assert_eq!(status.finished, Some(1_090));
}

#[parameterized(
    input_error = { "input-error", "bad value for 'msg'", JobState::Failed, "bad value for 'msg'" },
    dismissed = { "dismissed", "job-1", JobState::Dismissed, "Dismissed task" },
    processing = { "processing-error", "traceback", JobState::Failed, "Internal processing error" },
    internal = { "internal", "panic", JobState::Failed, "Internal worker error" },
)]
fn failure_classified_by_marker(code: &str, raw: &str, state: JobState, message: &str) {
    let status = from_task_meta(
        &JobId::new("job-1"),
        &meta(TaskState::Failure, json!({"code": code, "message": raw})),
        None,
        &info(1_000, 600),
        1_100,
    )
    .unwrap();
    assert_eq!(status.status, state);
    assert_eq!(status.message, message);
}

#[test]
fn revoked_reports_dismissed() {
    let mut task_meta = meta(TaskState::Revoked, Value::Null);
    task_meta.date_done = Some(1_095);
    let status =
        from_task_meta(&JobId::new("job-1"), &task_meta, None, &info(1_000, 600), 1_100).unwrap();
    assert_eq!(status.status, JobState::Dismissed);
    assert_eq!(status.finished, Some(1_095));
}

#[test]
fn kwargs_meta_overrides_registry_fields() {
    let kwargs = TaskKwargs {
        meta: qjazz_core::JobMeta { tag: Some("from-meta".into()), ..test_support::meta("demo", "buffer") },
        context: Value::Null,
        run_config: RunConfig {
            ident: "buffer".into(),
            request: JobExecute::default(),
            project_path: None,
        },
    };
    let task_meta = TaskMeta {
        status: TaskState::Started,
        result: Value::Null,
        kwargs: Some(kwargs),
        date_done: None,
    };
    let status =
        from_task_meta(&JobId::new("job-1"), &task_meta, None, &info(2_000, 600), 2_100).unwrap();
    assert_eq!(status.process_id.as_deref(), Some("buffer"));
    assert_eq!(status.created, 1_000_000);
    assert_eq!(status.tag.as_deref(), Some("from-meta"));
}
