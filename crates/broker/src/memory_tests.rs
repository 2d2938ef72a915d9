// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::message::{Command, RunConfig, TaskKwargs};
use qjazz_core::test_support;
use qjazz_core::JobExecute;
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};

fn message(id: &str, priority: u8) -> TaskMessage {
    TaskMessage {
        id: JobId::new(id),
        task: crate::PROCESS_EXECUTE.to_string(),
        kwargs: TaskKwargs {
            meta: test_support::meta("demo", "echo"),
            context: Value::Null,
            run_config: RunConfig {
                ident: "echo".into(),
                request: JobExecute::default(),
                project_path: None,
            },
        },
        priority,
        expires_at: None,
        not_before: None,
    }
}

#[tokio::test]
async fn tasks_are_fifo_within_a_band() {
    let broker = MemoryBroker::new();
    broker.send_task("demo", message("job-1", 0)).await.unwrap();
    broker.send_task("demo", message("job-2", 0)).await.unwrap();

    let first = broker.next_task("demo", Duration::from_millis(10)).await.unwrap().unwrap();
    let second = broker.next_task("demo", Duration::from_millis(10)).await.unwrap().unwrap();
    assert_eq!(first.id, "job-1");
    assert_eq!(second.id, "job-2");
}

#[tokio::test]
async fn priority_band_served_first() {
    let broker = MemoryBroker::new();
    broker.send_task("demo", message("job-low", 0)).await.unwrap();
    broker.send_task("demo", message("job-high", 9)).await.unwrap();

    let first = broker.next_task("demo", Duration::from_millis(10)).await.unwrap().unwrap();
    assert_eq!(first.id, "job-high");
}

#[tokio::test]
async fn empty_queue_times_out() {
    let broker = MemoryBroker::new();
    let got = broker.next_task("demo", Duration::from_millis(10)).await.unwrap();
    assert!(got.is_none());
}

#[tokio::test]
async fn delayed_message_held_until_eta() {
    static NOW: AtomicU64 = AtomicU64::new(1_000);
    let broker = MemoryBroker::with_now(|| NOW.load(Ordering::SeqCst));

    let mut delayed = message("job-later", 0);
    delayed.not_before = Some(1_060);
    broker.send_task("demo", delayed).await.unwrap();

    assert!(broker.next_task("demo", Duration::from_millis(10)).await.unwrap().is_none());

    NOW.store(1_060, Ordering::SeqCst);
    let got = broker.next_task("demo", Duration::from_millis(10)).await.unwrap().unwrap();
    assert_eq!(got.id, "job-later");
}

#[tokio::test]
async fn control_fan_out_and_reply_collection() {
    let broker = MemoryBroker::new();
    let mut rx_a = broker.listen_control().await.unwrap();
    let mut rx_b = broker.listen_control().await.unwrap();

    let request = ControlRequest {
        id: "c1".into(),
        command: Command::Ping,
        destination: None,
        reply_to: "qjazz.reply.c1".into(),
        expires_at: u64::MAX,
    };
    broker.publish_control(request.clone()).await.unwrap();

    assert_eq!(rx_a.recv().await.unwrap(), request);
    assert_eq!(rx_b.recv().await.unwrap(), request);

    broker
        .send_reply("qjazz.reply.c1", ControlReply::new("worker-a", json!({"ok": true})))
        .await
        .unwrap();
    broker
        .send_reply("qjazz.reply.c1", ControlReply::new("worker-b", json!({"ok": true})))
        .await
        .unwrap();

    let replies =
        broker.collect_replies("qjazz.reply.c1", Duration::from_millis(100), 2).await.unwrap();
    assert_eq!(replies.len(), 2);
}

#[tokio::test]
async fn collect_replies_stops_at_deadline() {
    let broker = MemoryBroker::new();
    let replies =
        broker.collect_replies("qjazz.reply.none", Duration::from_millis(20), 3).await.unwrap();
    assert!(replies.is_empty());
}

#[tokio::test]
async fn result_store_ttl_expires_with_clock() {
    static NOW: AtomicU64 = AtomicU64::new(1_000);
    let store = MemoryResultStore::with_now(|| NOW.load(Ordering::SeqCst));
    let job_id = JobId::new("job-1");

    store
        .set_task_meta(
            &job_id,
            TaskMeta {
                status: TaskState::Success,
                result: json!({"output": "hi"}),
                kwargs: None,
                date_done: Some(1_000),
            },
            Duration::from_secs(60),
        )
        .await
        .unwrap();

    assert_eq!(store.get_task_meta(&job_id).await.unwrap().status, TaskState::Success);

    NOW.store(1_061, Ordering::SeqCst);
    assert_eq!(store.get_task_meta(&job_id).await.unwrap().status, TaskState::Pending);
}

#[tokio::test]
async fn update_state_preserves_kwargs() {
    let store = MemoryResultStore::new();
    let job_id = JobId::new("job-1");
    let kwargs = TaskKwargs {
        meta: test_support::meta("demo", "echo"),
        context: Value::Null,
        run_config: RunConfig {
            ident: "echo".into(),
            request: JobExecute::default(),
            project_path: None,
        },
    };

    store
        .set_task_meta(
            &job_id,
            TaskMeta {
                status: TaskState::Started,
                result: Value::Null,
                kwargs: Some(kwargs.clone()),
                date_done: None,
            },
            Duration::from_secs(60),
        )
        .await
        .unwrap();

    store
        .update_state(
            &job_id,
            TaskState::Updated,
            json!({"progress": 50, "message": "halfway", "updated": 1_000}),
            Duration::from_secs(60),
        )
        .await
        .unwrap();

    let meta = store.get_task_meta(&job_id).await.unwrap();
    assert_eq!(meta.status, TaskState::Updated);
    assert_eq!(meta.kwargs, Some(kwargs));
    assert!(meta.date_done.is_none());

    store
        .update_state(&job_id, TaskState::Success, json!({"output": "hi"}), Duration::from_secs(60))
        .await
        .unwrap();
    assert!(store.get_task_meta(&job_id).await.unwrap().date_done.is_some());
}
