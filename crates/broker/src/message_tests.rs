// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use qjazz_core::test_support;
use serde_json::json;

fn task_message() -> TaskMessage {
    TaskMessage {
        id: JobId::new("job-1"),
        task: crate::PROCESS_EXECUTE.to_string(),
        kwargs: TaskKwargs {
            meta: test_support::meta("demo", "echo"),
            context: json!({"public_url": "https://maps.example"}),
            run_config: RunConfig {
                ident: "echo".into(),
                request: JobExecute::default(),
                project_path: None,
            },
        },
        priority: 0,
        expires_at: Some(1_000_600),
        not_before: None,
    }
}

#[test]
fn kwargs_use_dunder_keys() {
    let json = serde_json::to_value(&task_message().kwargs).unwrap();
    assert!(json.get("__meta__").is_some());
    assert!(json.get("__context__").is_some());
    assert!(json.get("__run_config__").is_some());
}

#[test]
fn expiry_check() {
    let msg = task_message();
    assert!(!msg.is_expired(1_000_599));
    assert!(msg.is_expired(1_000_600));

    let mut msg = msg;
    msg.expires_at = None;
    assert!(!msg.is_expired(u64::MAX));
}

#[test]
fn control_request_addressing() {
    let request = ControlRequest {
        id: "c1".into(),
        command: Command::Presence,
        destination: Some(vec!["worker-a".into()]),
        reply_to: "qjazz.reply.c1".into(),
        expires_at: 1_000_005,
    };
    assert!(request.addresses("worker-a"));
    assert!(!request.addresses("worker-b"));

    let broadcast = ControlRequest { destination: None, ..request };
    assert!(broadcast.addresses("worker-b"));
}

#[test]
fn command_tag_round_trip() {
    let command = Command::DescribeProcess { ident: "echo".into(), project_path: None };
    let json = serde_json::to_value(&command).unwrap();
    assert_eq!(json["command"], "describe_process");
    let parsed: Command = serde_json::from_value(json).unwrap();
    assert_eq!(parsed, command);
}

#[test]
fn reply_error_envelope() {
    let ok = ControlReply::new("worker-a", json!({"service": "demo"}));
    assert!(ok.error().is_none());

    let err = ControlReply::new("worker-a", json!({"error": "no such job"}));
    assert_eq!(err.error(), Some("no such job"));
}
