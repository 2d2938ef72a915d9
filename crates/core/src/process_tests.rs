// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn job_control_options_wire_names() {
    let json = serde_json::to_value(vec![
        JobControlOption::SyncExecute,
        JobControlOption::AsyncExecute,
        JobControlOption::Dismiss,
    ])
    .unwrap();
    assert_eq!(json, json!(["sync-execute", "async-execute", "dismiss"]));
}

#[test]
fn summary_allows() {
    let summary: ProcessSummary = serde_json::from_value(json!({
        "id": "echo",
        "title": "Echo",
        "jobControlOptions": ["sync-execute", "dismiss"],
    }))
    .unwrap();

    assert!(summary.allows(JobControlOption::SyncExecute));
    assert!(summary.allows(JobControlOption::Dismiss));
    assert!(!summary.allows(JobControlOption::AsyncExecute));
}

#[test]
fn description_flattens_summary() {
    let description: ProcessDescription = serde_json::from_value(json!({
        "id": "echo",
        "title": "Echo",
        "version": "1.0",
        "inputs": {
            "msg": {"title": "Message", "schema": {"type": "string"}},
        },
        "outputs": {
            "output": {"title": "Output", "schema": {"type": "string"}},
        },
    }))
    .unwrap();

    assert_eq!(description.summary.id, "echo");
    assert_eq!(description.inputs["msg"].min_occurs, 1);
    assert_eq!(description.inputs["msg"].max_occurs, None);

    let json = serde_json::to_value(&description).unwrap();
    assert_eq!(json["id"], "echo");
    assert!(json.get("summary").is_none());
}

#[test]
fn execute_request_defaults() {
    let request: JobExecute = serde_json::from_value(json!({"inputs": {"msg": "hi"}})).unwrap();
    assert_eq!(request.inputs["msg"], "hi");
    assert!(request.outputs.is_empty());
    assert!(request.subscriber.is_none());
}

#[test]
fn subscriber_empty() {
    assert!(Subscriber::default().is_empty());

    let subscriber: Subscriber =
        serde_json::from_value(json!({"successUri": "https://cb.example/ok"})).unwrap();
    assert!(!subscriber.is_empty());
    assert_eq!(subscriber.success_uri.as_deref(), Some("https://cb.example/ok"));
}
