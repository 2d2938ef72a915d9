// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    pending = { TaskState::Pending, false },
    started = { TaskState::Started, false },
    updated = { TaskState::Updated, false },
    success = { TaskState::Success, true },
    failure = { TaskState::Failure, true },
    revoked = { TaskState::Revoked, true },
)]
fn terminal_states(state: TaskState, terminal: bool) {
    assert_eq!(state.is_terminal(), terminal);
}

#[test]
fn states_serialize_uppercase() {
    assert_eq!(serde_json::to_value(TaskState::Updated).unwrap(), "UPDATED");
    assert_eq!(serde_json::to_value(TaskState::Failure).unwrap(), "FAILURE");
}

#[test]
fn unknown_task_reads_as_pending() {
    let meta = TaskMeta::pending();
    assert_eq!(meta.status, TaskState::Pending);
    assert!(meta.kwargs.is_none());
    assert!(meta.date_done.is_none());
}

#[test]
fn progress_update_round_trip() {
    let update = ProgressUpdate { progress: Some(50), message: "halfway".into(), updated: 1_000_100 };
    let json = serde_json::to_string(&update).unwrap();
    let parsed: ProgressUpdate = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, update);
}
