// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;
use yare::parameterized;

#[parameterized(
    pending = { JobState::Pending, false },
    accepted = { JobState::Accepted, false },
    running = { JobState::Running, false },
    successful = { JobState::Successful, true },
    failed = { JobState::Failed, true },
    dismissed = { JobState::Dismissed, true },
)]
fn terminal_states(state: JobState, terminal: bool) {
    assert_eq!(state.is_terminal(), terminal);
}

#[parameterized(
    pending_to_accepted = { JobState::Pending, JobState::Accepted, true },
    pending_to_running = { JobState::Pending, JobState::Running, true },
    pending_to_successful = { JobState::Pending, JobState::Successful, true },
    pending_to_dismissed = { JobState::Pending, JobState::Dismissed, true },
    accepted_to_running = { JobState::Accepted, JobState::Running, true },
    running_to_failed = { JobState::Running, JobState::Failed, true },
    running_to_dismissed = { JobState::Running, JobState::Dismissed, true },
    running_to_pending = { JobState::Running, JobState::Pending, false },
    accepted_to_pending = { JobState::Accepted, JobState::Pending, false },
    successful_out = { JobState::Successful, JobState::Running, false },
    dismissed_out = { JobState::Dismissed, JobState::Running, false },
    dismissed_to_dismissed = { JobState::Dismissed, JobState::Dismissed, false },
    failed_to_dismissed = { JobState::Failed, JobState::Dismissed, false },
)]
fn transition_partial_order(from: JobState, to: JobState, allowed: bool) {
    assert_eq!(from.can_transition_to(to), allowed);
}

#[test]
fn state_wire_names_round_trip() {
    for state in [
        JobState::Pending,
        JobState::Accepted,
        JobState::Running,
        JobState::Successful,
        JobState::Failed,
        JobState::Dismissed,
    ] {
        assert_eq!(JobState::parse(&state.to_string()), Some(state));
    }
    assert_eq!(JobState::parse("bogus"), None);
}

#[test]
fn status_serializes_camel_case() {
    let status = JobStatus::new(JobId::new("job-1"), "echo", JobState::Pending, 1000);
    let json = serde_json::to_value(&status).unwrap();

    assert_eq!(json["jobId"], "job-1");
    assert_eq!(json["processId"], "echo");
    assert_eq!(json["type"], "process");
    assert_eq!(json["status"], "pending");
    assert_eq!(json["created"], 1000);
    // Empty optional fields are omitted entirely
    assert!(json.get("progress").is_none());
    assert!(json.get("message").is_none());
    assert!(json.get("tag").is_none());
}

#[test]
fn status_setters() {
    let status = JobStatus::new(JobId::new("job-1"), "echo", JobState::Running, 1000)
        .message("working")
        .progress(Some(50))
        .tag("batch-7");

    assert_eq!(status.message, "working");
    assert_eq!(status.progress, Some(50));
    assert_eq!(status.tag.as_deref(), Some("batch-7"));
}

#[test]
fn meta_round_trip() {
    let meta = JobMeta {
        created: 1000,
        realm: Some("abcdefgh".into()),
        service: "demo".into(),
        process_id: "echo".into(),
        expires: 86400,
        tag: None,
    };
    let json = serde_json::to_string(&meta).unwrap();
    let parsed: JobMeta = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, meta);
}

fn arb_state() -> impl Strategy<Value = JobState> {
    prop_oneof![
        Just(JobState::Pending),
        Just(JobState::Accepted),
        Just(JobState::Running),
        Just(JobState::Successful),
        Just(JobState::Failed),
        Just(JobState::Dismissed),
    ]
}

proptest! {
    // Rank never decreases along an allowed transition.
    #[test]
    fn transitions_never_move_backwards(from in arb_state(), to in arb_state()) {
        if from.can_transition_to(to) {
            prop_assert!(!from.is_terminal());
            prop_assert!(!(to == JobState::Pending && from != JobState::Pending));
        }
    }

    // Terminal states admit no outgoing transition at all.
    #[test]
    fn terminal_states_are_sinks(from in arb_state(), to in arb_state()) {
        if from.is_terminal() {
            prop_assert!(!from.can_transition_to(to));
        }
    }
}
