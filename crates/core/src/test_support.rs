// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixture helpers shared by other crates' tests.

use serde_json::json;

use crate::job::{JobMeta, JobState, JobStatus};
use crate::models::WorkerPresence;
use crate::process::ProcessSummary;
use crate::JobId;

/// A pending job status with test defaults.
pub fn pending_status(job_id: &str, process_id: &str) -> JobStatus {
    JobStatus::new(JobId::new(job_id), process_id, JobState::Pending, 1_000_000)
}

/// A meta envelope with test defaults.
pub fn meta(service: &str, process_id: &str) -> JobMeta {
    JobMeta {
        created: 1_000_000,
        realm: None,
        service: service.to_string(),
        process_id: process_id.to_string(),
        expires: 86_400,
        tag: None,
    }
}

/// A worker presence record with test defaults.
pub fn presence(service: &str) -> WorkerPresence {
    WorkerPresence {
        service: service.to_string(),
        title: format!("{service} service"),
        description: String::new(),
        links: Vec::new(),
        online_since: 1_000_000,
        versions: Vec::new(),
        result_expires: 86_400,
        callbacks: Vec::new(),
        entrypoint: None,
    }
}

/// A process summary allowing every control option.
pub fn summary(id: &str) -> ProcessSummary {
    serde_json::from_value(json!({
        "id": id,
        "title": id,
        "jobControlOptions": ["sync-execute", "async-execute", "dismiss"],
    }))
    .unwrap_or_else(|_| unreachable!("static fixture"))
}
