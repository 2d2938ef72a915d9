// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job status model and state machine.

use crate::id::JobId;
use crate::models::Link;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle state of a job.
///
/// Conforms to the OGC statusInfo state set, plus `pending`: the task
/// has been enqueued but no worker has reserved it yet.
///
/// States are ordered by the partial order
/// `pending → accepted → running → {successful | failed | dismissed}`;
/// `dismissed` is reachable from any non-terminal state. A job never
/// moves backwards and never leaves a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Accepted,
    Running,
    Successful,
    Failed,
    Dismissed,
}

crate::simple_display! {
    JobState {
        Pending => "pending",
        Accepted => "accepted",
        Running => "running",
        Successful => "successful",
        Failed => "failed",
        Dismissed => "dismissed",
    }
}

impl JobState {
    /// Check if this state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Successful | JobState::Failed | JobState::Dismissed)
    }

    /// Position in the lifecycle partial order.
    fn rank(&self) -> u8 {
        match self {
            JobState::Pending => 0,
            JobState::Accepted => 1,
            JobState::Running => 2,
            JobState::Successful | JobState::Failed | JobState::Dismissed => 3,
        }
    }

    /// Check whether a transition to `next` respects the partial order.
    ///
    /// Intermediate states may be skipped (a fast job can be observed
    /// going straight from `pending` to `successful`), but the rank
    /// never decreases and terminal states have no outgoing edges.
    pub fn can_transition_to(&self, next: JobState) -> bool {
        !self.is_terminal() && next != *self && next.rank() >= self.rank()
    }

    /// Parse a state from its wire name.
    pub fn parse(s: &str) -> Option<JobState> {
        match s {
            "pending" => Some(JobState::Pending),
            "accepted" => Some(JobState::Accepted),
            "running" => Some(JobState::Running),
            "successful" => Some(JobState::Successful),
            "failed" => Some(JobState::Failed),
            "dismissed" => Some(JobState::Dismissed),
            _ => None,
        }
    }
}

/// Structured error attached to a failed job (OGC exception shape).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobException {
    #[serde(rename = "type")]
    pub exception_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Status of one job as reported to clients.
///
/// Timestamps are integer epoch seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    pub job_id: JobId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_id: Option<String>,
    /// Job type discriminator, always "process".
    #[serde(rename = "type", default = "default_job_type")]
    pub job_type: String,
    pub status: JobState,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    pub created: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<u64>,
    /// Completion ratio in percent, non-decreasing within a run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<JobException>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_config: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

fn default_job_type() -> String {
    "process".to_string()
}

impl JobStatus {
    /// Create a minimal status in the given state.
    pub fn new(job_id: JobId, process_id: impl Into<String>, status: JobState, created: u64) -> Self {
        Self {
            job_id,
            process_id: Some(process_id.into()),
            job_type: default_job_type(),
            status,
            message: String::new(),
            created,
            started: None,
            finished: None,
            updated: None,
            progress: None,
            exception: None,
            links: Vec::new(),
            run_config: None,
            expires_at: None,
            tag: None,
        }
    }

    crate::setters! {
        into {
            message: String,
        }
        set {
            progress: Option<u8>,
        }
        option {
            tag: String,
        }
    }
}

/// Immutable meta envelope attached to every task.
///
/// Built by the executor at enqueue time, preserved by the worker and
/// echoed back in result metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMeta {
    /// Epoch seconds at enqueue.
    pub created: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realm: Option<String>,
    pub service: String,
    pub process_id: String,
    /// Result expiration delay in seconds.
    pub expires: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
