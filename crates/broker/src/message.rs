// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task and control message shapes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use qjazz_core::{JobExecute, JobId, JobMeta};

/// Per-task run configuration supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Process identifier.
    pub ident: String,
    pub request: JobExecute,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_path: Option<String>,
}

/// Task kwargs: the meta envelope, the opaque caller context and the
/// run configuration. Field names are part of the broker contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskKwargs {
    #[serde(rename = "__meta__")]
    pub meta: JobMeta,
    #[serde(rename = "__context__", default)]
    pub context: Value,
    #[serde(rename = "__run_config__")]
    pub run_config: RunConfig,
}

/// A task message published on a service queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskMessage {
    /// Task id; doubles as the job id.
    pub id: JobId,
    /// Task name; always [`crate::PROCESS_EXECUTE`].
    pub task: String,
    pub kwargs: TaskKwargs,
    /// Priority band 0-9; higher is served first.
    #[serde(default)]
    pub priority: u8,
    /// Epoch seconds after which the message must not be executed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
    /// Epoch seconds before which the message must not be delivered
    /// (countdown for delayed execution).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_before: Option<u64>,
}

impl TaskMessage {
    /// Check if the message expired at `now` (epoch seconds).
    ///
    /// Expired messages are dropped by the consumer on dequeue; a
    /// revoked-but-unreserved message sits in the queue until this
    /// deadline since the broker cannot purge it individually.
    pub fn is_expired(&self, now: u64) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

/// Worker-side view of a task known to the consumer, reported in
/// answer to a `query_task` inspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryTaskState {
    /// Message received, not yet handed to the pool.
    Reserved,
    /// Delivery delayed by a countdown.
    Scheduled,
    /// Running on the pool.
    Active,
    Revoked,
}

qjazz_core::simple_display! {
    QueryTaskState {
        Reserved => "reserved",
        Scheduled => "scheduled",
        Active => "active",
        Revoked => "revoked",
    }
}

/// Inspect and control commands served by workers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Report the worker presence record.
    Presence,
    ListProcesses,
    DescribeProcess {
        ident: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        project_path: Option<String>,
    },
    JobLog {
        job_id: JobId,
    },
    JobFiles {
        job_id: JobId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        public_url: Option<String>,
    },
    DownloadUrl {
        job_id: JobId,
        resource: String,
        expiration: u64,
    },
    QueryTask {
        job_id: JobId,
    },
    /// Terminate a running job (SIGKILL on the runner process).
    Revoke {
        job_id: JobId,
    },
    Cleanup,
    ReloadProcessesCache,
    RestartPool,
    Ping,
    Shutdown,
}

/// A control request published to a service control channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlRequest {
    /// Correlation id.
    pub id: String,
    #[serde(flatten)]
    pub command: Command,
    /// Target worker hostnames; `None` addresses every worker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<Vec<String>>,
    /// Reply queue; replies pushed after the deadline are discarded
    /// with the queue itself.
    pub reply_to: String,
    /// Reply deadline, epoch seconds.
    pub expires_at: u64,
}

impl ControlRequest {
    /// Check whether this request addresses the given worker.
    pub fn addresses(&self, hostname: &str) -> bool {
        match &self.destination {
            None => true,
            Some(dests) => dests.iter().any(|d| d == hostname),
        }
    }
}

/// A single worker's reply to a control request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlReply {
    /// Replying worker hostname.
    pub destination: String,
    /// Command-specific payload; `{"error": msg}` on handler failure.
    pub payload: Value,
}

impl ControlReply {
    pub fn new(destination: impl Into<String>, payload: Value) -> Self {
        Self { destination: destination.into(), payload }
    }

    /// Extract the error message, if the payload is an error envelope.
    pub fn error(&self) -> Option<&str> {
        self.payload.get("error").and_then(Value::as_str)
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
