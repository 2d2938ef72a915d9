// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Result-store task states.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message::TaskKwargs;

/// State of a task as recorded in the result store.
///
/// `Updated` is our extension to the usual task-state set: the worker
/// publishes it with a `{progress, message, updated}` result while the
/// job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskState {
    Pending,
    Started,
    Updated,
    Success,
    Failure,
    Revoked,
}

qjazz_core::simple_display! {
    TaskState {
        Pending => "PENDING",
        Started => "STARTED",
        Updated => "UPDATED",
        Success => "SUCCESS",
        Failure => "FAILURE",
        Revoked => "REVOKED",
    }
}

impl TaskState {
    /// Check if this state is final.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Success | TaskState::Failure | TaskState::Revoked)
    }
}

/// Stored metadata for one task.
///
/// An unknown task id reads back as `Pending` with an empty result;
/// the registry record is what distinguishes "queued" from "never
/// existed" (clients must treat a missing registry record as not
/// found regardless of result-store contents).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskMeta {
    pub status: TaskState,
    #[serde(default)]
    pub result: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kwargs: Option<TaskKwargs>,
    /// Epoch seconds at completion; set only for terminal states.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_done: Option<u64>,
}

impl TaskMeta {
    /// The default meta for an unknown task id.
    pub fn pending() -> Self {
        Self { status: TaskState::Pending, result: Value::Null, kwargs: None, date_done: None }
    }
}

/// Progress payload carried by `Updated` states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(default)]
    pub message: String,
    /// Epoch seconds of the update.
    pub updated: u64,
}

#[cfg(test)]
#[path = "result_tests.rs"]
mod tests;
