// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy shared across component boundaries.
//!
//! Workers convert every domain failure into a FAILURE task state
//! carrying a stable [`ErrorCode`] marker; the executor pattern-matches
//! on the marker and the HTTP layer maps the taxonomy to a status code.
//! No other exception detail crosses the executor boundary.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::id::JobId;

/// Stable wire marker attached to FAILURE task results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCode {
    InputError,
    Dismissed,
    ProjectRequired,
    ProcessNotFound,
    ProcessingError,
    Internal,
}

crate::simple_display! {
    ErrorCode {
        InputError => "input-error",
        Dismissed => "dismissed",
        ProjectRequired => "project-required",
        ProcessNotFound => "process-not-found",
        ProcessingError => "processing-error",
        Internal => "internal",
    }
}

/// Domain errors surfaced at the executor/gateway boundary.
#[derive(Debug, Error)]
pub enum ProcessesError {
    /// No worker presence for the requested service.
    #[error("Service not known: {0}")]
    ServiceNotAvailable(String),

    /// No destination replied within the RPC deadline.
    #[error("Unreachable destination: {0}")]
    UnreachableDestination(String),

    /// The job was already dismissed.
    #[error("Task dismissed: {0}")]
    DismissedTaskError(JobId),

    /// Invalid execution input; message is surfaced verbatim to the client.
    #[error("{0}")]
    InputValueError(String),

    /// The process requires a project and none was supplied.
    #[error("Process requires a project: {0}")]
    ProjectRequired(String),

    #[error("Process not found: {0}")]
    ProcessNotFound(String),

    /// Algorithm failure. Details stay in the job log.
    #[error("Internal processing error")]
    RunProcessException,

    /// Anything unexpected inside a worker.
    #[error("Internal worker error")]
    Internal(String),
}

impl ProcessesError {
    /// The marker written into FAILURE results for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            ProcessesError::InputValueError(_) => ErrorCode::InputError,
            ProcessesError::DismissedTaskError(_) => ErrorCode::Dismissed,
            ProcessesError::ProjectRequired(_) => ErrorCode::ProjectRequired,
            ProcessesError::ProcessNotFound(_) => ErrorCode::ProcessNotFound,
            ProcessesError::RunProcessException => ErrorCode::ProcessingError,
            ProcessesError::ServiceNotAvailable(_)
            | ProcessesError::UnreachableDestination(_)
            | ProcessesError::Internal(_) => ErrorCode::Internal,
        }
    }

    /// Message reported to clients for a FAILURE result with this code.
    ///
    /// Input errors keep their original message; everything else is
    /// flattened to a generic message so worker internals never leak.
    pub fn client_message(code: ErrorCode, message: &str) -> String {
        match code {
            ErrorCode::InputError | ErrorCode::ProjectRequired | ErrorCode::ProcessNotFound => {
                message.to_string()
            }
            ErrorCode::Dismissed => "Dismissed task".to_string(),
            ErrorCode::ProcessingError => "Internal processing error".to_string(),
            ErrorCode::Internal => "Internal worker error".to_string(),
        }
    }
}

/// Payload stored in a FAILURE task result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureInfo {
    pub code: ErrorCode,
    #[serde(default)]
    pub message: String,
}

impl FailureInfo {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}

impl From<&ProcessesError> for FailureInfo {
    fn from(err: &ProcessesError) -> Self {
        Self { code: err.code(), message: err.to_string() }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
