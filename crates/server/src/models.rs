// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Response envelopes and HTTP-side models.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use qjazz_core::{JobStatus, Link, ProcessSummary};

/// The error envelope for every non-2xx response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// An error response carrying the envelope.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, body: ErrorBody { message: message.into(), details: None } }
    }

    pub fn with_details(status: StatusCode, message: impl Into<String>, details: Value) -> Self {
        Self { status, body: ErrorBody { message: message.into(), details: Some(details) } }
    }

    pub fn not_found(message: impl Into<String>, details: Value) -> Self {
        Self::with_details(StatusCode::NOT_FOUND, message, details)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Map an executor failure onto the error taxonomy.
pub fn map_executor_error(err: qjazz_executor::ExecutorError) -> ApiError {
    use qjazz_core::ProcessesError;
    use qjazz_executor::ExecutorError;

    match err {
        ExecutorError::Processes(ProcessesError::ServiceNotAvailable(_)) => {
            ApiError::service_unavailable("Service not known")
        }
        ExecutorError::Processes(ProcessesError::UnreachableDestination(_)) => {
            ApiError::service_unavailable("Service is not available")
        }
        ExecutorError::Processes(ProcessesError::DismissedTaskError(job_id)) => {
            ApiError::with_details(
                StatusCode::FORBIDDEN,
                "Job dismissed",
                serde_json::json!({"jobId": job_id}),
            )
        }
        ExecutorError::Processes(ProcessesError::InputValueError(message)) => {
            ApiError::new(StatusCode::BAD_REQUEST, message)
        }
        ExecutorError::Processes(ProcessesError::ProjectRequired(process)) => {
            ApiError::new(StatusCode::BAD_REQUEST, format!("{process} requires a project"))
        }
        ExecutorError::Processes(ProcessesError::ProcessNotFound(process)) => {
            ApiError::not_found("Process not found", serde_json::json!({"processId": process}))
        }
        ExecutorError::Processes(ProcessesError::RunProcessException) => {
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal processing error")
        }
        ExecutorError::Timeout => {
            ApiError::new(StatusCode::GATEWAY_TIMEOUT, "Backend timeout")
        }
        ExecutorError::Registry(qjazz_registry::RegistryError::LockBusy(_)) => {
            ApiError::service_unavailable("Resource busy")
        }
        ExecutorError::Processes(ProcessesError::Internal(_))
        | ExecutorError::Broker(_)
        | ExecutorError::Registry(_) => {
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProcessList {
    pub processes: Vec<ProcessSummary>,
    pub links: Vec<Link>,
}

#[derive(Debug, Serialize)]
pub struct JobList {
    pub jobs: Vec<JobStatus>,
    pub links: Vec<Link>,
}

#[derive(Debug, Serialize)]
pub struct LogResponse {
    pub timestamp: u64,
    pub log: String,
    pub links: Vec<Link>,
}

/// A download link enriched with a human-readable size.
#[derive(Debug, Serialize)]
pub struct FileLink {
    #[serde(flatten)]
    pub link: Link,
    pub display_size: String,
}

impl From<Link> for FileLink {
    fn from(link: Link) -> Self {
        use humansize::{format_size, DECIMAL};
        let display_size = format_size(link.length.unwrap_or(0), DECIMAL);
        Self { link, display_size }
    }
}

#[derive(Debug, Serialize)]
pub struct FilesResponse {
    pub files: Vec<FileLink>,
    pub links: Vec<Link>,
}

#[cfg(test)]
#[path = "models_tests.rs"]
mod tests;
