// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job status composition.
//!
//! A reported status combines three sources: the registry record
//! (existence, realm access, pending window), the result-store task
//! meta, and, while the store still says PENDING, a `query_task`
//! inspect that asks the service workers whether the message has been
//! reserved, scheduled or revoked.

use serde_json::Value;
use tracing::{trace, warn};

use qjazz_broker::{Command, ProgressUpdate, QueryTaskState, TaskKwargs, TaskMeta, TaskState};
use qjazz_core::{ErrorCode, FailureInfo, JobId, JobResults, JobState, JobStatus};
use qjazz_registry::TaskInfo;

use crate::error::ExecutorError;
use crate::Executor;

/// Status derived from the result-store meta alone (registry record
/// already resolved). `None` means the store has no trace of the job.
pub(crate) fn from_task_meta(
    job_id: &JobId,
    meta: &TaskMeta,
    query: Option<QueryTaskState>,
    info: &TaskInfo,
    now: u64,
) -> Option<JobStatus> {
    let kwargs = meta.kwargs.as_ref();
    let created = kwargs.map_or(info.created, |k| k.meta.created);
    let process_id =
        kwargs.map_or_else(|| info.process_id.clone(), |k| k.meta.process_id.clone());
    let tag = kwargs.map_or_else(|| info.tag.clone(), |k| k.meta.tag.clone());

    let mut status = JobStatus::new(job_id.clone(), process_id, JobState::Pending, created);
    status.tag = tag;

    match meta.status {
        TaskState::Pending => match query {
            Some(QueryTaskState::Active) => {
                status.status = JobState::Running;
            }
            Some(QueryTaskState::Scheduled | QueryTaskState::Reserved) => {
                status.status = JobState::Accepted;
            }
            Some(QueryTaskState::Revoked) => {
                status.status = JobState::Dismissed;
                status.message = "Task dismissed".to_string();
            }
            None => {
                // Not seen by any worker: still pending inside its
                // window, gone after it
                if info.dismissed || info.pending_expired(now) {
                    return None;
                }
                status.status = JobState::Pending;
            }
        },
        TaskState::Started => {
            status.status = JobState::Running;
            status.message = "Task started".to_string();
            status.started = meta.result.get("started").and_then(Value::as_u64);
        }
        TaskState::Updated => {
            status.status = JobState::Running;
            if let Ok(update) = serde_json::from_value::<ProgressUpdate>(meta.result.clone()) {
                status.progress = update.progress;
                status.message = update.message;
                status.updated = Some(update.updated);
            }
        }
        TaskState::Success => {
            status.status = JobState::Successful;
            status.message = "Task finished".to_string();
            status.progress = Some(100);
            status.finished = meta.date_done;
        }
        TaskState::Failure => {
            let info: FailureInfo = serde_json::from_value(meta.result.clone())
                .unwrap_or_else(|_| FailureInfo::new(ErrorCode::Internal, ""));
            status.status = match info.code {
                ErrorCode::Dismissed => JobState::Dismissed,
                _ => JobState::Failed,
            };
            status.message =
                qjazz_core::ProcessesError::client_message(info.code, &info.message);
            status.progress = Some(100);
            status.finished = meta.date_done;
        }
        TaskState::Revoked => {
            status.status = JobState::Dismissed;
            status.message = "Task dismissed".to_string();
            status.finished = meta.date_done;
        }
    }

    Some(status)
}

/// Fill in `run_config` and `expires_at` extended details.
fn with_details(mut status: JobStatus, kwargs: Option<&TaskKwargs>, expires: u64) -> JobStatus {
    if let Some(kwargs) = kwargs {
        status.run_config = serde_json::to_value(&kwargs.run_config).ok();
    }
    if let Some(finished) = status.finished {
        status.expires_at = Some(finished + expires);
    }
    status
}

impl Executor {
    /// Compose the status of a job, restricted to a realm.
    ///
    /// `None` means not found, which covers jobs filed under another
    /// realm and pending records that outlived their window.
    pub async fn job_status(
        &self,
        job_id: &JobId,
        realm: Option<&str>,
        details: bool,
    ) -> Result<Option<JobStatus>, ExecutorError> {
        let info = match self.registry.find_job(job_id, realm).await? {
            Some(info) => info,
            None => return Ok(None),
        };
        self.resolve_status(&info, details).await
    }

    /// Compose a status from an already-loaded registry record.
    pub(crate) async fn resolve_status(
        &self,
        info: &TaskInfo,
        details: bool,
    ) -> Result<Option<JobStatus>, ExecutorError> {
        let meta = self.backend.get_task_meta(&info.job_id).await?;
        trace!("=Job status {}: {:?}", info.job_id, meta.status);

        let query = if meta.status == TaskState::Pending {
            self.query_task(&info.job_id, &info.service).await?
        } else {
            None
        };

        let now = crate::commands::epoch_now();
        let status = from_task_meta(&info.job_id, &meta, query, info, now);
        Ok(status.map(|status| {
            if details {
                with_details(status, meta.kwargs.as_ref(), expires_of(&meta, self))
            } else {
                status
            }
        }))
    }

    /// Ask the service workers whether they know the task.
    pub(crate) async fn query_task(
        &self,
        job_id: &JobId,
        service: &str,
    ) -> Result<Option<QueryTaskState>, ExecutorError> {
        // A service with no presence cannot have reserved anything
        if self.services.destinations(service).is_none_or(|dests| dests.is_empty()) {
            return Ok(None);
        }

        let replies = match self
            .command_broadcast(
                service,
                Command::QueryTask { job_id: job_id.clone() },
                self.options.command_timeout,
            )
            .await
        {
            Ok(replies) => replies,
            Err(err) if err.is_unavailable() => return Ok(None),
            Err(err) => return Err(err),
        };

        for reply in replies {
            if let Some(error) = reply.error() {
                warn!("query_task failed on {}: {error}", reply.destination);
                continue;
            }
            if let Some(state) = reply.payload.get("state") {
                if let Ok(state) = serde_json::from_value::<QueryTaskState>(state.clone()) {
                    return Ok(Some(state));
                }
            }
        }
        Ok(None)
    }

    /// Return job results when the job succeeded, `None` otherwise.
    pub async fn job_results(
        &self,
        job_id: &JobId,
        realm: Option<&str>,
    ) -> Result<Option<JobResults>, ExecutorError> {
        if self.registry.find_job(job_id, realm).await?.is_none() {
            return Ok(None);
        }
        let meta = self.backend.get_task_meta(job_id).await?;
        if meta.status != TaskState::Success {
            return Ok(None);
        }
        match meta.result {
            Value::Object(map) => Ok(Some(map)),
            _ => Ok(Some(JobResults::new())),
        }
    }
}

fn expires_of(meta: &TaskMeta, executor: &Executor) -> u64 {
    meta.kwargs
        .as_ref()
        .map(|kwargs| kwargs.meta.expires)
        .unwrap_or(executor.options.result_expires)
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
