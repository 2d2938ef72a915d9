// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execute requests.

use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use qjazz_broker::{RunConfig, TaskKwargs, TaskMessage, TaskState};
use qjazz_core::{
    ErrorCode, FailureInfo, JobExecute, JobId, JobMeta, JobResults, JobState, JobStatus,
    ProcessesError,
};

use crate::error::ExecutorError;
use crate::Executor;

/// Caller-tunable execute parameters.
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    pub project: Option<String>,
    /// Opaque caller context forwarded to the worker (`public_url`,
    /// store credentials, ...).
    pub context: Value,
    pub realm: Option<String>,
    /// Seconds the task may wait unreserved on the queue.
    pub pending_timeout: Option<u64>,
    pub tag: Option<String>,
    /// Delay execution by this many seconds.
    pub countdown: Option<u64>,
    /// Priority band 0-9.
    pub priority: u8,
}

impl ExecuteOptions {
    qjazz_core::setters! {
        set {
            priority: u8,
        }
        option {
            project: String,
            realm: String,
            pending_timeout: u64,
            tag: String,
            countdown: u64,
        }
    }
}

/// Handle on an enqueued job.
pub struct JobHandle {
    pub job_id: JobId,
    initial: JobStatus,
    executor: Executor,
}

impl std::fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobHandle")
            .field("job_id", &self.job_id)
            .field("initial", &self.initial)
            .finish_non_exhaustive()
    }
}

impl JobHandle {
    /// Latest composed status; falls back to the enqueue-time pending
    /// status when composition yields nothing (races at enqueue).
    pub async fn status(&self) -> Result<JobStatus, ExecutorError> {
        let status = self.executor.job_status(&self.job_id, None, false).await?;
        Ok(status.unwrap_or_else(|| self.initial.clone()))
    }

    /// Block until the job reaches a terminal state, polling the
    /// result store. `Timeout` when `timeout` elapses first.
    pub async fn wait_result(&self, timeout: Duration) -> Result<JobResults, ExecutorError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let meta = self.executor.backend.get_task_meta(&self.job_id).await?;
            match meta.status {
                TaskState::Success => {
                    let results: JobResults = match meta.result {
                        Value::Object(map) => map,
                        _ => JobResults::new(),
                    };
                    return Ok(results);
                }
                TaskState::Failure => {
                    let info: FailureInfo = serde_json::from_value(meta.result)
                        .unwrap_or_else(|_| FailureInfo::new(ErrorCode::Internal, ""));
                    return Err(failure_error(info).into());
                }
                TaskState::Revoked => {
                    return Err(
                        ProcessesError::DismissedTaskError(self.job_id.clone()).into()
                    );
                }
                _ => {}
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(ExecutorError::Timeout);
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}

/// Map a FAILURE marker back onto the error taxonomy.
pub(crate) fn failure_error(info: FailureInfo) -> ProcessesError {
    match info.code {
        ErrorCode::InputError => ProcessesError::InputValueError(info.message),
        ErrorCode::Dismissed => ProcessesError::DismissedTaskError(JobId::new(info.message)),
        ErrorCode::ProjectRequired => ProcessesError::ProjectRequired(info.message),
        ErrorCode::ProcessNotFound => ProcessesError::ProcessNotFound(info.message),
        ErrorCode::ProcessingError => ProcessesError::RunProcessException,
        ErrorCode::Internal => ProcessesError::Internal(info.message),
    }
}

impl Executor {
    /// Enqueue an execute request and register the pending job.
    pub async fn execute(
        &self,
        service: &str,
        ident: &str,
        request: JobExecute,
        options: ExecuteOptions,
    ) -> Result<JobHandle, ExecutorError> {
        let presence = self
            .presence(service)
            .ok_or_else(|| ProcessesError::ServiceNotAvailable(service.to_string()))?;

        // Result expiration is bounded by what the service advertises
        let expires = presence.result_expires.min(self.options.result_expires);

        // Pending timeout must not outlive the result expiration
        let pending_timeout = options
            .pending_timeout
            .unwrap_or(self.options.message_expiration_timeout)
            .min(expires);

        let created = crate::commands::epoch_now();
        let job_id = JobId::generate();

        let meta = JobMeta {
            created,
            realm: options.realm.clone(),
            service: service.to_string(),
            process_id: ident.to_string(),
            expires,
            tag: options.tag.clone(),
        };

        // A countdown extends the pending window by the delay itself
        let not_before = options.countdown.map(|delay| created + delay);
        let expires_at = created + pending_timeout + options.countdown.unwrap_or(0);

        let message = TaskMessage {
            id: job_id.clone(),
            task: qjazz_broker::PROCESS_EXECUTE.to_string(),
            kwargs: TaskKwargs {
                meta,
                context: options.context.clone(),
                run_config: RunConfig {
                    ident: ident.to_string(),
                    request,
                    project_path: options.project.clone(),
                },
            },
            priority: options.priority.min(9),
            expires_at: Some(expires_at),
            not_before,
        };

        debug!("Enqueueing {job_id} on qjazz.{service} (process {ident})");
        self.broker.send_task(service, message).await?;

        let mut status = JobStatus::new(job_id.clone(), ident, JobState::Pending, created);
        status.tag = options.tag;

        self.registry
            .register(
                service,
                options.realm.as_deref(),
                &status,
                expires,
                pending_timeout + options.countdown.unwrap_or(0),
            )
            .await?;

        Ok(JobHandle { job_id, initial: status, executor: self.clone() })
    }
}
