// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dismiss protocol.
//!
//! Serialized by the distributed lock `lock:job:{job_id}` so multiple
//! gateway instances never race on the dismissed flag. The lock only
//! covers the check-and-mark step; the revoke RPC runs outside it with
//! its own deadline.

use std::time::Duration;

use tracing::{info, warn};

use qjazz_broker::{Command, TaskState};
use qjazz_core::{JobId, JobState, JobStatus, ProcessesError};
use qjazz_registry::TaskInfo;

use crate::error::ExecutorError;
use crate::Executor;

/// Dismissal timeouts. Lock acquisition and the revoke RPC are
/// bounded separately.
#[derive(Debug, Clone)]
pub struct DismissOptions {
    pub lock_timeout: Duration,
    pub revoke_timeout: Duration,
}

impl Default for DismissOptions {
    fn default() -> Self {
        Self { lock_timeout: Duration::from_secs(20), revoke_timeout: Duration::from_secs(20) }
    }
}

/// Coarse dismissal classification.
enum Coarse {
    /// Never reserved; the queued message expires on its own.
    Pending,
    /// Reserved or running; revokable.
    Active,
    /// Already finished (or pending window elapsed).
    Done,
}

impl Executor {
    /// Dismiss a job: cancel it when active, then drop its registry
    /// record so the owning worker reclaims the workdir on its next
    /// cleanup tick.
    ///
    /// `None` when no record matches `(job_id, realm)`. Dismissing an
    /// already-dismissed job fails with `DismissedTaskError`.
    pub async fn dismiss(
        &self,
        job_id: &JobId,
        realm: Option<&str>,
        options: DismissOptions,
    ) -> Result<Option<JobStatus>, ExecutorError> {
        let info = {
            let _guard = self
                .registry
                .lock(&format!("job:{job_id}"), options.lock_timeout, Duration::from_secs(60))
                .await?;

            let info = match self.registry.find_job(job_id, realm).await? {
                Some(info) => info,
                None => return Ok(None),
            };
            if info.dismissed {
                return Err(ProcessesError::DismissedTaskError(job_id.clone()).into());
            }

            // Destinations must exist up front: a dismissed record with
            // no worker to observe the deletion would leak its workdir
            self.require_destinations(&info.service)?;

            self.registry.dismiss(job_id, false).await?;
            info
        };

        match self.dismiss_marked(&info, &options).await {
            Ok(status) => Ok(Some(status)),
            Err(err) => {
                warn!("Failed to dismiss job {job_id}: {err}");
                // Roll back the mark so a later attempt may retry
                if let Err(reset_err) = self.registry.dismiss(job_id, true).await {
                    warn!("Failed to reset dismissed flag for {job_id}: {reset_err}");
                }
                Err(err)
            }
        }
    }

    /// Revoke (if needed) and delete the record of a job already
    /// marked dismissed.
    async fn dismiss_marked(
        &self,
        info: &TaskInfo,
        options: &DismissOptions,
    ) -> Result<JobStatus, ExecutorError> {
        let job_id = &info.job_id;
        let meta = self.backend.get_task_meta(job_id).await?;

        let coarse = match meta.status {
            TaskState::Pending => match self.query_task(job_id, &info.service).await? {
                Some(state) => match state {
                    qjazz_broker::QueryTaskState::Active
                    | qjazz_broker::QueryTaskState::Scheduled
                    | qjazz_broker::QueryTaskState::Reserved => Coarse::Active,
                    qjazz_broker::QueryTaskState::Revoked => Coarse::Done,
                },
                None => {
                    let now = crate::commands::epoch_now();
                    if info.pending_expired(now) {
                        Coarse::Done
                    } else {
                        Coarse::Pending
                    }
                }
            },
            TaskState::Started | TaskState::Updated => Coarse::Active,
            TaskState::Success | TaskState::Failure | TaskState::Revoked => Coarse::Done,
        };

        match coarse {
            Coarse::Active => {
                info!("{job_id}: revoking active job");
                self.command_broadcast(
                    &info.service,
                    Command::Revoke { job_id: job_id.clone() },
                    options.revoke_timeout,
                )
                .await?;

                let after = self.backend.get_task_meta(job_id).await?;
                if after.status != TaskState::Revoked && !after.status.is_terminal() {
                    warn!("{job_id}: task was revoked but still in {} state", after.status);
                }
            }
            Coarse::Pending => {
                // Cannot be purged individually; the queued message
                // dies of its own expiration
                info!("{job_id}: dismissing pending job");
            }
            Coarse::Done => {
                info!("{job_id}: dismissing finished job");
            }
        }

        self.registry.delete(job_id).await?;

        let mut status =
            JobStatus::new(job_id.clone(), info.process_id.clone(), JobState::Dismissed, info.created);
        status.message = "Task dismissed".to_string();
        status.tag = info.tag.clone();
        Ok(status)
    }
}
