// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job listing and per-job worker queries (logs, files, downloads),
//! plus process listing/description through the service workers.

use std::time::Duration;

use tracing::warn;

use qjazz_broker::Command;
use qjazz_core::{
    JobId, JobStatus, Link, ProcessDescription, ProcessFiles, ProcessLog, ProcessSummary,
    ProcessesError,
};

use crate::error::ExecutorError;
use crate::Executor;

impl Executor {
    /// List job statuses, newest registry scan order, with optional
    /// service and realm filters. `cursor`/`limit` paginate.
    pub async fn jobs(
        &self,
        service: Option<&str>,
        realm: Option<&str>,
        cursor: usize,
        limit: usize,
    ) -> Result<Vec<JobStatus>, ExecutorError> {
        // Collect matching keys first: the scan cursor is opaque, so
        // offset pagination works over the gathered key list
        let mut triples = Vec::new();
        let mut scan_cursor = 0;
        loop {
            let (next, page) =
                self.registry.find_keys(service, realm, scan_cursor, 100).await?;
            triples.extend(page);
            if next == 0 {
                break;
            }
            scan_cursor = next;
        }

        let mut statuses = Vec::new();
        for (job_id, _, _) in triples.into_iter().skip(cursor) {
            if statuses.len() >= limit {
                break;
            }
            // Resolve through the full record: much cheaper than
            // composing status first when the record is gone
            let info = match self.registry.find_job(&job_id, realm).await? {
                Some(info) => info,
                None => continue,
            };
            match self.resolve_status(&info, false).await {
                Ok(Some(status)) => statuses.push(status),
                Ok(None) => {}
                Err(err) => warn!("Skipping job {job_id} in listing: {err}"),
            }
        }
        Ok(statuses)
    }

    /// List processes for a service.
    ///
    /// Summaries are cached keyed by `(service, online_since)`, so a
    /// worker restart invalidates the entry on the next presence
    /// refresh.
    pub async fn processes(
        &self,
        service: &str,
        timeout: Duration,
    ) -> Result<Vec<ProcessSummary>, ExecutorError> {
        let cache_key = self
            .presence(service)
            .map(|presence| (service.to_string(), presence.online_since));
        if let Some(key) = &cache_key {
            if let Some(cached) = self.services.cached_processes(key) {
                return Ok(cached);
            }
        }

        let payload = self.command_one(service, Command::ListProcesses, timeout).await?;
        let processes: Vec<ProcessSummary> =
            serde_json::from_value(payload).map_err(qjazz_broker::BrokerError::Codec)?;

        if let Some(key) = cache_key {
            self.services.store_processes(key, processes.clone());
        }
        Ok(processes)
    }

    /// Cached process summary lookup.
    pub async fn process_summary(
        &self,
        service: &str,
        ident: &str,
        timeout: Duration,
    ) -> Result<Option<ProcessSummary>, ExecutorError> {
        let processes = self.processes(service, timeout).await?;
        Ok(processes.into_iter().find(|summary| summary.id == ident))
    }

    /// Full process description.
    pub async fn describe(
        &self,
        service: &str,
        ident: &str,
        project: Option<&str>,
        timeout: Duration,
    ) -> Result<Option<ProcessDescription>, ExecutorError> {
        let payload = self
            .command_one(
                service,
                Command::DescribeProcess {
                    ident: ident.to_string(),
                    project_path: project.map(str::to_string),
                },
                timeout,
            )
            .await?;
        if payload.is_null() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(payload).map_err(qjazz_broker::BrokerError::Codec)?))
    }

    /// Execution log of a job.
    pub async fn log_details(
        &self,
        job_id: &JobId,
        realm: Option<&str>,
        timeout: Duration,
    ) -> Result<Option<ProcessLog>, ExecutorError> {
        let info = match self.registry.find_job(job_id, realm).await? {
            Some(info) => info,
            None => return Ok(None),
        };
        let payload = self
            .command_one(&info.service, Command::JobLog { job_id: job_id.clone() }, timeout)
            .await?;
        check_error(&payload, "job_log")?;
        Ok(Some(serde_json::from_value(payload).map_err(qjazz_broker::BrokerError::Codec)?))
    }

    /// Files advertised by a job, with hrefs resolved against
    /// `public_url`.
    pub async fn files(
        &self,
        job_id: &JobId,
        public_url: Option<&str>,
        realm: Option<&str>,
        timeout: Duration,
    ) -> Result<Option<ProcessFiles>, ExecutorError> {
        let info = match self.registry.find_job(job_id, realm).await? {
            Some(info) => info,
            None => return Ok(None),
        };
        let payload = self
            .command_one(
                &info.service,
                Command::JobFiles {
                    job_id: job_id.clone(),
                    public_url: public_url.map(str::to_string),
                },
                timeout,
            )
            .await?;
        check_error(&payload, "job_files")?;
        Ok(Some(serde_json::from_value(payload).map_err(qjazz_broker::BrokerError::Codec)?))
    }

    /// A signed download link for one job resource.
    pub async fn download_url(
        &self,
        job_id: &JobId,
        resource: &str,
        expiration: u64,
        realm: Option<&str>,
        timeout: Duration,
    ) -> Result<Option<Link>, ExecutorError> {
        let info = match self.registry.find_job(job_id, realm).await? {
            Some(info) => info,
            None => return Ok(None),
        };
        let payload = self
            .command_one(
                &info.service,
                Command::DownloadUrl {
                    job_id: job_id.clone(),
                    resource: resource.to_string(),
                    expiration,
                },
                timeout,
            )
            .await?;
        if payload.is_null() {
            return Ok(None);
        }
        check_error(&payload, "download_url")?;
        Ok(Some(serde_json::from_value(payload).map_err(qjazz_broker::BrokerError::Codec)?))
    }
}

fn check_error(payload: &serde_json::Value, command: &str) -> Result<(), ExecutorError> {
    if let Some(message) = payload.get("error").and_then(serde_json::Value::as_str) {
        return Err(ProcessesError::Internal(format!("Command '{command}' failed: {message}"))
            .into());
    }
    Ok(())
}
