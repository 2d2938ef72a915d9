// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-job execution context and workdir layout.
//!
//! Each job owns `{workdir}/{job_id}` containing:
//! - `processing.log`: captured execution log
//! - `.files`: paths advertised as published outputs
//! - `links.json`: resolved download links, written after storage move
//! - `.job-expire-{service}`: cleanup sentinel, created before any
//!   long work so a crashed job's directory stays reclaimable

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use qjazz_core::JobId;

pub const PROCESSING_LOG: &str = "processing.log";
pub const FILES_LIST: &str = ".files";
pub const FILE_LINKS: &str = "links.json";

/// Cleanup sentinel file name for a service.
pub fn expire_sentinel(service: &str) -> String {
    format!(".job-expire-{service}")
}

/// Execution context handed to a job function.
#[derive(Clone)]
pub struct JobContext {
    pub job_id: JobId,
    pub service: String,
    /// The job's private working directory.
    pub job_dir: PathBuf,
    /// External base URL for building download references.
    pub public_url: Option<String>,
    published: Arc<Mutex<Vec<PathBuf>>>,
}

impl JobContext {
    pub fn new(job_id: JobId, service: &str, job_dir: PathBuf, public_url: Option<String>) -> Self {
        Self {
            job_id,
            service: service.to_string(),
            job_dir,
            public_url,
            published: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Advertise a produced file as a downloadable output.
    pub fn publish(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        let absolute = if path.is_absolute() { path } else { self.job_dir.join(path) };
        self.published.lock().push(absolute);
    }

    pub fn published_files(&self) -> Vec<PathBuf> {
        self.published.lock().clone()
    }

    pub fn log_path(&self) -> PathBuf {
        self.job_dir.join(PROCESSING_LOG)
    }

    /// Persist the published-files list as `.files`.
    pub fn write_files_list(&self) -> std::io::Result<()> {
        let lines: Vec<String> = self
            .published_files()
            .iter()
            .map(|path| path.display().to_string())
            .collect();
        std::fs::write(self.job_dir.join(FILES_LIST), lines.join("\n"))
    }

    /// Append a line to the processing log. Log failures are not
    /// allowed to fail the job.
    pub fn log_line(&self, line: &str) {
        use std::io::Write;
        if let Ok(mut file) =
            std::fs::OpenOptions::new().create(true).append(true).open(self.log_path())
        {
            let _ = writeln!(file, "{line}");
        }
    }
}

/// The working directory of a job under a worker root.
pub fn job_dir(workdir: &Path, job_id: &JobId) -> PathBuf {
    workdir.join(job_id.as_str())
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
