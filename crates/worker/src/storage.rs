// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Storage handlers for job artifacts.
//!
//! Instantiated once at boot from a tagged configuration and held as
//! an immutable reference by the worker; a handler never calls back
//! into worker state.

use std::path::{Path, PathBuf};

use qjazz_core::{JobId, Link};

use crate::WorkerError;

/// Where published job files end up and how they are served back.
pub trait Storage: Send + Sync {
    /// Move produced files to their final location. Called once after
    /// a successful run, before `links.json` is written.
    fn move_files(
        &self,
        job_id: &JobId,
        workdir: &Path,
        files: &[PathBuf],
    ) -> Result<(), WorkerError>;

    /// A download reference for one stored resource, valid for
    /// `expires` seconds.
    fn download_url(
        &self,
        job_id: &JobId,
        resource: &str,
        workdir: &Path,
        expires: u64,
    ) -> Result<Option<Link>, WorkerError>;

    /// Remove stored artifacts of a job (cleanup pass).
    fn remove(&self, _job_id: &JobId, _workdir: &Path) -> Result<(), WorkerError> {
        Ok(())
    }

    /// Called before each runner spawn so resources that do not
    /// survive a fork can be dropped first.
    fn before_create_process(&self) {}
}

/// Local filesystem storage: the workdir is the storage.
#[derive(Default)]
pub struct LocalStorage;

impl Storage for LocalStorage {
    fn move_files(
        &self,
        _job_id: &JobId,
        _workdir: &Path,
        _files: &[PathBuf],
    ) -> Result<(), WorkerError> {
        // Files already live in the job directory
        Ok(())
    }

    fn download_url(
        &self,
        job_id: &JobId,
        resource: &str,
        workdir: &Path,
        _expires: u64,
    ) -> Result<Option<Link>, WorkerError> {
        let job_dir = crate::context::job_dir(workdir, job_id);
        let path = job_dir.join(resource);

        // Resolved path must stay under the job directory
        let canonical = match path.canonicalize() {
            Ok(canonical) => canonical,
            Err(_) => return Ok(None),
        };
        let root = job_dir.canonicalize()?;
        if !canonical.starts_with(&root) || !canonical.is_file() {
            return Ok(None);
        }

        let size = canonical.metadata()?.len();
        let mime = mime_guess::from_path(&canonical).first_raw();

        let mut link = Link::new(format!("file://{}", canonical.display()))
            .title(resource)
            .length(size);
        link.mime_type = Some(mime.unwrap_or("application/octet-stream").to_string());
        Ok(Some(link))
    }
}

#[cfg(test)]
#[path = "storage_tests.rs"]
mod tests;
