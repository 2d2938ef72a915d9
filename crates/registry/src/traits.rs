// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The registry seam.

use std::time::Duration;

use async_trait::async_trait;

use qjazz_core::{JobId, JobStatus};

use crate::lock::LockGuard;

/// Errors from the registry substrate.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Registry I/O error: {0}")]
    Io(String),

    #[error("Corrupt registry record for {0}")]
    Corrupt(JobId),

    /// The lock could not be acquired within the deadline.
    #[error("Lock busy: {0}")]
    LockBusy(String),
}

impl From<::redis::RedisError> for RegistryError {
    fn from(err: ::redis::RedisError) -> Self {
        RegistryError::Io(err.to_string())
    }
}

/// One registry record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInfo {
    pub job_id: JobId,
    /// Epoch seconds at enqueue.
    pub created: u64,
    pub service: String,
    pub realm: Option<String>,
    pub process_id: String,
    /// Mutable by the executor only.
    pub dismissed: bool,
    /// Seconds the pending-state record remains valid.
    pub pending_timeout: u64,
    pub tag: Option<String>,
}

impl TaskInfo {
    /// Check whether a still-pending job has outlived its window.
    pub fn pending_expired(&self, now: u64) -> bool {
        now >= self.created + self.pending_timeout
    }
}

/// Authoritative index `job_id → {service, realm, process, ...}` with TTL.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Insert a record for a freshly-enqueued job. The record expires
    /// `expires` seconds after registration, together with the result.
    async fn register(
        &self,
        service: &str,
        realm: Option<&str>,
        status: &JobStatus,
        expires: u64,
        pending_timeout: u64,
    ) -> Result<(), RegistryError>;

    /// Find a record by job id, optionally restricted to a realm.
    /// Absence under a realm filter means "no access", reported the
    /// same as "not found".
    async fn find_job(
        &self,
        job_id: &JobId,
        realm: Option<&str>,
    ) -> Result<Option<TaskInfo>, RegistryError>;

    /// Scan record keys with optional service and realm filters.
    /// Returns the next cursor (0 when exhausted) and the matching
    /// `(job_id, service, realm)` triples.
    async fn find_keys(
        &self,
        service: Option<&str>,
        realm: Option<&str>,
        cursor: u64,
        count: usize,
    ) -> Result<(u64, Vec<(JobId, String, String)>), RegistryError>;

    /// Flip the dismissed flag. Returns false when no record exists.
    async fn dismiss(&self, job_id: &JobId, reset: bool) -> Result<bool, RegistryError>;

    async fn exists(&self, job_id: &JobId) -> Result<bool, RegistryError>;

    /// Remove the record, returning it.
    async fn delete(&self, job_id: &JobId) -> Result<Option<TaskInfo>, RegistryError>;

    /// Acquire a named distributed mutex.
    ///
    /// `acquire` bounds the wait (zero means try-once); `lease` bounds
    /// how long the lock is held before the store reclaims it.
    async fn lock(
        &self,
        name: &str,
        acquire: Duration,
        lease: Duration,
    ) -> Result<LockGuard, RegistryError>;
}
