// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic reclamation of expired job directories.
//!
//! A directory is reclaimable when it still carries the
//! `.job-expire-{service}` sentinel but the registry has no record
//! left for the job (TTL expired, or deleted by a dismiss). The pass
//! is serialized across worker instances by a non-blocking distributed
//! lock: whoever loses the race skips the tick.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use qjazz_core::JobId;
use qjazz_registry::{Registry, RegistryError};

use crate::context::expire_sentinel;
use crate::storage::Storage;

/// Lease on the cleanup lock; a pass must finish well within it.
const CLEANUP_LEASE: Duration = Duration::from_secs(60);

/// Run one cleanup pass over `workdir`.
///
/// Errors on individual directories are logged and the directory is
/// retried on the next tick.
pub async fn cleanup_expired_jobs(
    registry: &Arc<dyn Registry>,
    storage: &Arc<dyn Storage>,
    workdir: &Path,
    service: &str,
) {
    let guard = match registry
        .lock(&format!("{service}:cleanup-batch"), Duration::ZERO, CLEANUP_LEASE)
        .await
    {
        Ok(guard) => guard,
        Err(RegistryError::LockBusy(_)) => {
            debug!("Cleanup already running elsewhere, skipping");
            return;
        }
        Err(err) => {
            error!("Cleanup lock failed: {err}");
            return;
        }
    };

    debug!("Running cleanup task");
    let sentinel = expire_sentinel(service);

    let entries = match std::fs::read_dir(workdir) {
        Ok(entries) => entries,
        Err(err) => {
            error!("Cannot scan workdir {}: {err}", workdir.display());
            return;
        }
    };

    for entry in entries.flatten() {
        let job_dir = entry.path();
        if !job_dir.is_dir() || !job_dir.join(&sentinel).exists() {
            continue;
        }
        let job_id = match entry.file_name().into_string() {
            Ok(name) => JobId::new(name),
            Err(_) => continue,
        };

        match registry.exists(&job_id).await {
            Ok(true) => continue, // still live
            Ok(false) => {}
            Err(err) => {
                error!("Registry lookup failed for {job_id}: {err}");
                continue;
            }
        }

        info!("=== Cleaning job resources: {job_id}");
        if let Err(err) = storage.remove(&job_id, workdir) {
            error!("Failed to remove stored artifacts of {job_id}: {err}");
        }
        if let Err(err) = std::fs::remove_dir_all(&job_dir) {
            error!("Failed to remove directory {}: {err}", job_dir.display());
        }
    }

    drop(guard);
}

#[cfg(test)]
#[path = "cleanup_tests.rs"]
mod tests;
