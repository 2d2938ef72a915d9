// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::storage::LocalStorage;
use qjazz_core::test_support::pending_status;
use qjazz_registry::memory::MemoryRegistry;

fn job_dir_with_sentinel(workdir: &Path, job_id: &str, service: &str) -> std::path::PathBuf {
    let dir = workdir.join(job_id);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(expire_sentinel(service)), b"").unwrap();
    dir
}

#[tokio::test]
async fn expired_directories_are_removed() {
    let tmp = tempfile::tempdir().unwrap();
    let registry: Arc<dyn Registry> = Arc::new(MemoryRegistry::new());
    let storage: Arc<dyn Storage> = Arc::new(LocalStorage);

    let dead = job_dir_with_sentinel(tmp.path(), "job-dead", "demo");
    cleanup_expired_jobs(&registry, &storage, tmp.path(), "demo").await;
    assert!(!dead.exists());
}

#[tokio::test]
async fn live_directories_survive() {
    let tmp = tempfile::tempdir().unwrap();
    let memory = Arc::new(MemoryRegistry::new());
    memory.register("demo", None, &pending_status("job-live", "echo"), 3600, 600).await.unwrap();
    let registry: Arc<dyn Registry> = memory;
    let storage: Arc<dyn Storage> = Arc::new(LocalStorage);

    let live = job_dir_with_sentinel(tmp.path(), "job-live", "demo");
    cleanup_expired_jobs(&registry, &storage, tmp.path(), "demo").await;
    assert!(live.exists());
}

#[tokio::test]
async fn foreign_sentinels_are_ignored() {
    let tmp = tempfile::tempdir().unwrap();
    let registry: Arc<dyn Registry> = Arc::new(MemoryRegistry::new());
    let storage: Arc<dyn Storage> = Arc::new(LocalStorage);

    // Sentinel belongs to another service's worker
    let other = job_dir_with_sentinel(tmp.path(), "job-other", "elsewhere");
    cleanup_expired_jobs(&registry, &storage, tmp.path(), "demo").await;
    assert!(other.exists());
}

#[tokio::test]
async fn contended_lock_skips_the_tick() {
    let tmp = tempfile::tempdir().unwrap();
    let registry: Arc<dyn Registry> = Arc::new(MemoryRegistry::new());
    let storage: Arc<dyn Storage> = Arc::new(LocalStorage);

    let _held = registry
        .lock("demo:cleanup-batch", Duration::ZERO, Duration::from_secs(60))
        .await
        .unwrap();

    let dead = job_dir_with_sentinel(tmp.path(), "job-dead", "demo");
    cleanup_expired_jobs(&registry, &storage, tmp.path(), "demo").await;
    // Nothing removed: another worker holds the batch lock
    assert!(dead.exists());
}
