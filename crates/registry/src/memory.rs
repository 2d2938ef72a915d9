// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory registry for tests, with clock-driven TTL and in-process
//! locks mirroring the Redis lease semantics.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use qjazz_core::{JobId, JobStatus};

use crate::keys::{job_key, JobKey};
use crate::lock::LockGuard;
use crate::traits::{Registry, RegistryError, TaskInfo};

type NowFn = Arc<dyn Fn() -> u64 + Send + Sync>;

fn system_now() -> NowFn {
    Arc::new(|| {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    })
}

#[derive(Default)]
struct RegistryState {
    /// raw key → (record, expires_at epoch seconds)
    records: HashMap<String, (TaskInfo, u64)>,
    /// held lock names
    locks: HashSet<String>,
}

impl RegistryState {
    fn prune(&mut self, now: u64) {
        self.records.retain(|_, (_, expires_at)| now < *expires_at);
    }
}

/// In-memory [`Registry`].
#[derive(Clone)]
pub struct MemoryRegistry {
    state: Arc<Mutex<RegistryState>>,
    now: NowFn,
}

impl Default for MemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self { state: Arc::new(Mutex::new(RegistryState::default())), now: system_now() }
    }

    /// Use an injected time source (epoch seconds).
    pub fn with_now(now: impl Fn() -> u64 + Send + Sync + 'static) -> Self {
        Self { state: Arc::new(Mutex::new(RegistryState::default())), now: Arc::new(now) }
    }

    fn find_raw(&self, job_id: &JobId) -> Option<(String, TaskInfo)> {
        let now = (self.now)();
        let mut state = self.state.lock();
        state.prune(now);
        state
            .records
            .iter()
            .find(|(key, _)| {
                JobKey::parse(key).is_some_and(|parsed| parsed.job_id == *job_id)
            })
            .map(|(key, (info, _))| (key.clone(), info.clone()))
    }
}

#[async_trait]
impl Registry for MemoryRegistry {
    async fn register(
        &self,
        service: &str,
        realm: Option<&str>,
        status: &JobStatus,
        expires: u64,
        pending_timeout: u64,
    ) -> Result<(), RegistryError> {
        let key = job_key(&status.job_id, service, realm);
        let info = TaskInfo {
            job_id: status.job_id.clone(),
            created: status.created,
            service: service.to_string(),
            realm: realm.map(str::to_string),
            process_id: status.process_id.clone().unwrap_or_default(),
            dismissed: false,
            pending_timeout,
            tag: status.tag.clone(),
        };
        let expires_at = (self.now)() + expires;
        self.state.lock().records.insert(key, (info, expires_at));
        Ok(())
    }

    async fn find_job(
        &self,
        job_id: &JobId,
        realm: Option<&str>,
    ) -> Result<Option<TaskInfo>, RegistryError> {
        let now = (self.now)();
        let mut state = self.state.lock();
        state.prune(now);
        let found = state.records.iter().find_map(|(key, (info, _))| {
            let parsed = JobKey::parse(key)?;
            if parsed.job_id != *job_id {
                return None;
            }
            if let Some(realm) = realm {
                if parsed.realm != realm {
                    return None;
                }
            }
            Some(info.clone())
        });
        Ok(found)
    }

    async fn find_keys(
        &self,
        service: Option<&str>,
        realm: Option<&str>,
        cursor: u64,
        count: usize,
    ) -> Result<(u64, Vec<(JobId, String, String)>), RegistryError> {
        let now = (self.now)();
        let mut state = self.state.lock();
        state.prune(now);

        // Deterministic order stands in for the store's scan order
        let mut keys: Vec<&String> = state.records.keys().collect();
        keys.sort();

        let matching: Vec<(JobId, String, String)> = keys
            .into_iter()
            .filter_map(|key| JobKey::parse(key))
            .filter(|parsed| {
                service.is_none_or(|s| parsed.service == s)
                    && realm.is_none_or(|r| parsed.realm == r)
            })
            .map(|parsed| (parsed.job_id, parsed.service, parsed.realm))
            .collect();

        let start = (cursor as usize).min(matching.len());
        let end = (start + count).min(matching.len());
        let next = if end >= matching.len() { 0 } else { end as u64 };
        Ok((next, matching[start..end].to_vec()))
    }

    async fn dismiss(&self, job_id: &JobId, reset: bool) -> Result<bool, RegistryError> {
        match self.find_raw(job_id) {
            Some((key, _)) => {
                let mut state = self.state.lock();
                if let Some((info, _)) = state.records.get_mut(&key) {
                    info.dismissed = !reset;
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn exists(&self, job_id: &JobId) -> Result<bool, RegistryError> {
        Ok(self.find_raw(job_id).is_some())
    }

    async fn delete(&self, job_id: &JobId) -> Result<Option<TaskInfo>, RegistryError> {
        match self.find_raw(job_id) {
            Some((key, info)) => {
                self.state.lock().records.remove(&key);
                Ok(Some(info))
            }
            None => Ok(None),
        }
    }

    async fn lock(
        &self,
        name: &str,
        acquire: Duration,
        _lease: Duration,
    ) -> Result<LockGuard, RegistryError> {
        let deadline = tokio::time::Instant::now() + acquire;
        loop {
            {
                let mut state = self.state.lock();
                if state.locks.insert(name.to_string()) {
                    let shared = Arc::clone(&self.state);
                    let name = name.to_string();
                    return Ok(LockGuard::new(move || {
                        shared.lock().locks.remove(&name);
                    }));
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(RegistryError::LockBusy(name.to_string()));
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
