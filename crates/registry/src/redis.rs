// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Redis implementation of the registry.
//!
//! Records are hashes with EXPIREAT; every lookup iterates with
//! cursor-based SCAN (never KEYS). Locks are `SET NX PX` leases with
//! a compare-and-delete release.

use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use ::redis::AsyncCommands;
use async_trait::async_trait;
use tracing::warn;

use qjazz_core::{JobId, JobStatus};

use crate::keys::{job_key, scan_pattern, JobKey};
use crate::lock::LockGuard;
use crate::traits::{Registry, RegistryError, TaskInfo};

const LOCK_RETRY: Duration = Duration::from_millis(100);

fn epoch_now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

fn lock_key(name: &str) -> String {
    format!("lock:{name}")
}

/// Redis-backed [`Registry`].
#[derive(Clone)]
pub struct RedisRegistry {
    manager: ::redis::aio::ConnectionManager,
}

impl RedisRegistry {
    pub async fn connect(url: &str) -> Result<Self, RegistryError> {
        let client = ::redis::Client::open(url).map_err(RegistryError::from)?;
        let manager = client.get_connection_manager().await.map_err(RegistryError::from)?;
        Ok(Self { manager })
    }

    /// One SCAN step.
    async fn scan_step(
        &self,
        pattern: &str,
        cursor: u64,
        count: usize,
    ) -> Result<(u64, Vec<String>), RegistryError> {
        let mut con = self.manager.clone();
        let (next, keys): (u64, Vec<String>) = ::redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(count)
            .query_async(&mut con)
            .await?;
        Ok((next, keys))
    }

    /// Iterate SCAN until the first matching key.
    async fn first_key(&self, pattern: &str) -> Result<Option<String>, RegistryError> {
        let mut cursor = 0;
        loop {
            let (next, keys) = self.scan_step(pattern, cursor, 64).await?;
            if let Some(key) = keys.into_iter().next() {
                return Ok(Some(key));
            }
            if next == 0 {
                return Ok(None);
            }
            cursor = next;
        }
    }

    async fn load(&self, key: &str) -> Result<Option<TaskInfo>, RegistryError> {
        let parsed = match JobKey::parse(key) {
            Some(parsed) => parsed,
            None => return Ok(None),
        };
        let mut con = self.manager.clone();
        let fields: HashMap<String, String> = con.hgetall(key).await?;
        if fields.is_empty() {
            return Ok(None);
        }
        Ok(Some(decode(&parsed.job_id, fields)?))
    }
}

fn decode(job_id: &JobId, fields: HashMap<String, String>) -> Result<TaskInfo, RegistryError> {
    let field = |name: &str| -> Result<&String, RegistryError> {
        fields.get(name).ok_or_else(|| RegistryError::Corrupt(job_id.clone()))
    };
    let numeric = |name: &str| -> Result<u64, RegistryError> {
        field(name)?.parse().map_err(|_| RegistryError::Corrupt(job_id.clone()))
    };

    let realm = field("realm")?;
    let tag = fields.get("tag").filter(|t| !t.is_empty()).cloned();

    Ok(TaskInfo {
        job_id: JobId::new(field("job_id")?.clone()),
        created: numeric("created")?,
        service: field("service")?.clone(),
        realm: (!realm.is_empty()).then(|| realm.clone()),
        process_id: field("process_id")?.clone(),
        dismissed: numeric("dismissed")? != 0,
        pending_timeout: numeric("pending_timeout")?,
        tag,
    })
}

#[async_trait]
impl Registry for RedisRegistry {
    async fn register(
        &self,
        service: &str,
        realm: Option<&str>,
        status: &JobStatus,
        expires: u64,
        pending_timeout: u64,
    ) -> Result<(), RegistryError> {
        let key = job_key(&status.job_id, service, realm);
        let process_id = status.process_id.clone().unwrap_or_default();
        let fields: Vec<(&str, String)> = vec![
            ("job_id", status.job_id.to_string()),
            ("created", status.created.to_string()),
            ("service", service.to_string()),
            ("realm", realm.unwrap_or("").to_string()),
            ("process_id", process_id),
            ("dismissed", "0".to_string()),
            ("pending_timeout", pending_timeout.to_string()),
            ("tag", status.tag.clone().unwrap_or_default()),
        ];

        let mut con = self.manager.clone();
        let _: () = con.hset_multiple(&key, &fields).await?;
        let _: () = con.expire_at(&key, (epoch_now() + expires) as i64).await?;
        Ok(())
    }

    async fn find_job(
        &self,
        job_id: &JobId,
        realm: Option<&str>,
    ) -> Result<Option<TaskInfo>, RegistryError> {
        let pattern = scan_pattern(Some(job_id), None, realm);
        match self.first_key(&pattern).await? {
            Some(key) => self.load(&key).await,
            None => Ok(None),
        }
    }

    async fn find_keys(
        &self,
        service: Option<&str>,
        realm: Option<&str>,
        cursor: u64,
        count: usize,
    ) -> Result<(u64, Vec<(JobId, String, String)>), RegistryError> {
        let pattern = scan_pattern(None, service, realm);
        let (next, keys) = self.scan_step(&pattern, cursor, count).await?;
        let triples = keys
            .iter()
            .filter_map(|key| JobKey::parse(key))
            .map(|parsed| (parsed.job_id, parsed.service, parsed.realm))
            .collect();
        Ok((next, triples))
    }

    async fn dismiss(&self, job_id: &JobId, reset: bool) -> Result<bool, RegistryError> {
        let pattern = scan_pattern(Some(job_id), None, None);
        match self.first_key(&pattern).await? {
            Some(key) => {
                let mut con = self.manager.clone();
                let flag = if reset { "0" } else { "1" };
                let _: () = con.hset(&key, "dismissed", flag).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn exists(&self, job_id: &JobId) -> Result<bool, RegistryError> {
        let pattern = scan_pattern(Some(job_id), None, None);
        Ok(self.first_key(&pattern).await?.is_some())
    }

    async fn delete(&self, job_id: &JobId) -> Result<Option<TaskInfo>, RegistryError> {
        let pattern = scan_pattern(Some(job_id), None, None);
        match self.first_key(&pattern).await? {
            Some(key) => {
                let info = self.load(&key).await?;
                let mut con = self.manager.clone();
                let _: () = con.del(&key).await?;
                Ok(info)
            }
            None => Ok(None),
        }
    }

    async fn lock(
        &self,
        name: &str,
        acquire: Duration,
        lease: Duration,
    ) -> Result<LockGuard, RegistryError> {
        let key = lock_key(name);
        let token = uuid::Uuid::new_v4().to_string();
        let start = tokio::time::Instant::now();

        loop {
            let mut con = self.manager.clone();
            let acquired: Option<String> = ::redis::cmd("SET")
                .arg(&key)
                .arg(&token)
                .arg("NX")
                .arg("PX")
                .arg(lease.as_millis().max(1) as u64)
                .query_async(&mut con)
                .await?;

            if acquired.is_some() {
                let manager = self.manager.clone();
                let key = key.clone();
                return Ok(LockGuard::new(move || {
                    // Compare-and-delete so an expired lease taken over
                    // by another holder is never released from here.
                    if let Ok(handle) = tokio::runtime::Handle::try_current() {
                        handle.spawn(async move {
                            let script = ::redis::Script::new(
                                r#"if redis.call('get', KEYS[1]) == ARGV[1] then
                                       return redis.call('del', KEYS[1])
                                   else
                                       return 0
                                   end"#,
                            );
                            let mut con = manager;
                            let released: Result<i64, _> =
                                script.key(&key).arg(&token).invoke_async(&mut con).await;
                            if let Err(err) = released {
                                warn!("Lock release failed for {key}: {err}");
                            }
                        });
                    }
                }));
            }

            if start.elapsed() >= acquire {
                return Err(RegistryError::LockBusy(name.to_string()));
            }
            tokio::time::sleep(LOCK_RETRY.min(acquire)).await;
        }
    }
}
