// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker configuration: TOML file with `QJAZZ_*` environment
//! overrides, validated on load.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::WorkerError;

/// Smallest allowed cleanup interval (seconds).
pub const MIN_CLEANUP_INTERVAL: u64 = 300;

fn default_workdir() -> PathBuf {
    std::env::temp_dir().join("qjazz")
}

fn default_cleanup_interval() -> u64 {
    MIN_CLEANUP_INTERVAL
}

fn default_concurrency() -> usize {
    4
}

fn default_result_expires() -> u64 {
    86_400
}

fn default_broker_url() -> String {
    "redis://localhost:6379/0".to_string()
}

fn default_chunksize() -> usize {
    65_536
}

fn default_download_expiration() -> u64 {
    3_600
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceSection {
    /// Routing key component and presence identity.
    pub service_name: String,
    pub title: String,
    pub description: String,
    pub workdir: PathBuf,
    /// Seconds between cleanup passes.
    pub cleanup_interval: u64,
    /// Optional path watched for mtime changes to trigger a reload.
    pub reload_monitor: Option<PathBuf>,
    /// Omit library/OS versions from the presence payload.
    pub hide_presence_versions: bool,
    /// Runner pool size.
    pub concurrency: usize,
    /// Result and registry TTL (seconds).
    pub result_expires: u64,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            service_name: String::new(),
            title: String::new(),
            description: String::new(),
            workdir: default_workdir(),
            cleanup_interval: default_cleanup_interval(),
            reload_monitor: None,
            hide_presence_versions: false,
            concurrency: default_concurrency(),
            result_expires: default_result_expires(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BrokerSection {
    pub url: String,
}

impl Default for BrokerSection {
    fn default() -> Self {
        Self { url: default_broker_url() }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageSection {
    /// Download streaming chunk size (bytes).
    pub chunksize: usize,
    /// Signed download link lifetime (seconds).
    pub download_url_expiration: u64,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            chunksize: default_chunksize(),
            download_url_expiration: default_download_expiration(),
        }
    }
}

/// Callback handler declaration for one URL scheme.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CallbackSection {
    /// Handler kind; `http` is the stock POST handler.
    pub handler: String,
}

/// Worker daemon configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkerConfig {
    pub worker: ServiceSection,
    pub broker: BrokerSection,
    pub storage: StorageSection,
    /// scheme → handler mapping for subscriber callbacks.
    pub callbacks: std::collections::BTreeMap<String, CallbackSection>,
}

impl WorkerConfig {
    /// Load from a TOML file, apply environment overrides, validate.
    pub fn load(path: &Path) -> Result<Self, WorkerError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|err| WorkerError::Config(format!("{}: {err}", path.display())))?;
        let mut config: WorkerConfig = toml::from_str(&raw)
            .map_err(|err| WorkerError::Config(format!("{}: {err}", path.display())))?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Environment overrides for deployment scalars.
    fn apply_env(&mut self) {
        if let Ok(name) = std::env::var("QJAZZ_SERVICE_NAME") {
            self.worker.service_name = name;
        }
        if let Ok(url) = std::env::var("QJAZZ_BROKER_URL") {
            self.broker.url = url;
        }
        if let Ok(dir) = std::env::var("QJAZZ_WORKDIR") {
            self.worker.workdir = PathBuf::from(dir);
        }
    }

    pub fn validate(&self) -> Result<(), WorkerError> {
        if !valid_service_name(&self.worker.service_name) {
            return Err(WorkerError::Config(format!(
                "Invalid service name: {:?}",
                self.worker.service_name
            )));
        }
        if self.worker.cleanup_interval < MIN_CLEANUP_INTERVAL {
            return Err(WorkerError::Config(format!(
                "cleanup_interval must be at least {MIN_CLEANUP_INTERVAL}s"
            )));
        }
        if self.worker.concurrency == 0 {
            return Err(WorkerError::Config("concurrency must be positive".to_string()));
        }
        Ok(())
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.worker.cleanup_interval)
    }
}

/// Service names route queues: one leading letter, then letters,
/// digits, underscores or dashes.
pub fn valid_service_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
