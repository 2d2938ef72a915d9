// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Gateway configuration.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Configuration load/validation error.
#[derive(Debug, thiserror::Error)]
#[error("Configuration error: {0}")]
pub struct ConfigError(pub String);

fn default_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9180))
}

fn default_update_interval() -> u64 {
    30
}

fn default_timeout() -> u64 {
    20
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

fn default_local_root() -> Option<PathBuf> {
    Some(std::env::temp_dir().join("qjazz"))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpSection {
    pub listen: SocketAddr,
    /// Presence-cache refresh interval (seconds).
    pub update_interval: u64,
    /// Default backend RPC deadline (seconds).
    pub timeout: u64,
    /// `all`, `same-origin`, or an explicit origin.
    pub cross_origin: String,
    /// External base URL used when building hrefs.
    pub public_url: Option<String>,
    /// Honor X-Forwarded-*/Forwarded headers.
    pub proxy: bool,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            update_interval: default_update_interval(),
            timeout: default_timeout(),
            cross_origin: "all".to_string(),
            public_url: None,
            proxy: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutorSection {
    /// Default pending timeout (seconds).
    pub message_expiration_timeout: u64,
    /// Result TTL upper bound (seconds).
    pub result_expires: u64,
}

impl Default for ExecutorSection {
    fn default() -> Self {
        Self { message_expiration_timeout: 600, result_expires: 86_400 }
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

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JobRealmSection {
    pub enabled: bool,
    /// Catch-all tokens that bypass realm filtering.
    pub admin_tokens: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageSection {
    /// Download streaming chunk size (bytes).
    pub chunksize: usize,
    /// Expiration requested for signed download links (seconds).
    pub download_url_expiration: u64,
    /// Plain-http download links are refused unless enabled.
    pub allow_insecure_connection: bool,
    /// Root that `file://` download links must live under.
    pub local_root: Option<PathBuf>,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            chunksize: default_chunksize(),
            download_url_expiration: default_download_expiration(),
            allow_insecure_connection: false,
            local_root: default_local_root(),
        }
    }
}

/// Gateway configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub http: HttpSection,
    pub executor: ExecutorSection,
    pub broker: BrokerSection,
    pub job_realm: JobRealmSection,
    pub storage: StorageSection,
}

impl ServerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|err| ConfigError(format!("{}: {err}", path.display())))?;
        let mut config: ServerConfig = toml::from_str(&raw)
            .map_err(|err| ConfigError(format!("{}: {err}", path.display())))?;
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("QJAZZ_BROKER_URL") {
            self.broker.url = url;
        }
        if let Ok(listen) = std::env::var("QJAZZ_LISTEN") {
            if let Ok(listen) = listen.parse() {
                self.http.listen = listen;
            }
        }
        if let Ok(public_url) = std::env::var("QJAZZ_PUBLIC_URL") {
            self.http.public_url = Some(public_url);
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout)
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.http.update_interval)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
