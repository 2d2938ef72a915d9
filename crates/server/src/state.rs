// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared gateway state and the presence-cache refresh task.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderMap, StatusCode};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use qjazz_executor::Executor;

use crate::config::ServerConfig;
use crate::models::ApiError;
use crate::policy::AccessPolicy;
use crate::realm::JobRealm;

#[derive(Clone)]
pub struct AppState {
    pub executor: Executor,
    pub config: Arc<ServerConfig>,
    pub policy: Arc<dyn AccessPolicy>,
    pub realm: JobRealm,
    pub http_client: reqwest::Client,
}

impl AppState {
    pub fn new(executor: Executor, config: ServerConfig, policy: Arc<dyn AccessPolicy>) -> Self {
        let realm = JobRealm::new(config.job_realm.clone());
        Self {
            executor,
            config: Arc::new(config),
            policy,
            realm,
            http_client: reqwest::Client::new(),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.config.timeout()
    }

    /// External base URL for hrefs: configured value, or derived from
    /// the request (honoring forwarded headers in proxy mode).
    pub fn public_url(&self, headers: &HeaderMap) -> String {
        if let Some(public_url) = &self.config.http.public_url {
            return public_url.trim_end_matches('/').to_string();
        }

        let forwarded_host = self
            .config
            .http
            .proxy
            .then(|| header_str(headers, "x-forwarded-host"))
            .flatten();
        let forwarded_proto = self
            .config
            .http
            .proxy
            .then(|| header_str(headers, "x-forwarded-proto"))
            .flatten();

        let host = forwarded_host
            .or_else(|| header_str(headers, "host"))
            .unwrap_or_else(|| self.config.http.listen.to_string());
        let scheme = forwarded_proto.unwrap_or_else(|| "http".to_string());
        format!("{scheme}://{host}")
    }

    /// Absolute href for a gateway path.
    pub fn href(&self, headers: &HeaderMap, path: &str) -> String {
        format!("{}{}", self.public_url(headers), self.policy.format_path(path))
    }

    pub fn known_services(&self) -> Vec<String> {
        self.executor
            .services()
            .into_iter()
            .map(|presence| presence.service)
            .collect()
    }

    /// Resolve the target service or fail with 503.
    pub fn resolve_service(
        &self,
        headers: &HeaderMap,
        query_service: Option<&str>,
    ) -> Result<String, ApiError> {
        let known = self.known_services();
        match self.policy.get_service(headers, query_service, &known) {
            Some(service) if self.executor.known_service(&service) => Ok(service),
            Some(_) | None => Err(ApiError::service_unavailable("Service not known")),
        }
    }

    /// Check execute permission or fail with 403.
    pub fn check_execute_permission(
        &self,
        headers: &HeaderMap,
        service: &str,
        process_id: &str,
    ) -> Result<(), ApiError> {
        if !self.policy.execute_permission(headers, service, process_id) {
            return Err(ApiError::new(
                StatusCode::FORBIDDEN,
                format!("Process {process_id} not available"),
            ));
        }
        Ok(())
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get(name).and_then(|value| value.to_str().ok()).map(str::to_string)
}

/// Refresh the presence cache on a fixed interval.
///
/// When no services are available yet (worker and gateway starting
/// together), the interval starts at 2 s and doubles up to the
/// configured value so the first worker is discovered quickly.
pub fn spawn_update_loop(state: AppState, shutdown: CancellationToken) {
    let max_interval = state.config.update_interval();
    tokio::spawn(async move {
        let mut ok = match state.executor.update_services().await {
            Ok(count) => count > 0,
            Err(err) => {
                warn!("Failed to update services: {err}");
                false
            }
        };
        let mut interval = if ok { max_interval } else { Duration::from_secs(2) };

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
            match state.executor.update_services().await {
                Ok(count) => {
                    ok = count > 0;
                    debug!("Service cache updated: {count} services");
                }
                Err(err) => {
                    ok = false;
                    error!("Failed to update services: {err}");
                }
            }
            interval = if ok { max_interval } else { (interval * 2).min(max_interval) };
        }
    });
}
