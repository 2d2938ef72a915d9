// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subscriber callback dispatch.
//!
//! Handlers are registered per URL scheme at boot. Dispatch is
//! infallible by policy: a failing callback is logged and swallowed,
//! it never changes job state.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::{error, info, warn};

use qjazz_core::{JobId, JobMeta, JobResults};

/// Lifecycle notification handler.
#[async_trait]
pub trait CallbackHandler: Send + Sync {
    async fn in_progress(&self, url: &str, job_id: &JobId, meta: &JobMeta) -> Result<(), String>;

    async fn on_success(
        &self,
        url: &str,
        job_id: &JobId,
        meta: &JobMeta,
        results: &JobResults,
    ) -> Result<(), String>;

    async fn on_failure(&self, url: &str, job_id: &JobId, meta: &JobMeta) -> Result<(), String>;
}

/// POST JSON notifications to http(s) endpoints.
pub struct HttpCallbackHandler {
    client: reqwest::Client,
}

impl Default for HttpCallbackHandler {
    fn default() -> Self {
        Self { client: reqwest::Client::new() }
    }
}

impl HttpCallbackHandler {
    async fn post(&self, url: &str, body: serde_json::Value) -> Result<(), String> {
        self.client
            .post(url)
            .json(&body)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map(|_| ())
            .map_err(|err| err.to_string())
    }
}

#[async_trait]
impl CallbackHandler for HttpCallbackHandler {
    async fn in_progress(&self, url: &str, job_id: &JobId, meta: &JobMeta) -> Result<(), String> {
        self.post(url, json!({"jobId": job_id, "status": "in_progress", "meta": meta})).await
    }

    async fn on_success(
        &self,
        url: &str,
        job_id: &JobId,
        meta: &JobMeta,
        results: &JobResults,
    ) -> Result<(), String> {
        self.post(
            url,
            json!({"jobId": job_id, "status": "success", "meta": meta, "results": results}),
        )
        .await
    }

    async fn on_failure(&self, url: &str, job_id: &JobId, meta: &JobMeta) -> Result<(), String> {
        self.post(url, json!({"jobId": job_id, "status": "failed", "meta": meta})).await
    }
}

/// Scheme → handler registry.
#[derive(Clone, Default)]
pub struct Callbacks {
    handlers: HashMap<String, Arc<dyn CallbackHandler>>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stock registry: http and https POST handlers.
    pub fn with_http() -> Self {
        let mut callbacks = Self::new();
        let handler: Arc<dyn CallbackHandler> = Arc::new(HttpCallbackHandler::default());
        callbacks.register("http", Arc::clone(&handler));
        callbacks.register("https", handler);
        callbacks
    }

    /// Build the registry from the `[callbacks.{scheme}]` config map.
    pub fn from_config(
        config: &std::collections::BTreeMap<String, crate::config::CallbackSection>,
    ) -> Result<Self, crate::WorkerError> {
        let mut callbacks = Self::new();
        for (scheme, section) in config {
            let handler: Arc<dyn CallbackHandler> = match section.handler.as_str() {
                "http" => Arc::new(HttpCallbackHandler::default()),
                other => {
                    return Err(crate::WorkerError::Config(format!(
                        "Unknown callback handler kind {other:?} for scheme {scheme:?}"
                    )))
                }
            };
            callbacks.register(scheme, handler);
        }
        Ok(callbacks)
    }

    pub fn register(&mut self, scheme: &str, handler: Arc<dyn CallbackHandler>) {
        self.handlers.insert(scheme.to_string(), handler);
    }

    /// Registered schemes, advertised in the worker presence.
    pub fn schemes(&self) -> Vec<String> {
        let mut schemes: Vec<String> = self.handlers.keys().cloned().collect();
        schemes.sort();
        schemes
    }

    fn handler_for(&self, uri: &str) -> Option<Arc<dyn CallbackHandler>> {
        let scheme = uri.split_once("://").map(|(scheme, _)| scheme)?;
        match self.handlers.get(scheme) {
            Some(handler) => Some(Arc::clone(handler)),
            None => {
                warn!("No callback handler found for {uri}");
                None
            }
        }
    }

    pub async fn in_progress(&self, uri: &str, job_id: &JobId, meta: &JobMeta) {
        if let Some(handler) = self.handler_for(uri) {
            info!("{job_id}: in_progress callback to {uri}");
            if let Err(err) = handler.in_progress(uri, job_id, meta).await {
                error!("Callback '{uri}' failed: {err}");
            }
        }
    }

    pub async fn on_success(
        &self,
        uri: &str,
        job_id: &JobId,
        meta: &JobMeta,
        results: &JobResults,
    ) {
        if let Some(handler) = self.handler_for(uri) {
            info!("{job_id}: on_success callback to {uri}");
            if let Err(err) = handler.on_success(uri, job_id, meta, results).await {
                error!("Callback '{uri}' failed: {err}");
            }
        }
    }

    pub async fn on_failure(&self, uri: &str, job_id: &JobId, meta: &JobMeta) {
        if let Some(handler) = self.handler_for(uri) {
            info!("{job_id}: on_failure callback to {uri}");
            if let Err(err) = handler.on_failure(uri, job_id, meta).await {
                error!("Callback '{uri}' failed: {err}");
            }
        }
    }
}

#[cfg(test)]
#[path = "callbacks_tests.rs"]
mod tests;
