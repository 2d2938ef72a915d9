// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Service presence discovery and cache.
//!
//! Workers answer the `presence` broadcast with their self-description;
//! replies collapse into one entry per service holding the list of
//! worker destinations. Downstream components consult only the cache,
//! refreshed on a fixed interval by the gateway.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use qjazz_core::{ProcessesError, WorkerPresence};

use crate::error::ExecutorError;
use crate::Executor;

/// `service → (destinations, representative presence)`
pub type ServiceMap = HashMap<String, (Vec<String>, WorkerPresence)>;

#[derive(Clone, Default)]
pub(crate) struct ServiceCache {
    inner: Arc<RwLock<CacheState>>,
}

#[derive(Default)]
struct CacheState {
    services: ServiceMap,
    last_updated: u64,
    /// Process summaries keyed by `(service, online_since)`: a worker
    /// restart changes the key and invalidates the entry.
    processes: HashMap<(String, u64), Vec<qjazz_core::ProcessSummary>>,
}

impl ServiceCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn replace(&self, services: ServiceMap, now: u64) {
        let mut state = self.inner.write();
        // Drop process summaries of services that went away or restarted
        state.processes.retain(|(service, online_since), _| {
            services
                .get(service)
                .is_some_and(|(_, presence)| presence.online_since == *online_since)
        });
        state.services = services;
        state.last_updated = now;
    }

    pub(crate) fn cached_processes(
        &self,
        key: &(String, u64),
    ) -> Option<Vec<qjazz_core::ProcessSummary>> {
        self.inner.read().processes.get(key).cloned()
    }

    pub(crate) fn store_processes(
        &self,
        key: (String, u64),
        processes: Vec<qjazz_core::ProcessSummary>,
    ) {
        self.inner.write().processes.insert(key, processes);
    }

    pub(crate) fn snapshot(&self) -> ServiceMap {
        self.inner.read().services.clone()
    }

    pub(crate) fn destinations(&self, service: &str) -> Option<Vec<String>> {
        self.inner.read().services.get(service).map(|(dests, _)| dests.clone())
    }

    pub(crate) fn presence(&self, service: &str) -> Option<WorkerPresence> {
        self.inner.read().services.get(service).map(|(_, presence)| presence.clone())
    }

    pub(crate) fn last_updated(&self) -> u64 {
        self.inner.read().last_updated
    }
}

impl Executor {
    /// Broadcast `presence` and refresh the service cache.
    ///
    /// Returns the number of known services.
    pub async fn update_services(&self) -> Result<usize, ExecutorError> {
        let replies = self.presences(None).await?;

        let mut services: ServiceMap = HashMap::new();
        for (destination, presence) in replies {
            let entry = services
                .entry(presence.service.clone())
                .or_insert_with(|| (Vec::new(), presence));
            entry.0.push(destination);
        }

        if services.is_empty() {
            warn!("No services available");
        } else {
            debug!("Available services: {:?}", services.keys().collect::<Vec<_>>());
        }

        let count = services.len();
        self.services.replace(services, crate::commands::epoch_now());
        Ok(count)
    }

    /// Collect presence records keyed by destination.
    pub(crate) async fn presences(
        &self,
        destinations: Option<Vec<String>>,
    ) -> Result<Vec<(String, WorkerPresence)>, ExecutorError> {
        let replies =
            self.broadcast_presence(destinations, self.options.presence_timeout).await?;
        let mut presences = Vec::with_capacity(replies.len());
        for reply in replies {
            match serde_json::from_value::<WorkerPresence>(reply.payload.clone()) {
                Ok(presence) => presences.push((reply.destination, presence)),
                Err(err) => warn!("Invalid presence reply from {}: {err}", reply.destination),
            }
        }
        Ok(presences)
    }

    /// Check if a service is known in uploaded presences.
    pub fn known_service(&self, name: &str) -> bool {
        self.services.destinations(name).is_some()
    }

    /// Uploaded service presences.
    pub fn services(&self) -> Vec<WorkerPresence> {
        self.services.snapshot().into_values().map(|(_, presence)| presence).collect()
    }

    /// The full cached service map.
    pub fn service_map(&self) -> ServiceMap {
        self.services.snapshot()
    }

    /// Epoch seconds of the last successful cache refresh.
    pub fn last_updated(&self) -> u64 {
        self.services.last_updated()
    }

    /// Cached presence for a service.
    pub fn presence(&self, service: &str) -> Option<WorkerPresence> {
        self.services.presence(service)
    }

    /// Destinations for a service, or `ServiceNotAvailable`.
    pub(crate) fn require_destinations(&self, service: &str) -> Result<Vec<String>, ExecutorError> {
        match self.services.destinations(service) {
            Some(dests) if !dests.is_empty() => Ok(dests),
            _ => Err(ProcessesError::ServiceNotAvailable(service.to_string()).into()),
        }
    }
}
