// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pluggable access policy.
//!
//! Policies answer three questions: which service a request targets,
//! whether the client may see it, and whether it may execute a given
//! process. Policies are chosen at boot from a tagged configuration;
//! no runtime reflection.

use std::collections::HashMap;

use axum::http::HeaderMap;

/// Authorization and request-scoping hooks.
pub trait AccessPolicy: Send + Sync {
    /// May the client see this service at all?
    fn service_permission(&self, headers: &HeaderMap, service: &str) -> bool;

    /// May the client execute this process?
    fn execute_permission(&self, headers: &HeaderMap, service: &str, process_id: &str) -> bool;

    /// Resolve the target service from the request. Falls back to the
    /// first known service when the client names none.
    fn get_service(
        &self,
        headers: &HeaderMap,
        query_service: Option<&str>,
        known: &[String],
    ) -> Option<String>;

    /// Resolve the target project from the request.
    fn get_project(&self, query_project: Option<&str>) -> Option<String> {
        query_project.map(str::to_string)
    }

    /// Path prefix injected in generated hrefs.
    fn prefix(&self) -> &str {
        ""
    }

    fn format_path(&self, path: &str) -> String {
        format!("{}{}", self.prefix(), path)
    }
}

/// Allow-everything policy used when none is configured.
#[derive(Default)]
pub struct DefaultAccessPolicy;

impl AccessPolicy for DefaultAccessPolicy {
    fn service_permission(&self, _headers: &HeaderMap, _service: &str) -> bool {
        true
    }

    fn execute_permission(&self, _headers: &HeaderMap, _service: &str, _process_id: &str) -> bool {
        true
    }

    fn get_service(
        &self,
        _headers: &HeaderMap,
        query_service: Option<&str>,
        known: &[String],
    ) -> Option<String> {
        match query_service {
            Some(service) => Some(service.to_string()),
            None => {
                let mut sorted: Vec<&String> = known.iter().collect();
                sorted.sort();
                sorted.first().map(|service| service.to_string())
            }
        }
    }
}

/// Deny-by-default policy driven by a static service→processes map.
pub struct StaticAccessPolicy {
    allowed: HashMap<String, Vec<String>>,
    prefix: String,
}

impl StaticAccessPolicy {
    pub fn new(allowed: HashMap<String, Vec<String>>, prefix: impl Into<String>) -> Self {
        Self { allowed, prefix: prefix.into() }
    }
}

impl AccessPolicy for StaticAccessPolicy {
    fn service_permission(&self, _headers: &HeaderMap, service: &str) -> bool {
        self.allowed.contains_key(service)
    }

    fn execute_permission(&self, _headers: &HeaderMap, service: &str, process_id: &str) -> bool {
        self.allowed
            .get(service)
            .is_some_and(|processes| processes.iter().any(|allowed| allowed == process_id))
    }

    fn get_service(
        &self,
        headers: &HeaderMap,
        query_service: Option<&str>,
        known: &[String],
    ) -> Option<String> {
        DefaultAccessPolicy
            .get_service(headers, query_service, known)
            .filter(|service| self.allowed.contains_key(service))
    }

    fn prefix(&self) -> &str {
        &self.prefix
    }
}

#[cfg(test)]
#[path = "policy_tests.rs"]
mod tests;
