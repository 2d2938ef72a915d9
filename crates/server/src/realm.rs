// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job realm handling.
//!
//! A realm is an opaque client-scoping token carried in the
//! `X-Job-Realm` header. Jobs filed under a realm are listable and
//! retrievable only under that realm; admin tokens bypass filtering.

use axum::http::{HeaderMap, StatusCode};

use crate::config::JobRealmSection;
use crate::models::ApiError;

pub const JOB_REALM_HEADER: &str = "X-Job-Realm";

/// Validate a realm token: at least 8 chars, leading alphanumeric,
/// then alphanumerics, underscores or dashes.
pub fn valid_realm(realm: &str) -> bool {
    if realm.len() < 8 {
        return false;
    }
    let mut chars = realm.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphanumeric() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Realm policy derived from configuration.
#[derive(Clone, Default)]
pub struct JobRealm {
    config: JobRealmSection,
}

impl JobRealm {
    pub fn new(config: JobRealmSection) -> Self {
        Self { config }
    }

    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn is_admin(&self, realm: Option<&str>) -> bool {
        realm.is_some_and(|realm| self.config.admin_tokens.iter().any(|token| token == realm))
    }

    fn header_realm(&self, headers: &HeaderMap) -> Result<Option<String>, ApiError> {
        match headers.get(JOB_REALM_HEADER) {
            None => Ok(None),
            Some(raw) => {
                let realm = raw
                    .to_str()
                    .map_err(|_| ApiError::new(StatusCode::UNAUTHORIZED, "Invalid job realm"))?;
                if !valid_realm(realm) {
                    return Err(ApiError::new(StatusCode::UNAUTHORIZED, "Invalid job realm"));
                }
                Ok(Some(realm.to_string()))
            }
        }
    }

    /// Realm for an execute request: header value, or a freshly minted
    /// token returned to the client.
    pub fn get_job_realm(&self, headers: &HeaderMap) -> Result<Option<String>, ApiError> {
        if !self.config.enabled {
            return Ok(None);
        }
        match self.header_realm(headers)? {
            Some(realm) => Ok(Some(realm)),
            None => Ok(Some(uuid::Uuid::new_v4().to_string())),
        }
    }

    /// Realm filter for job listing. A missing realm is refused;
    /// admin tokens lift the filter.
    pub fn listing_realm(&self, headers: &HeaderMap) -> Result<Option<String>, ApiError> {
        if !self.config.enabled {
            return Ok(None);
        }
        match self.header_realm(headers)? {
            Some(realm) if self.is_admin(Some(realm.as_str())) => Ok(None),
            Some(realm) => Ok(Some(realm)),
            None => Err(ApiError::new(StatusCode::UNAUTHORIZED, "Unauthorized")),
        }
    }

    /// Realm filter for single-job lookups. A missing realm filters
    /// on the empty realm, so realm-scoped jobs read as not found.
    pub fn lookup_realm(&self, headers: &HeaderMap) -> Result<Option<String>, ApiError> {
        if !self.config.enabled {
            return Ok(None);
        }
        match self.header_realm(headers)? {
            Some(realm) if self.is_admin(Some(realm.as_str())) => Ok(None),
            Some(realm) => Ok(Some(realm)),
            None => Ok(Some(String::new())),
        }
    }
}

#[cfg(test)]
#[path = "realm_tests.rs"]
mod tests;
