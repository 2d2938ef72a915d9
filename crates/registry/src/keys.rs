// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registry key layout.
//!
//! The layout is fixed and part of the contract:
//! `qjazz::{job_id}::{service}::{realm|""}`.

use qjazz_core::JobId;

const PREFIX: &str = "qjazz";
const SEP: &str = "::";

/// A parsed registry key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobKey {
    pub job_id: JobId,
    pub service: String,
    /// Empty string when the job was filed without a realm.
    pub realm: String,
}

impl JobKey {
    /// Parse a raw store key; `None` if it is not a registry key.
    pub fn parse(raw: &str) -> Option<JobKey> {
        let mut parts = raw.split(SEP);
        if parts.next() != Some(PREFIX) {
            return None;
        }
        let job_id = parts.next()?;
        let service = parts.next()?;
        let realm = parts.next()?;
        if parts.next().is_some() || job_id.is_empty() || service.is_empty() {
            return None;
        }
        Some(JobKey {
            job_id: JobId::new(job_id),
            service: service.to_string(),
            realm: realm.to_string(),
        })
    }
}

/// The record key for a job.
pub fn job_key(job_id: &JobId, service: &str, realm: Option<&str>) -> String {
    format!("{PREFIX}{SEP}{job_id}{SEP}{service}{SEP}{}", realm.unwrap_or(""))
}

/// A glob pattern for SCAN over registry keys.
///
/// `None` filters match anything; a realm filter also matches the
/// record's exact realm only (absence under a realm filter means "no
/// access", which callers surface the same as "not found").
pub fn scan_pattern(job_id: Option<&JobId>, service: Option<&str>, realm: Option<&str>) -> String {
    format!(
        "{PREFIX}{SEP}{}{SEP}{}{SEP}{}",
        job_id.map_or("*", JobId::as_str),
        service.unwrap_or("*"),
        realm.unwrap_or("*"),
    )
}

#[cfg(test)]
#[path = "keys_tests.rs"]
mod tests;
