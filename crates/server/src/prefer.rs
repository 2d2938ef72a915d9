// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OGC `Prefer` header handling on execute requests.
//!
//! Recognized members: `respond-async`, `wait=<s>`, `priority=<0-9>`,
//! `delay=<s>`. Invalid values are ignored, per the header's
//! best-effort semantics.

use axum::http::HeaderMap;
use tracing::warn;

/// Execution preferences from the `Prefer` header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutePrefs {
    pub respond_async: bool,
    pub wait: Option<u64>,
    pub priority: Option<u8>,
    pub delay: Option<u64>,
}

impl ExecutePrefs {
    pub fn parse(headers: &HeaderMap) -> Self {
        let mut prefs = Self::default();
        for header in headers.get_all("Prefer") {
            let raw = match header.to_str() {
                Ok(raw) => raw,
                Err(_) => continue,
            };
            for pref in raw.split(',').map(|p| p.trim().to_ascii_lowercase()) {
                if pref == "respond-async" {
                    prefs.respond_async = true;
                } else if let Some(value) = pref.strip_prefix("wait=") {
                    match value.parse() {
                        Ok(wait) => prefs.wait = Some(wait),
                        Err(_) => warn!("Invalid value in Prefer header: {pref}"),
                    }
                } else if let Some(value) = pref.strip_prefix("priority=") {
                    match value.parse::<u8>() {
                        Ok(priority) if priority < 10 => prefs.priority = Some(priority),
                        _ => warn!("Invalid value in Prefer header: {pref}"),
                    }
                } else if let Some(value) = pref.strip_prefix("delay=") {
                    match value.parse() {
                        Ok(delay) => prefs.delay = Some(delay),
                        Err(_) => warn!("Invalid value in Prefer header: {pref}"),
                    }
                }
            }
        }
        prefs
    }

    /// Whether the request should run synchronously.
    ///
    /// Synchronous mode needs an explicit positive `wait` and no
    /// `respond-async`; delayed execution is always asynchronous and
    /// `wait=0` means "do not wait", falling through to an immediate
    /// 202.
    pub fn execute_sync(&self) -> bool {
        self.delay.is_none() && !self.respond_async && self.wait.is_some_and(|wait| wait > 0)
    }
}

#[cfg(test)]
#[path = "prefer_tests.rs"]
mod tests;
