// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire models shared between workers, the executor and the gateway.

use serde::{Deserialize, Serialize};

/// A typed hyperlink (OGC link object).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rel: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u64>,
}

impl Link {
    pub fn new(href: impl Into<String>) -> Self {
        Self { href: href.into(), rel: None, mime_type: None, title: None, length: None }
    }

    crate::setters! {
        option {
            rel: String,
            mime_type: String,
            title: String,
        }
    }

    pub fn length(mut self, length: u64) -> Self {
        self.length = Some(length);
        self
    }
}

/// Worker self-description, returned in answer to the `presence`
/// inspect command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerPresence {
    pub service: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
    /// Epoch seconds when the worker came online. Used by the executor
    /// as a cache-invalidation key for process descriptions.
    pub online_since: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub versions: Vec<String>,
    /// Result expiration delay advertised by the worker (seconds).
    pub result_expires: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub callbacks: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<String>,
}

/// Captured execution log for one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessLog {
    /// Epoch seconds at capture.
    pub timestamp: u64,
    pub log: String,
}

/// Downloadable files advertised by a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessFiles {
    #[serde(default)]
    pub links: Vec<Link>,
}

#[cfg(test)]
#[path = "models_tests.rs"]
mod tests;
