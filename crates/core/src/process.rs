// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process descriptions and execution requests (OGC-API-Processes shapes).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::models::Link;

/// Supported job control modes for a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobControlOption {
    #[serde(rename = "sync-execute")]
    SyncExecute,
    #[serde(rename = "async-execute")]
    AsyncExecute,
    #[serde(rename = "dismiss")]
    Dismiss,
}

/// How an input or output value may be passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValuePassing {
    #[serde(rename = "byValue")]
    ByValue,
    #[serde(rename = "byReference")]
    ByReference,
}

/// Description of one process input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputDescription {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema fragment constraining the value.
    pub schema: Value,
    #[serde(default = "one")]
    pub min_occurs: u32,
    /// None means unbounded cardinality.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_occurs: Option<u32>,
    #[serde(default = "by_value", skip_serializing_if = "Vec::is_empty")]
    pub value_passing: Vec<ValuePassing>,
}

/// Description of one process output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputDescription {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub schema: Value,
    #[serde(default = "by_value", skip_serializing_if = "Vec::is_empty")]
    pub value_passing: Vec<ValuePassing>,
}

fn one() -> u32 {
    1
}

fn by_value() -> Vec<ValuePassing> {
    vec![ValuePassing::ByValue]
}

/// Summary entry in a process list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessSummary {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub job_control_options: Vec<JobControlOption>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
}

impl ProcessSummary {
    /// Check whether the process allows the given control mode.
    pub fn allows(&self, option: JobControlOption) -> bool {
        self.job_control_options.contains(&option)
    }
}

/// Full process description: summary plus typed inputs and outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessDescription {
    #[serde(flatten)]
    pub summary: ProcessSummary,
    #[serde(default)]
    pub inputs: BTreeMap<String, InputDescription>,
    #[serde(default)]
    pub outputs: BTreeMap<String, OutputDescription>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metadata: Vec<Value>,
}

/// Client-supplied lifecycle notification endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscriber {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_progress_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_uri: Option<String>,
}

impl Subscriber {
    pub fn is_empty(&self) -> bool {
        self.success_uri.is_none() && self.in_progress_uri.is_none() && self.failed_uri.is_none()
    }
}

/// An execution request body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobExecute {
    #[serde(default)]
    pub inputs: Map<String, Value>,
    #[serde(default)]
    pub outputs: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscriber: Option<Subscriber>,
}

/// Results of a successful execution, keyed by output name.
pub type JobResults = Map<String, Value>;

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
