// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The processing-engine seam.
//!
//! The platform itself performs no computation: a [`Process`] is an
//! opaque job function invoked by the runner with the execute request,
//! a feedback channel and the job context. The built-in set below
//! stands in for a real engine in demos and tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};

use qjazz_core::{
    JobExecute, JobResults, ProcessDescription, ProcessSummary, ProcessesError,
};

use crate::context::JobContext;

/// Progress feedback from a running job function.
///
/// `progress` values are clamped non-decreasing downstream; emitting
/// is cheap and may be called at any rate, coalescing happens in the
/// publishing loop.
pub struct Feedback {
    emit: Box<dyn Fn(Option<u8>, &str) + Send + Sync>,
    cancelled: Arc<AtomicBool>,
}

impl Feedback {
    pub fn new(emit: impl Fn(Option<u8>, &str) + Send + Sync + 'static) -> Self {
        Self::with_cancel(emit, Arc::new(AtomicBool::new(false)))
    }

    /// Wire the feedback to an externally-owned cancellation flag.
    pub fn with_cancel(
        emit: impl Fn(Option<u8>, &str) + Send + Sync + 'static,
        cancelled: Arc<AtomicBool>,
    ) -> Self {
        Self { emit: Box::new(emit), cancelled }
    }

    /// A feedback that discards everything.
    pub fn sink() -> Self {
        Self::new(|_, _| {})
    }

    /// Handle used to request cooperative cancellation.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn progress(&self, percent: u8, message: &str) {
        (self.emit)(Some(percent.min(100)), message);
    }

    pub fn message(&self, message: &str) {
        (self.emit)(None, message);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// An executable process.
pub trait Process: Send + Sync {
    fn summary(&self) -> ProcessSummary;

    fn describe(&self, project: Option<&str>) -> ProcessDescription;

    /// Run the job function. Blocking; executed on a runner.
    fn execute(
        &self,
        request: &JobExecute,
        feedback: &Feedback,
        ctx: &JobContext,
    ) -> Result<JobResults, ProcessesError>;
}

/// The set of processes a worker serves.
#[derive(Clone, Default)]
pub struct ProcessSet {
    processes: BTreeMap<String, Arc<dyn Process>>,
}

impl ProcessSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in demo set.
    pub fn builtin() -> Self {
        let mut set = Self::new();
        set.register("echo", Arc::new(EchoProcess));
        set.register("sleep", Arc::new(SleepProcess));
        set.register("write_file", Arc::new(WriteFileProcess));
        set
    }

    pub fn register(&mut self, ident: &str, process: Arc<dyn Process>) {
        self.processes.insert(ident.to_string(), process);
    }

    pub fn get(&self, ident: &str) -> Option<Arc<dyn Process>> {
        self.processes.get(ident).cloned()
    }

    pub fn summaries(&self) -> Vec<ProcessSummary> {
        self.processes.values().map(|process| process.summary()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }
}

fn summary_of(id: &str, title: &str, description: &str) -> ProcessSummary {
    serde_json::from_value(json!({
        "id": id,
        "title": title,
        "description": description,
        "version": "1.0",
        "jobControlOptions": ["sync-execute", "async-execute", "dismiss"],
    }))
    .unwrap_or_else(|_| unreachable!("static process summary"))
}

fn describe_with(
    summary: ProcessSummary,
    inputs: Value,
    outputs: Value,
) -> ProcessDescription {
    serde_json::from_value(json!({
        "id": summary.id,
        "title": summary.title,
        "description": summary.description,
        "version": summary.version,
        "jobControlOptions": ["sync-execute", "async-execute", "dismiss"],
        "inputs": inputs,
        "outputs": outputs,
    }))
    .unwrap_or_else(|_| unreachable!("static process description"))
}

fn string_input(request: &JobExecute, name: &str) -> Result<String, ProcessesError> {
    match request.inputs.get(name) {
        Some(Value::String(value)) => Ok(value.clone()),
        Some(_) => Err(ProcessesError::InputValueError(format!("'{name}' must be a string"))),
        None => Err(ProcessesError::InputValueError(format!("missing input '{name}'"))),
    }
}

fn u64_input(request: &JobExecute, name: &str, default: u64) -> Result<u64, ProcessesError> {
    match request.inputs.get(name) {
        Some(value) => value
            .as_u64()
            .ok_or_else(|| ProcessesError::InputValueError(format!("'{name}' must be an integer"))),
        None => Ok(default),
    }
}

/// Echo the `msg` input back.
struct EchoProcess;

impl Process for EchoProcess {
    fn summary(&self) -> ProcessSummary {
        summary_of("echo", "Echo", "Echo the input message")
    }

    fn describe(&self, _project: Option<&str>) -> ProcessDescription {
        describe_with(
            self.summary(),
            json!({"msg": {"title": "Message", "schema": {"type": "string"}}}),
            json!({"output": {"title": "Echoed message", "schema": {"type": "string"}}}),
        )
    }

    fn execute(
        &self,
        request: &JobExecute,
        feedback: &Feedback,
        _ctx: &JobContext,
    ) -> Result<JobResults, ProcessesError> {
        let msg = string_input(request, "msg")?;
        feedback.progress(100, "done");
        let mut results = JobResults::new();
        results.insert("output".to_string(), Value::String(msg));
        Ok(results)
    }
}

/// Sleep for `delay` seconds, emitting progress in five steps.
struct SleepProcess;

impl Process for SleepProcess {
    fn summary(&self) -> ProcessSummary {
        summary_of("sleep", "Sleep", "Sleep while emitting progress")
    }

    fn describe(&self, _project: Option<&str>) -> ProcessDescription {
        describe_with(
            self.summary(),
            json!({"delay": {"title": "Delay in seconds", "schema": {"type": "integer"}}}),
            json!({"elapsed": {"title": "Slept seconds", "schema": {"type": "integer"}}}),
        )
    }

    fn execute(
        &self,
        request: &JobExecute,
        feedback: &Feedback,
        ctx: &JobContext,
    ) -> Result<JobResults, ProcessesError> {
        let delay = u64_input(request, "delay", 5)?;
        let step = std::time::Duration::from_millis(delay * 1000 / 4);

        for percent in [0u8, 25, 50, 75] {
            if feedback.is_cancelled() {
                return Err(ProcessesError::DismissedTaskError(ctx.job_id.clone()));
            }
            feedback.progress(percent, "sleeping");
            std::thread::sleep(step);
        }
        feedback.progress(100, "done");

        let mut results = JobResults::new();
        results.insert("elapsed".to_string(), json!(delay));
        Ok(results)
    }
}

/// Write a file of `size` bytes into the job directory and publish it.
struct WriteFileProcess;

impl Process for WriteFileProcess {
    fn summary(&self) -> ProcessSummary {
        summary_of("write_file", "Write file", "Produce a downloadable file")
    }

    fn describe(&self, _project: Option<&str>) -> ProcessDescription {
        describe_with(
            self.summary(),
            json!({
                "name": {"title": "File name", "schema": {"type": "string"}},
                "size": {"title": "File size in bytes", "schema": {"type": "integer"}},
            }),
            json!({"file": {"title": "Produced file name", "schema": {"type": "string"}}}),
        )
    }

    fn execute(
        &self,
        request: &JobExecute,
        feedback: &Feedback,
        ctx: &JobContext,
    ) -> Result<JobResults, ProcessesError> {
        let name = string_input(request, "name")?;
        if name.contains('/') || name.contains("..") {
            return Err(ProcessesError::InputValueError("'name' must be a plain file name".into()));
        }
        let size = u64_input(request, "size", 1024)? as usize;

        let path = ctx.job_dir.join(&name);
        std::fs::write(&path, vec![0u8; size])
            .map_err(|err| ProcessesError::Internal(err.to_string()))?;
        ctx.publish(&path);
        ctx.log_line(&format!("wrote {name} ({size} bytes)"));

        feedback.progress(100, "done");
        let mut results = JobResults::new();
        results.insert("file".to_string(), Value::String(name));
        results.insert("length".to_string(), json!(size));
        Ok(results)
    }
}

#[cfg(test)]
#[path = "processes_tests.rs"]
mod tests;
