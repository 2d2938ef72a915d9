// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job runner: the code that actually drives a job function.
//!
//! Runs inside a child process (`qjazz-worker job-runner`): the parent
//! writes one [`RunnerInput`] JSON frame on stdin, the runner answers
//! with newline-delimited [`Frame`]s on stdout, progress frames while
//! the job function executes and then exactly one terminal frame.
//! Revocation is a SIGKILL on the child; no state to unwind.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use qjazz_broker::RunConfig;
use qjazz_core::{ErrorCode, JobId, JobResults};

use crate::context::JobContext;
use crate::processes::{Feedback, ProcessSet};

/// Everything a runner needs to execute one job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerInput {
    pub job_id: JobId,
    pub service: String,
    /// The job's private working directory (already created).
    pub job_dir: PathBuf,
    pub run_config: RunConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,
}

/// One line of runner output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    Progress {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        progress: Option<u8>,
        #[serde(default)]
        message: String,
    },
    Result {
        results: JobResults,
    },
    Error {
        code: ErrorCode,
        #[serde(default)]
        message: String,
    },
}

impl Frame {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Frame::Result { .. } | Frame::Error { .. })
    }
}

/// Execute one job function, emitting frames through `emit`.
///
/// Exactly one terminal frame is emitted, whatever happens.
pub fn run_job(
    input: &RunnerInput,
    set: &ProcessSet,
    emit: std::sync::Arc<dyn Fn(Frame) + Send + Sync>,
) {
    local_run(input, set, emit, Arc::new(AtomicBool::new(false)));
}

/// Like [`run_job`] with an externally-owned cancellation flag, for
/// in-process launchers where there is no child to kill.
pub fn local_run(
    input: &RunnerInput,
    set: &ProcessSet,
    emit: std::sync::Arc<dyn Fn(Frame) + Send + Sync>,
    cancel: Arc<AtomicBool>,
) {
    let ctx = JobContext::new(
        input.job_id.clone(),
        &input.service,
        input.job_dir.clone(),
        input.public_url.clone(),
    );

    let process = match set.get(&input.run_config.ident) {
        Some(process) => process,
        None => {
            emit(Frame::Error {
                code: ErrorCode::ProcessNotFound,
                message: input.run_config.ident.clone(),
            });
            return;
        }
    };

    let feedback = Feedback::with_cancel(
        {
            let emit = std::sync::Arc::clone(&emit);
            move |progress, message| {
                emit(Frame::Progress { progress, message: message.to_string() })
            }
        },
        cancel,
    );

    ctx.log_line(&format!("=== run {} ({})", input.run_config.ident, input.job_id));
    if let Some(rss) = resident_set_kb() {
        ctx.log_line(&format!("rss: {rss} kB"));
    }

    match process.execute(&input.run_config.request, &feedback, &ctx) {
        Ok(results) => {
            if let Err(err) = ctx.write_files_list() {
                ctx.log_line(&format!("failed to persist file list: {err}"));
            }
            emit(Frame::Result { results });
        }
        Err(err) => {
            ctx.log_line(&format!("error: {err}"));
            let code = err.code();
            let message = match code {
                // The dismissed marker carries the job id for the executor
                ErrorCode::Dismissed => input.job_id.to_string(),
                _ => err.to_string(),
            };
            emit(Frame::Error { code, message });
        }
    }
}

/// Resident set size in kB, when the platform exposes it.
fn resident_set_kb() -> Option<u64> {
    let statm = std::fs::read_to_string("/proc/self/statm").ok()?;
    let pages: u64 = statm.split_whitespace().nth(1)?.parse().ok()?;
    Some(pages * 4)
}

/// Child-process entry point for `qjazz-worker job-runner`.
///
/// Exit code 0 when a terminal frame was emitted; 2 when the input
/// frame could not be read.
pub fn child_main(set: &ProcessSet) -> i32 {
    let stdin = std::io::stdin();
    let mut line = String::new();
    if stdin.lock().read_line(&mut line).is_err() || line.trim().is_empty() {
        eprintln!("job-runner: missing input frame");
        return 2;
    }

    let input: RunnerInput = match serde_json::from_str(line.trim()) {
        Ok(input) => input,
        Err(err) => {
            eprintln!("job-runner: invalid input frame: {err}");
            return 2;
        }
    };

    // Job functions resolve relative paths against the job directory
    if let Err(err) = std::env::set_current_dir(&input.job_dir) {
        eprintln!("job-runner: cannot enter {}: {err}", input.job_dir.display());
        return 2;
    }

    let emit = std::sync::Arc::new(|frame: Frame| {
        if let Ok(raw) = serde_json::to_string(&frame) {
            let mut stdout = std::io::stdout().lock();
            let _ = writeln!(stdout, "{raw}");
            let _ = stdout.flush();
        }
    });

    run_job(&input, set, emit);
    0
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
