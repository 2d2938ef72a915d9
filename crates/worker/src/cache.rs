// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process description cache.
//!
//! Descriptor catalogues can be heavyweight to compute, so a dedicated
//! child process (`qjazz-worker describe-cache`) owns them; the worker
//! talks to it over a duplex JSON-line pipe with three message kinds:
//! `ready` (handshake), `update` (recompute summaries) and `describe`
//! (full description). Summaries and descriptions are memoized on the
//! worker side; a reload clears the memo and is followed by a pool
//! restart.

use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout};
use tracing::{error, info};

use qjazz_core::{ProcessDescription, ProcessSummary};

use crate::processes::ProcessSet;
use crate::WorkerError;

/// Pipe poll deadline.
const POLL_TIMEOUT: Duration = Duration::from_secs(5);

/// Handshake deadline at startup.
const READY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "msg", rename_all = "snake_case")]
pub enum CacheRequest {
    Ready,
    Update,
    Describe {
        ident: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        project: Option<String>,
    },
    Quit,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "msg", rename_all = "snake_case")]
pub enum CacheResponse {
    Ready,
    Summaries { processes: Vec<ProcessSummary> },
    Description { description: Option<ProcessDescription> },
}

/// Worker-side view of the description catalogue.
#[async_trait]
pub trait DescriptionCache: Send + Sync {
    /// Recompute the summary list; clears memoized descriptions.
    async fn update(&self) -> Result<Vec<ProcessSummary>, WorkerError>;

    /// Full description for one process; `None` for unknown idents.
    async fn describe(
        &self,
        ident: &str,
        project: Option<&str>,
    ) -> Result<Option<ProcessDescription>, WorkerError>;

    /// Last computed summaries.
    fn processes(&self) -> Vec<ProcessSummary>;
}

#[derive(Default)]
struct Memo {
    summaries: Vec<ProcessSummary>,
    descriptions: HashMap<String, ProcessDescription>,
}

fn memo_key(ident: &str, project: Option<&str>) -> String {
    format!("{ident}@{}", project.unwrap_or(""))
}

/// In-process cache for tests and single-binary demos.
pub struct LocalCache {
    set: ProcessSet,
    memo: Mutex<Memo>,
}

impl LocalCache {
    pub fn new(set: ProcessSet) -> Self {
        Self { set, memo: Mutex::new(Memo::default()) }
    }
}

#[async_trait]
impl DescriptionCache for LocalCache {
    async fn update(&self) -> Result<Vec<ProcessSummary>, WorkerError> {
        let summaries = self.set.summaries();
        let mut memo = self.memo.lock();
        memo.summaries = summaries.clone();
        memo.descriptions.clear();
        Ok(summaries)
    }

    async fn describe(
        &self,
        ident: &str,
        project: Option<&str>,
    ) -> Result<Option<ProcessDescription>, WorkerError> {
        let key = memo_key(ident, project);
        if let Some(description) = self.memo.lock().descriptions.get(&key) {
            return Ok(Some(description.clone()));
        }
        match self.set.get(ident) {
            Some(process) => {
                let description = process.describe(project);
                self.memo.lock().descriptions.insert(key, description.clone());
                Ok(Some(description))
            }
            None => Ok(None),
        }
    }

    fn processes(&self) -> Vec<ProcessSummary> {
        self.memo.lock().summaries.clone()
    }
}

struct Pipe {
    stdin: ChildStdin,
    lines: Lines<BufReader<ChildStdout>>,
}

impl Pipe {
    /// One request/response round trip. The pipe carries a single
    /// outstanding request at a time.
    async fn round_trip(
        &mut self,
        request: &CacheRequest,
        deadline: Duration,
    ) -> Result<CacheResponse, WorkerError> {
        let raw = serde_json::to_string(request)?;
        self.stdin.write_all(raw.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;

        let line = tokio::time::timeout(deadline, self.lines.next_line())
            .await
            .map_err(|_| WorkerError::Runner("description cache timed out".to_string()))??
            .ok_or_else(|| WorkerError::Runner("description cache closed".to_string()))?;
        Ok(serde_json::from_str(&line)?)
    }
}

/// Cache served by the `describe-cache` child process.
pub struct ChildCache {
    pipe: tokio::sync::Mutex<Pipe>,
    memo: Mutex<Memo>,
    child: Mutex<Option<Child>>,
}

impl ChildCache {
    /// Spawn the child and complete the ready handshake.
    pub async fn start() -> Result<Self, WorkerError> {
        let exe = std::env::current_exe()?;
        let mut child = tokio::process::Command::new(exe)
            .arg("describe-cache")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| WorkerError::Runner("cache stdin not captured".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| WorkerError::Runner("cache stdout not captured".to_string()))?;

        let mut pipe = Pipe { stdin, lines: BufReader::new(stdout).lines() };
        match pipe.round_trip(&CacheRequest::Ready, READY_TIMEOUT).await? {
            CacheResponse::Ready => info!("Process cache ready"),
            other => {
                return Err(WorkerError::Runner(format!(
                    "unexpected cache handshake: {other:?}"
                )))
            }
        }

        Ok(Self {
            pipe: tokio::sync::Mutex::new(pipe),
            memo: Mutex::new(Memo::default()),
            child: Mutex::new(Some(child)),
        })
    }

    /// Ask the child to quit.
    pub async fn stop(&self) {
        let mut pipe = self.pipe.lock().await;
        let raw = match serde_json::to_string(&CacheRequest::Quit) {
            Ok(raw) => raw,
            Err(_) => return,
        };
        let _ = pipe.stdin.write_all(raw.as_bytes()).await;
        let _ = pipe.stdin.write_all(b"\n").await;
        let _ = pipe.stdin.flush().await;

        if let Some(mut child) = self.child.lock().take() {
            tokio::spawn(async move {
                if tokio::time::timeout(Duration::from_secs(5), child.wait()).await.is_err() {
                    error!("Failed to terminate cache process");
                    let _ = child.start_kill();
                }
            });
        }
    }
}

#[async_trait]
impl DescriptionCache for ChildCache {
    async fn update(&self) -> Result<Vec<ProcessSummary>, WorkerError> {
        info!("Updating processes cache");
        let mut pipe = self.pipe.lock().await;
        match pipe.round_trip(&CacheRequest::Update, POLL_TIMEOUT).await? {
            CacheResponse::Summaries { processes } => {
                let mut memo = self.memo.lock();
                memo.summaries = processes.clone();
                memo.descriptions.clear();
                Ok(processes)
            }
            other => Err(WorkerError::Runner(format!("unexpected cache reply: {other:?}"))),
        }
    }

    async fn describe(
        &self,
        ident: &str,
        project: Option<&str>,
    ) -> Result<Option<ProcessDescription>, WorkerError> {
        let key = memo_key(ident, project);
        if let Some(description) = self.memo.lock().descriptions.get(&key) {
            return Ok(Some(description.clone()));
        }

        let mut pipe = self.pipe.lock().await;
        let request = CacheRequest::Describe {
            ident: ident.to_string(),
            project: project.map(str::to_string),
        };
        match pipe.round_trip(&request, POLL_TIMEOUT).await? {
            CacheResponse::Description { description } => {
                if let Some(description) = &description {
                    self.memo.lock().descriptions.insert(key, description.clone());
                }
                Ok(description)
            }
            other => Err(WorkerError::Runner(format!("unexpected cache reply: {other:?}"))),
        }
    }

    fn processes(&self) -> Vec<ProcessSummary> {
        self.memo.lock().summaries.clone()
    }
}

/// Child-process entry point for `qjazz-worker describe-cache`.
pub fn child_main(set: &ProcessSet) -> i32 {
    use std::io::{BufRead, Write};

    info!("Starting process cache");
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }
        let request: CacheRequest = match serde_json::from_str(&line) {
            Ok(request) => request,
            Err(err) => {
                error!("Cache error: {err}");
                continue;
            }
        };

        let response = match request {
            CacheRequest::Quit => break,
            CacheRequest::Ready => CacheResponse::Ready,
            CacheRequest::Update => CacheResponse::Summaries { processes: set.summaries() },
            CacheRequest::Describe { ident, project } => CacheResponse::Description {
                description: set.get(&ident).map(|p| p.describe(project.as_deref())),
            },
        };

        match serde_json::to_string(&response) {
            Ok(raw) => {
                if writeln!(stdout, "{raw}").and_then(|()| stdout.flush()).is_err() {
                    break;
                }
            }
            Err(err) => error!("Cache error: {err}"),
        }
    }
    info!("Leaving process cache");
    0
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
