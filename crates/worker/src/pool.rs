// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded runner pool.
//!
//! Jobs execute on runner child processes spawned per job, bounded by
//! a semaphore. Revocation kills the runner (SIGKILL); the pool tracks
//! running jobs so control commands can address them. The launcher is
//! a seam: deployments spawn the `job-runner` child, tests run the job
//! function in-process.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use qjazz_core::JobId;

use crate::processes::ProcessSet;
use crate::runner::{Frame, RunnerInput};
use crate::WorkerError;

/// A job running on the pool.
pub struct Running {
    /// Progress and terminal frames; closes when the runner exits.
    pub frames: mpsc::Receiver<Frame>,
    kill: CancellationToken,
    _permit: OwnedSemaphorePermit,
}

impl Running {
    /// Kill handle for revocation.
    pub fn kill_token(&self) -> CancellationToken {
        self.kill.clone()
    }
}

/// Strategy for executing one runner.
#[async_trait]
pub trait Launcher: Send + Sync {
    async fn launch(
        &self,
        input: RunnerInput,
        frames: mpsc::Sender<Frame>,
        kill: CancellationToken,
    ) -> Result<(), WorkerError>;
}

/// Spawn the `qjazz-worker job-runner` child process.
pub struct ProcessLauncher;

#[async_trait]
impl Launcher for ProcessLauncher {
    async fn launch(
        &self,
        input: RunnerInput,
        frames: mpsc::Sender<Frame>,
        kill: CancellationToken,
    ) -> Result<(), WorkerError> {
        let exe = std::env::current_exe()?;
        let mut child = tokio::process::Command::new(exe)
            .arg("job-runner")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()?;

        let raw = serde_json::to_string(&input)?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(raw.as_bytes()).await?;
            stdin.write_all(b"\n").await?;
            // Closing stdin signals end of input
        }

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| WorkerError::Runner("runner stdout not captured".to_string()))?;

        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                tokio::select! {
                    _ = kill.cancelled() => {
                        warn!("Killing runner for {}", input.job_id);
                        let _ = child.start_kill();
                        break;
                    }
                    line = lines.next_line() => match line {
                        Ok(Some(line)) => {
                            match serde_json::from_str::<Frame>(&line) {
                                Ok(frame) => {
                                    if frames.send(frame).await.is_err() {
                                        break;
                                    }
                                }
                                Err(err) => warn!("Dropping malformed runner frame: {err}"),
                            }
                        }
                        Ok(None) => break,
                        Err(err) => {
                            error!("Runner stdout error: {err}");
                            break;
                        }
                    }
                }
            }
            match child.wait().await {
                Ok(status) if !status.success() => {
                    debug!("Runner for {} exited with {status}", input.job_id)
                }
                Err(err) => error!("Runner wait failed: {err}"),
                _ => {}
            }
        });
        Ok(())
    }
}

/// Run the job function in-process (tests and single-binary demos).
pub struct LocalLauncher {
    set: ProcessSet,
}

impl LocalLauncher {
    pub fn new(set: ProcessSet) -> Self {
        Self { set }
    }
}

#[async_trait]
impl Launcher for LocalLauncher {
    async fn launch(
        &self,
        input: RunnerInput,
        frames: mpsc::Sender<Frame>,
        kill: CancellationToken,
    ) -> Result<(), WorkerError> {
        let set = self.set.clone();
        let cancel_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));

        {
            let cancel_flag = Arc::clone(&cancel_flag);
            let kill = kill.clone();
            tokio::spawn(async move {
                kill.cancelled().await;
                cancel_flag.store(true, std::sync::atomic::Ordering::Relaxed);
            });
        }

        tokio::task::spawn_blocking(move || {
            let emit: Arc<dyn Fn(Frame) + Send + Sync> = Arc::new(move |frame| {
                // Drop frames after the kill rather than block forever
                let _ = frames.try_send(frame);
            });
            crate::runner::local_run(&input, &set, emit, cancel_flag);
        });
        Ok(())
    }
}

/// The bounded pool.
pub struct Pool {
    launcher: Arc<dyn Launcher>,
    slots: Arc<Semaphore>,
    running: Arc<Mutex<HashMap<JobId, CancellationToken>>>,
}

impl Pool {
    pub fn new(launcher: Arc<dyn Launcher>, concurrency: usize) -> Self {
        Self {
            launcher,
            slots: Arc::new(Semaphore::new(concurrency.max(1))),
            running: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Launch a job, waiting for a free slot.
    pub async fn spawn(&self, input: RunnerInput) -> Result<Running, WorkerError> {
        let permit = Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .map_err(|_| WorkerError::Runner("pool closed".to_string()))?;

        let (tx, rx) = mpsc::channel(64);
        let kill = CancellationToken::new();
        let job_id = input.job_id.clone();

        self.launcher.launch(input, tx, kill.clone()).await?;
        self.running.lock().insert(job_id, kill.clone());

        Ok(Running { frames: rx, kill, _permit: permit })
    }

    /// Forget a finished job.
    pub fn finished(&self, job_id: &JobId) {
        self.running.lock().remove(job_id);
    }

    /// Kill a running job. Returns false when the job is not here.
    pub fn kill(&self, job_id: &JobId) -> bool {
        match self.running.lock().get(job_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self, job_id: &JobId) -> bool {
        self.running.lock().contains_key(job_id)
    }

    /// Recycle the pool. Runners are spawned per job, so running jobs
    /// drain on their own and the next spawn picks up reloaded
    /// process descriptions; nothing persistent to tear down.
    pub fn restart(&self) {
        debug!("Pool restart: {} active runners draining", self.running.lock().len());
    }
}
