// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The worker daemon.
//!
//! One broker consumer per worker process; jobs are dispatched to the
//! runner pool and publish their lifecycle to the result store. The
//! control plane (presence, descriptions, logs, files, revocation,
//! cleanup) is served concurrently from the shared control channel.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use qjazz_broker::{
    Broker, Command, ControlReply, ControlRequest, ProgressUpdate, QueryTaskState, ResultBackend,
    TaskMessage, TaskMeta, TaskState,
};
use qjazz_core::{
    ErrorCode, FailureInfo, JobId, Link, ProcessFiles, ProcessLog, Subscriber, WorkerPresence,
};
use qjazz_registry::Registry;

use crate::cache::DescriptionCache;
use crate::callbacks::Callbacks;
use crate::cleanup::cleanup_expired_jobs;
use crate::config::WorkerConfig;
use crate::context::{expire_sentinel, job_dir, FILE_LINKS, FILES_LIST, PROCESSING_LOG};
use crate::pool::{Launcher, Pool, Running};
use crate::runner::{Frame, RunnerInput};
use crate::storage::Storage;
use crate::WorkerError;

/// Minimum delay between two UPDATED writes for one job.
const PROGRESS_INTERVAL: Duration = Duration::from_millis(250);

/// At most this much log tail is returned by `job_log`.
const LOG_TAIL_LIMIT: usize = 64 * 1024;

/// Consumer poll slice.
const CONSUME_TIMEOUT: Duration = Duration::from_secs(1);

fn epoch_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Reference URL for a stored job resource. With no public URL the
/// `$public_url` placeholder is kept, to be substituted at read time.
pub fn store_reference_url(job_id: &JobId, resource: &str, public_url: Option<&str>) -> String {
    let base = public_url.unwrap_or("$public_url").trim_end_matches('/');
    format!("{base}/jobs/{job_id}/files/{resource}")
}

/// The worker daemon.
pub struct Worker {
    config: WorkerConfig,
    hostname: String,
    online_since: u64,
    broker: Arc<dyn Broker>,
    backend: Arc<dyn ResultBackend>,
    registry: Arc<dyn Registry>,
    pool: Pool,
    storage: Arc<dyn Storage>,
    callbacks: Callbacks,
    cache: Arc<dyn DescriptionCache>,
    /// Reservation table answering `query_task`.
    known: Mutex<HashMap<JobId, QueryTaskState>>,
    shutdown: CancellationToken,
}

impl Worker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: WorkerConfig,
        broker: Arc<dyn Broker>,
        backend: Arc<dyn ResultBackend>,
        registry: Arc<dyn Registry>,
        launcher: Arc<dyn Launcher>,
        storage: Arc<dyn Storage>,
        callbacks: Callbacks,
        cache: Arc<dyn DescriptionCache>,
    ) -> Self {
        let host = std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let hostname = format!("{}@{}.{}", config.worker.service_name, host, std::process::id());
        let concurrency = config.worker.concurrency;
        Self {
            config,
            hostname,
            online_since: epoch_now(),
            broker,
            backend,
            registry,
            pool: Pool::new(launcher, concurrency),
            storage,
            callbacks,
            cache,
            known: Mutex::new(HashMap::new()),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn service(&self) -> &str {
        &self.config.worker.service_name
    }

    fn workdir(&self) -> &Path {
        &self.config.worker.workdir
    }

    fn result_ttl(&self) -> Duration {
        Duration::from_secs(self.config.worker.result_expires)
    }

    /// Trigger a graceful shutdown.
    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run the daemon until shutdown.
    pub async fn run(self: Arc<Self>) -> Result<(), WorkerError> {
        std::fs::create_dir_all(self.workdir())?;
        self.cache.update().await?;

        let control = {
            let worker = Arc::clone(&self);
            let rx = self.broker.listen_control().await?;
            tokio::spawn(async move { worker.control_loop(rx).await })
        };

        let consumer = {
            let worker = Arc::clone(&self);
            tokio::spawn(async move { worker.consume_loop().await })
        };

        let cleaner = {
            let worker = Arc::clone(&self);
            tokio::spawn(async move { worker.cleanup_loop().await })
        };

        let watcher = self.config.worker.reload_monitor.clone().map(|path| {
            let worker = Arc::clone(&self);
            tokio::spawn(async move { worker.watch_loop(path).await })
        });

        info!("Worker {} online for service '{}'", self.hostname, self.service());
        self.shutdown.cancelled().await;
        info!("Worker {} shutting down", self.hostname);

        // Bounded drain: loops exit on the same token
        let deadline = Duration::from_secs(5);
        let _ = tokio::time::timeout(deadline, async {
            let _ = control.await;
            let _ = consumer.await;
            let _ = cleaner.await;
            if let Some(watcher) = watcher {
                let _ = watcher.await;
            }
        })
        .await;
        Ok(())
    }

    //
    // Consumer
    //

    async fn consume_loop(self: Arc<Self>) {
        loop {
            if self.shutdown.is_cancelled() {
                break;
            }
            let message = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                message = self.broker.next_task(self.service(), CONSUME_TIMEOUT) => message,
            };
            match message {
                Ok(Some(message)) => {
                    if message.is_expired(epoch_now()) {
                        debug!("Dropping expired message {}", message.id);
                        continue;
                    }
                    self.known.lock().insert(message.id.clone(), QueryTaskState::Reserved);
                    let worker = Arc::clone(&self);
                    tokio::spawn(async move { worker.handle_task(message).await });
                }
                Ok(None) => {}
                Err(err) => {
                    error!("Consumer error: {err}");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }

    async fn handle_task(self: Arc<Self>, message: TaskMessage) {
        let job_id = message.id.clone();
        if let Err(err) = self.run_task(&message).await {
            error!("Task {job_id} failed internally: {err}");
            let failure = FailureInfo::new(ErrorCode::Internal, err.to_string());
            self.write_state(&job_id, TaskState::Failure, &failure).await;
        }
        self.known.lock().remove(&job_id);
        self.pool.finished(&job_id);
    }

    async fn run_task(&self, message: &TaskMessage) -> Result<(), WorkerError> {
        let job_id = &message.id;
        let meta = &message.kwargs.meta;

        // before_start: a task dismissed while pending fails
        // immediately, with no side effects
        let registered = self.registry.find_job(job_id, None).await?;
        match registered {
            Some(info) if !info.dismissed => {}
            _ => {
                debug!("{job_id}: dismissed before start");
                let failure = FailureInfo::new(ErrorCode::Dismissed, job_id.to_string());
                self.write_state(job_id, TaskState::Failure, &failure).await;
                return Ok(());
            }
        }

        // Workdir and sentinel come before any long work so a crashed
        // job is reclaimable
        let dir = job_dir(self.workdir(), job_id);
        std::fs::create_dir_all(&dir)?;
        std::fs::write(dir.join(expire_sentinel(self.service())), b"")?;

        self.write_state(job_id, TaskState::Started, &json!({"started": epoch_now()})).await;

        let subscriber = message.kwargs.run_config.request.subscriber.clone();
        if let Some(uri) =
            subscriber.as_ref().and_then(|subscriber| subscriber.in_progress_uri.as_deref())
        {
            self.callbacks.in_progress(uri, job_id, meta).await;
        }

        let public_url = message
            .kwargs
            .context
            .get("public_url")
            .and_then(Value::as_str)
            .map(str::to_string);

        self.storage.before_create_process();
        let running = self
            .pool
            .spawn(RunnerInput {
                job_id: job_id.clone(),
                service: self.service().to_string(),
                job_dir: dir.clone(),
                run_config: message.kwargs.run_config.clone(),
                public_url,
            })
            .await?;
        self.known.lock().insert(job_id.clone(), QueryTaskState::Active);

        let outcome = self.pump_frames(job_id, running).await;

        match outcome {
            Some(Frame::Result { results }) => {
                self.finalize_success(message, &dir, results, subscriber.as_ref()).await?;
            }
            Some(Frame::Error { code, message: detail }) => {
                let failure = FailureInfo::new(code, detail);
                self.write_state(job_id, TaskState::Failure, &failure).await;
                if let Some(uri) =
                    subscriber.as_ref().and_then(|subscriber| subscriber.failed_uri.as_deref())
                {
                    self.callbacks.on_failure(uri, job_id, meta).await;
                }
            }
            Some(Frame::Progress { .. }) => {}
            None => {
                // Runner died without a terminal frame: revoked, or crashed
                let revoked = matches!(
                    self.known.lock().get(job_id),
                    Some(QueryTaskState::Revoked)
                );
                if revoked {
                    self.write_state(job_id, TaskState::Revoked, &Value::Null).await;
                } else {
                    let failure = FailureInfo::new(ErrorCode::Internal, "runner died");
                    self.write_state(job_id, TaskState::Failure, &failure).await;
                }
                if let Some(uri) =
                    subscriber.as_ref().and_then(|subscriber| subscriber.failed_uri.as_deref())
                {
                    self.callbacks.on_failure(uri, job_id, meta).await;
                }
            }
        }
        Ok(())
    }

    /// Forward runner frames to the result store, coalescing progress
    /// so at most one UPDATED lands per throttle interval. Progress is
    /// clamped non-decreasing. Returns the terminal frame, if any.
    async fn pump_frames(&self, job_id: &JobId, mut running: Running) -> Option<Frame> {
        let mut last_write = tokio::time::Instant::now() - PROGRESS_INTERVAL;
        let mut last_progress: Option<u8> = None;

        while let Some(frame) = running.frames.recv().await {
            match frame {
                Frame::Progress { progress, message } => {
                    let progress = match (progress, last_progress) {
                        (Some(new), Some(old)) => Some(new.max(old)),
                        (new, old) => new.or(old),
                    };
                    last_progress = progress;

                    if last_write.elapsed() >= PROGRESS_INTERVAL {
                        last_write = tokio::time::Instant::now();
                        let update =
                            ProgressUpdate { progress, message, updated: epoch_now() };
                        self.write_state(job_id, TaskState::Updated, &update).await;
                    }
                }
                terminal => return Some(terminal),
            }
        }
        None
    }

    async fn finalize_success(
        &self,
        message: &TaskMessage,
        dir: &Path,
        results: qjazz_core::JobResults,
        subscriber: Option<&Subscriber>,
    ) -> Result<(), WorkerError> {
        let job_id = &message.id;
        let meta = &message.kwargs.meta;

        // Move outputs to storage, then resolve download links
        let published = read_files_list(dir);
        self.storage.move_files(job_id, self.workdir(), &published)?;
        let links = build_links(job_id, dir, &published);
        std::fs::write(dir.join(FILE_LINKS), serde_json::to_string(&links)?)?;

        // Preserve kwargs so status composition keeps meta details
        let task_meta = TaskMeta {
            status: TaskState::Success,
            result: Value::Object(results.clone()),
            kwargs: Some(message.kwargs.clone()),
            date_done: Some(epoch_now()),
        };
        if let Err(err) = self.backend.set_task_meta(job_id, task_meta, self.result_ttl()).await {
            error!("Failed to store result for {job_id}: {err}");
        }

        if let Some(uri) = subscriber.and_then(|subscriber| subscriber.success_uri.as_deref()) {
            self.callbacks.on_success(uri, job_id, meta, &results).await;
        }
        Ok(())
    }

    async fn write_state(&self, job_id: &JobId, state: TaskState, result: &impl serde::Serialize) {
        let result = serde_json::to_value(result).unwrap_or(Value::Null);
        if let Err(err) =
            self.backend.update_state(job_id, state, result, self.result_ttl()).await
        {
            error!("Failed to write {state} state for {job_id}: {err}");
        }
    }

    //
    // Control plane
    //

    async fn control_loop(self: Arc<Self>, mut rx: tokio::sync::mpsc::Receiver<ControlRequest>) {
        loop {
            let request = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                request = rx.recv() => match request {
                    Some(request) => request,
                    None => break,
                },
            };
            if !request.addresses(&self.hostname) || request.expires_at < epoch_now() {
                continue;
            }
            let payload = self.serve(&request.command).await;
            let reply = ControlReply::new(self.hostname.clone(), payload);
            if let Err(err) = self.broker.send_reply(&request.reply_to, reply).await {
                warn!("Failed to reply to {}: {err}", request.id);
            }
        }
    }

    async fn serve(&self, command: &Command) -> Value {
        match command {
            Command::Presence => serde_json::to_value(self.presence()).unwrap_or(Value::Null),
            Command::Ping => json!({"pong": self.hostname}),
            Command::ListProcesses => {
                serde_json::to_value(self.cache.processes()).unwrap_or(Value::Null)
            }
            Command::DescribeProcess { ident, project_path } => {
                match self.cache.describe(ident, project_path.as_deref()).await {
                    Ok(Some(description)) => {
                        serde_json::to_value(description).unwrap_or(Value::Null)
                    }
                    Ok(None) => Value::Null,
                    Err(err) => json!({"error": err.to_string()}),
                }
            }
            Command::JobLog { job_id } => {
                serde_json::to_value(self.job_log(job_id)).unwrap_or(Value::Null)
            }
            Command::JobFiles { job_id, public_url } => {
                serde_json::to_value(self.job_files(job_id, public_url.as_deref()))
                    .unwrap_or(Value::Null)
            }
            Command::DownloadUrl { job_id, resource, expiration } => {
                match self.storage.download_url(job_id, resource, self.workdir(), *expiration) {
                    Ok(Some(link)) => serde_json::to_value(link).unwrap_or(Value::Null),
                    Ok(None) => Value::Null,
                    Err(err) => {
                        error!("download_url failed for {job_id}: {err}");
                        Value::Null
                    }
                }
            }
            Command::QueryTask { job_id } => match self.known.lock().get(job_id) {
                Some(state) => json!({"state": state}),
                None => json!({}),
            },
            Command::Revoke { job_id } => {
                info!("{job_id}: revoke requested");
                self.known.lock().insert(job_id.clone(), QueryTaskState::Revoked);
                if !self.pool.kill(job_id) {
                    // Not running here: mark revoked so a reserved
                    // message fails in before_start
                    self.write_state(job_id, TaskState::Revoked, &Value::Null).await;
                }
                json!({"ok": true})
            }
            Command::Cleanup => {
                cleanup_expired_jobs(
                    &self.registry,
                    &self.storage,
                    self.workdir(),
                    self.service(),
                )
                .await;
                json!({"ok": true})
            }
            Command::ReloadProcessesCache => match self.cache.update().await {
                Ok(summaries) => {
                    self.pool.restart();
                    json!({"reloaded": summaries.len()})
                }
                Err(err) => json!({"error": err.to_string()}),
            },
            Command::RestartPool => {
                self.pool.restart();
                json!({"ok": true})
            }
            Command::Shutdown => {
                self.shutdown.cancel();
                json!({"ok": true})
            }
        }
    }

    fn presence(&self) -> WorkerPresence {
        let versions = if self.config.worker.hide_presence_versions {
            Vec::new()
        } else {
            vec![
                format!("qjazz-worker {}", env!("CARGO_PKG_VERSION")),
                format!("{} {}", std::env::consts::OS, std::env::consts::ARCH),
            ]
        };
        WorkerPresence {
            service: self.service().to_string(),
            title: self.config.worker.title.clone(),
            description: self.config.worker.description.clone(),
            links: Vec::new(),
            online_since: self.online_since,
            versions,
            result_expires: self.config.worker.result_expires,
            callbacks: self.callbacks.schemes(),
            entrypoint: Some(self.hostname.clone()),
        }
    }

    fn job_log(&self, job_id: &JobId) -> ProcessLog {
        let path = job_dir(self.workdir(), job_id).join(PROCESSING_LOG);
        let log = match std::fs::read_to_string(&path) {
            Ok(text) => {
                // Keep only the tail of large logs
                if text.len() > LOG_TAIL_LIMIT {
                    let cut = text.len() - LOG_TAIL_LIMIT;
                    let start = text
                        .char_indices()
                        .map(|(index, _)| index)
                        .find(|index| *index >= cut)
                        .unwrap_or(0);
                    text[start..].to_string()
                } else {
                    text
                }
            }
            Err(_) => "No log available".to_string(),
        };
        ProcessLog { timestamp: epoch_now(), log }
    }

    fn job_files(&self, job_id: &JobId, public_url: Option<&str>) -> ProcessFiles {
        let path = job_dir(self.workdir(), job_id).join(FILE_LINKS);
        let links: Vec<Link> = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_default(),
            Err(_) => Vec::new(),
        };

        // Re-anchor hrefs on the caller's public URL
        let links = links
            .into_iter()
            .map(|link| {
                let href = match &link.title {
                    Some(title) => store_reference_url(job_id, title, public_url),
                    None => link.href.clone(),
                };
                Link { href, ..link }
            })
            .collect();
        ProcessFiles { links }
    }

    //
    // Periodic tasks
    //

    async fn cleanup_loop(self: Arc<Self>) {
        let interval = self.config.cleanup_interval();
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = tokio::time::sleep(interval) => {
                    cleanup_expired_jobs(
                        &self.registry,
                        &self.storage,
                        self.workdir(),
                        self.service(),
                    )
                    .await;
                }
            }
        }
    }

    /// Watch a file for mtime changes; reload on trigger.
    async fn watch_loop(self: Arc<Self>, path: PathBuf) {
        let mut last = mtime_of(&path);
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = tokio::time::sleep(Duration::from_secs(5)) => {
                    let current = mtime_of(&path);
                    if current != last {
                        info!("Reload triggered by {}", path.display());
                        last = current;
                        if let Err(err) = self.cache.update().await {
                            error!("Processes reload failed: {err}");
                        }
                        self.pool.restart();
                    }
                }
            }
        }
    }
}

fn mtime_of(path: &Path) -> Option<std::time::SystemTime> {
    std::fs::metadata(path).and_then(|meta| meta.modified()).ok()
}

/// Read the published-files list persisted by the runner.
fn read_files_list(dir: &Path) -> Vec<PathBuf> {
    match std::fs::read_to_string(dir.join(FILES_LIST)) {
        Ok(raw) => raw
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(PathBuf::from)
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// Download links for published files, with the `$public_url`
/// placeholder as href base. Files outside the job directory are
/// dropped: there is no way to serve them.
fn build_links(job_id: &JobId, dir: &Path, published: &[PathBuf]) -> Vec<Link> {
    published
        .iter()
        .filter_map(|path| {
            let name = path.strip_prefix(dir).ok()?.to_string_lossy().to_string();
            let size = path.metadata().ok()?.len();
            let mime = mime_guess::from_path(path)
                .first_raw()
                .unwrap_or("application/octet-stream");
            let mut link = Link::new(store_reference_url(job_id, &name, None))
                .title(name)
                .length(size);
            link.mime_type = Some(mime.to_string());
            Some(link)
        })
        .collect()
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
