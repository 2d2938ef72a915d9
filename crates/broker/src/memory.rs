// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory broker and result store for tests.
//!
//! Single-process doubles with the same semantics as the Redis
//! implementation: priority bands with FIFO order, delayed messages,
//! control fan-out with reply queues, and TTL'd task metadata driven
//! by an injectable clock.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{mpsc, Notify};

use qjazz_core::JobId;

use crate::message::{ControlReply, ControlRequest, TaskMessage};
use crate::result::{TaskMeta, TaskState};
use crate::traits::{Broker, BrokerError, ResultBackend};

type NowFn = Arc<dyn Fn() -> u64 + Send + Sync>;

fn system_now() -> NowFn {
    Arc::new(|| {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    })
}

#[derive(Default)]
struct BrokerState {
    /// service → enqueued messages (insertion order)
    queues: HashMap<String, VecDeque<TaskMessage>>,
    /// control subscribers (shared channel)
    control: Vec<mpsc::Sender<ControlRequest>>,
    /// reply queue → pending replies
    replies: HashMap<String, VecDeque<ControlReply>>,
}

/// In-memory [`Broker`].
#[derive(Clone)]
pub struct MemoryBroker {
    state: Arc<Mutex<BrokerState>>,
    notify: Arc<Notify>,
    now: NowFn,
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(BrokerState::default())),
            notify: Arc::new(Notify::new()),
            now: system_now(),
        }
    }

    /// Use an injected time source (epoch seconds).
    pub fn with_now(now: impl Fn() -> u64 + Send + Sync + 'static) -> Self {
        Self { now: Arc::new(now), ..Self::new() }
    }

    /// Number of messages queued for a service (delayed included).
    pub fn queued(&self, service: &str) -> usize {
        self.state.lock().queues.get(service).map_or(0, VecDeque::len)
    }

    /// Pop the highest-priority deliverable message.
    fn pop_deliverable(&self, service: &str) -> Option<TaskMessage> {
        let now = (self.now)();
        let mut state = self.state.lock();
        let queue = state.queues.get_mut(service)?;

        let mut best: Option<(usize, u8)> = None;
        for (index, message) in queue.iter().enumerate() {
            if message.not_before.is_some_and(|eta| eta > now) {
                continue;
            }
            match best {
                Some((_, priority)) if message.priority <= priority => {}
                _ => best = Some((index, message.priority)),
            }
        }
        best.and_then(|(index, _)| queue.remove(index))
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn send_task(&self, service: &str, message: TaskMessage) -> Result<(), BrokerError> {
        self.state.lock().queues.entry(service.to_string()).or_default().push_back(message);
        self.notify.notify_waiters();
        Ok(())
    }

    async fn next_task(
        &self,
        service: &str,
        timeout: Duration,
    ) -> Result<Option<TaskMessage>, BrokerError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.notify.notified();
            if let Some(message) = self.pop_deliverable(service) {
                return Ok(Some(message));
            }
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            tokio::select! {
                _ = notified => {}
                _ = tokio::time::sleep(remaining) => return Ok(None),
            }
        }
    }

    async fn publish_control(&self, request: ControlRequest) -> Result<(), BrokerError> {
        let subscribers = self.state.lock().control.clone();
        for tx in subscribers {
            let _ = tx.send(request.clone()).await;
        }
        Ok(())
    }

    async fn collect_replies(
        &self,
        reply_to: &str,
        deadline: Duration,
        expected: usize,
    ) -> Result<Vec<ControlReply>, BrokerError> {
        let until = tokio::time::Instant::now() + deadline;
        let mut replies = Vec::new();
        loop {
            let notified = self.notify.notified();
            {
                let mut state = self.state.lock();
                if let Some(queue) = state.replies.get_mut(reply_to) {
                    while replies.len() < expected {
                        match queue.pop_front() {
                            Some(reply) => replies.push(reply),
                            None => break,
                        }
                    }
                }
            }
            if replies.len() >= expected {
                break;
            }
            let remaining = until.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                break;
            }
            tokio::select! {
                _ = notified => {}
                _ = tokio::time::sleep(remaining) => break,
            }
        }
        self.state.lock().replies.remove(reply_to);
        Ok(replies)
    }

    async fn listen_control(&self) -> Result<mpsc::Receiver<ControlRequest>, BrokerError> {
        let (tx, rx) = mpsc::channel(64);
        self.state.lock().control.push(tx);
        Ok(rx)
    }

    async fn send_reply(&self, reply_to: &str, reply: ControlReply) -> Result<(), BrokerError> {
        self.state
            .lock()
            .replies
            .entry(reply_to.to_string())
            .or_default()
            .push_back(reply);
        self.notify.notify_waiters();
        Ok(())
    }
}

/// In-memory [`ResultBackend`] with clock-driven TTL.
#[derive(Clone)]
pub struct MemoryResultStore {
    state: Arc<Mutex<HashMap<JobId, (TaskMeta, u64)>>>,
    now: NowFn,
}

impl Default for MemoryResultStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self { state: Arc::new(Mutex::new(HashMap::new())), now: system_now() }
    }

    pub fn with_now(now: impl Fn() -> u64 + Send + Sync + 'static) -> Self {
        Self { state: Arc::new(Mutex::new(HashMap::new())), now: Arc::new(now) }
    }
}

#[async_trait]
impl ResultBackend for MemoryResultStore {
    async fn get_task_meta(&self, job_id: &JobId) -> Result<TaskMeta, BrokerError> {
        let now = (self.now)();
        let mut state = self.state.lock();
        match state.get(job_id) {
            Some((_, expires_at)) if now >= *expires_at => {
                state.remove(job_id);
                Ok(TaskMeta::pending())
            }
            Some((meta, _)) => Ok(meta.clone()),
            None => Ok(TaskMeta::pending()),
        }
    }

    async fn set_task_meta(
        &self,
        job_id: &JobId,
        meta: TaskMeta,
        ttl: Duration,
    ) -> Result<(), BrokerError> {
        let expires_at = (self.now)() + ttl.as_secs().max(1);
        self.state.lock().insert(job_id.clone(), (meta, expires_at));
        Ok(())
    }

    async fn update_state(
        &self,
        job_id: &JobId,
        state: TaskState,
        result: Value,
        ttl: Duration,
    ) -> Result<(), BrokerError> {
        let mut meta = self.get_task_meta(job_id).await?;
        meta.status = state;
        meta.result = result;
        if state.is_terminal() {
            meta.date_done = Some((self.now)());
        }
        self.set_task_meta(job_id, meta, ttl).await
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
