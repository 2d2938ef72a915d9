// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Redis implementation of the broker and result-store seams.
//!
//! Tasks: one list per priority band (`qjazz.{service}`,
//! `qjazz.{service}.p{1..9}`) consumed with BRPOP so each band stays
//! FIFO, plus a sorted set `qjazz.{service}.delayed` holding countdown
//! messages scored by their delivery time.
//!
//! Control: shared pub/sub channel `qjazz.control` with per-request
//! destination addressing; replies are LPUSHed to the caller's reply
//! list which carries a TTL so abandoned RPCs clean up after their
//! own deadline.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use ::redis::AsyncCommands;
use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use qjazz_core::JobId;

use crate::message::{ControlReply, ControlRequest, TaskMessage};
use crate::result::{TaskMeta, TaskState};
use crate::traits::{Broker, BrokerError, ResultBackend};

/// Highest priority band.
const MAX_PRIORITY: u8 = 9;

/// How many delayed messages are promoted per poll.
const DELAYED_BATCH: isize = 16;

fn epoch_now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

fn band_key(service: &str, priority: u8) -> String {
    if priority == 0 {
        crate::task_queue(service)
    } else {
        format!("{}.p{}", crate::task_queue(service), priority.min(MAX_PRIORITY))
    }
}

fn delayed_key(service: &str) -> String {
    format!("{}.delayed", crate::task_queue(service))
}

/// Shared control channel; addressing is by destination filter.
const CONTROL_CHANNEL: &str = "qjazz.control";

fn task_meta_key(job_id: &JobId) -> String {
    format!("qjazz-task-meta-{job_id}")
}

/// Redis-backed [`Broker`].
#[derive(Clone)]
pub struct RedisBroker {
    client: ::redis::Client,
    manager: ::redis::aio::ConnectionManager,
}

impl RedisBroker {
    /// Connect to the broker at the given Redis URL.
    pub async fn connect(url: &str) -> Result<Self, BrokerError> {
        let client = ::redis::Client::open(url).map_err(BrokerError::from)?;
        let manager = client.get_connection_manager().await.map_err(BrokerError::from)?;
        Ok(Self { client, manager })
    }

    /// Promote delayed messages whose delivery time has passed.
    async fn promote_delayed(&self, service: &str) -> Result<(), BrokerError> {
        let mut con = self.manager.clone();
        let key = delayed_key(service);
        let now = epoch_now();

        let due: Vec<String> = ::redis::cmd("ZRANGEBYSCORE")
            .arg(&key)
            .arg("-inf")
            .arg(now)
            .arg("LIMIT")
            .arg(0)
            .arg(DELAYED_BATCH)
            .query_async(&mut con)
            .await?;

        for raw in due {
            // ZREM returns 0 when another consumer already claimed it
            let removed: u32 = con.zrem(&key, &raw).await?;
            if removed == 0 {
                continue;
            }
            match serde_json::from_str::<TaskMessage>(&raw) {
                Ok(message) => {
                    let band = band_key(service, message.priority);
                    let _: () = con.lpush(band, raw).await?;
                }
                Err(err) => warn!("Dropping malformed delayed message: {err}"),
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Broker for RedisBroker {
    async fn send_task(&self, service: &str, message: TaskMessage) -> Result<(), BrokerError> {
        let mut con = self.manager.clone();
        let raw = serde_json::to_string(&message)?;

        if message.not_before.is_some_and(|eta| eta > epoch_now()) {
            let score = message.not_before.unwrap_or(0);
            let _: () = con.zadd(delayed_key(service), raw, score).await?;
        } else {
            let _: () = con.lpush(band_key(service, message.priority), raw).await?;
        }
        Ok(())
    }

    async fn next_task(
        &self,
        service: &str,
        timeout: Duration,
    ) -> Result<Option<TaskMessage>, BrokerError> {
        self.promote_delayed(service).await?;

        // Highest band first; within a band BRPOP keeps FIFO order
        let keys: Vec<String> =
            (0..=MAX_PRIORITY).rev().map(|p| band_key(service, p)).collect();

        let mut con = self.manager.clone();
        let popped: Option<(String, String)> =
            con.brpop(keys, timeout.as_secs_f64().max(0.1)).await?;

        match popped {
            Some((_, raw)) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn publish_control(&self, request: ControlRequest) -> Result<(), BrokerError> {
        let mut con = self.manager.clone();
        let raw = serde_json::to_string(&request)?;
        let _: () = con.publish(CONTROL_CHANNEL, raw).await?;
        Ok(())
    }

    async fn collect_replies(
        &self,
        reply_to: &str,
        deadline: Duration,
        expected: usize,
    ) -> Result<Vec<ControlReply>, BrokerError> {
        let mut con = self.manager.clone();
        let mut replies = Vec::new();
        let start = tokio::time::Instant::now();

        while replies.len() < expected {
            let remaining = deadline.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                break;
            }
            let popped: Option<(String, String)> =
                con.brpop(reply_to, remaining.as_secs_f64().max(0.1)).await?;
            match popped {
                Some((_, raw)) => match serde_json::from_str::<ControlReply>(&raw) {
                    Ok(reply) => replies.push(reply),
                    Err(err) => warn!("Dropping malformed control reply: {err}"),
                },
                None => break,
            }
        }

        let _: () = con.del(reply_to).await?;
        Ok(replies)
    }

    async fn listen_control(&self) -> Result<mpsc::Receiver<ControlRequest>, BrokerError> {
        let mut pubsub = self.client.get_async_pubsub().await.map_err(BrokerError::from)?;
        pubsub.subscribe(CONTROL_CHANNEL).await.map_err(BrokerError::from)?;

        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(async move {
            let mut stream = pubsub.on_message();
            while let Some(msg) = stream.next().await {
                let raw: String = match msg.get_payload() {
                    Ok(raw) => raw,
                    Err(err) => {
                        warn!("Control payload decode failed: {err}");
                        continue;
                    }
                };
                match serde_json::from_str::<ControlRequest>(&raw) {
                    Ok(request) => {
                        if tx.send(request).await.is_err() {
                            break; // consumer gone
                        }
                    }
                    Err(err) => warn!("Dropping malformed control request: {err}"),
                }
            }
            debug!("Control subscription closed");
        });
        Ok(rx)
    }

    async fn send_reply(&self, reply_to: &str, reply: ControlReply) -> Result<(), BrokerError> {
        let mut con = self.manager.clone();
        let raw = serde_json::to_string(&reply)?;
        let _: () = con.lpush(reply_to, raw).await?;
        // Reply queues must not outlive an abandoned caller
        let _: () = con.expire(reply_to, 60).await?;
        Ok(())
    }
}

/// Redis-backed [`ResultBackend`].
#[derive(Clone)]
pub struct RedisResultStore {
    manager: ::redis::aio::ConnectionManager,
}

impl RedisResultStore {
    pub async fn connect(url: &str) -> Result<Self, BrokerError> {
        let client = ::redis::Client::open(url).map_err(BrokerError::from)?;
        let manager = client.get_connection_manager().await.map_err(BrokerError::from)?;
        Ok(Self { manager })
    }

    /// Share the connection of an existing broker.
    pub fn from_broker(broker: &RedisBroker) -> Self {
        Self { manager: broker.manager.clone() }
    }
}

#[async_trait]
impl ResultBackend for RedisResultStore {
    async fn get_task_meta(&self, job_id: &JobId) -> Result<TaskMeta, BrokerError> {
        let mut con = self.manager.clone();
        let raw: Option<String> = con.get(task_meta_key(job_id)).await?;
        match raw {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(TaskMeta::pending()),
        }
    }

    async fn set_task_meta(
        &self,
        job_id: &JobId,
        meta: TaskMeta,
        ttl: Duration,
    ) -> Result<(), BrokerError> {
        let mut con = self.manager.clone();
        let raw = serde_json::to_string(&meta)?;
        let _: () = con.set_ex(task_meta_key(job_id), raw, ttl.as_secs().max(1)).await?;
        Ok(())
    }

    async fn update_state(
        &self,
        job_id: &JobId,
        state: TaskState,
        result: Value,
        ttl: Duration,
    ) -> Result<(), BrokerError> {
        let mut current = self.get_task_meta(job_id).await?;
        current.status = state;
        current.result = result;
        if state.is_terminal() {
            current.date_done = Some(epoch_now());
        }
        self.set_task_meta(job_id, current, ttl).await
    }
}
