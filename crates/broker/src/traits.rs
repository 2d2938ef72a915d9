// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Trait seams for the broker and the result store.
//!
//! The executor and the workers only ever see these traits; the Redis
//! implementation backs deployments and the in-memory one backs tests.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use qjazz_core::JobId;

use crate::message::{ControlReply, ControlRequest, TaskMessage};
use crate::result::{TaskMeta, TaskState};

/// Errors from the broker substrate.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("Broker I/O error: {0}")]
    Io(String),

    #[error("Malformed message: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("Broker connection lost")]
    Disconnected,
}

impl From<::redis::RedisError> for BrokerError {
    fn from(err: ::redis::RedisError) -> Self {
        BrokerError::Io(err.to_string())
    }
}

/// Message broker: FIFO task queues plus control fan-out with
/// per-worker replies.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Publish a task on the service queue.
    async fn send_task(&self, service: &str, message: TaskMessage) -> Result<(), BrokerError>;

    /// Pop the next deliverable task for the service, waiting up to
    /// `timeout`. Honors priority bands and delayed messages; does NOT
    /// filter expired messages (the consumer drops those on dequeue).
    async fn next_task(
        &self,
        service: &str,
        timeout: Duration,
    ) -> Result<Option<TaskMessage>, BrokerError>;

    /// Publish a control request on the shared control channel.
    /// Every worker receives it; addressing is by destination filter.
    async fn publish_control(&self, request: ControlRequest) -> Result<(), BrokerError>;

    /// Collect replies from a reply queue until `deadline` elapses or
    /// `expected` replies arrived. Replies pushed later expire with
    /// the queue.
    async fn collect_replies(
        &self,
        reply_to: &str,
        deadline: Duration,
        expected: usize,
    ) -> Result<Vec<ControlReply>, BrokerError>;

    /// Subscribe to the shared control channel. Every published
    /// control request is delivered to the returned channel, including
    /// requests addressed to other workers (the consumer filters on
    /// destination).
    async fn listen_control(&self) -> Result<mpsc::Receiver<ControlRequest>, BrokerError>;

    /// Push a reply to a caller's reply queue.
    async fn send_reply(&self, reply_to: &str, reply: ControlReply) -> Result<(), BrokerError>;
}

/// Result store: typed task states with TTL.
#[async_trait]
pub trait ResultBackend: Send + Sync {
    /// Read task metadata; unknown ids read back as `Pending`.
    async fn get_task_meta(&self, job_id: &JobId) -> Result<TaskMeta, BrokerError>;

    /// Write a task state. `ttl` bounds the record lifetime; terminal
    /// states should carry `date_done`.
    async fn set_task_meta(
        &self,
        job_id: &JobId,
        meta: TaskMeta,
        ttl: Duration,
    ) -> Result<(), BrokerError>;

    /// Convenience for progress updates: writes `Updated` with the
    /// given result payload, preserving stored kwargs.
    async fn update_state(
        &self,
        job_id: &JobId,
        state: TaskState,
        result: Value,
        ttl: Duration,
    ) -> Result<(), BrokerError>;
}
