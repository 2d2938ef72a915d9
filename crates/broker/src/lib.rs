// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! qjazz-broker: Message broker and result-store substrate.
//!
//! Defines the trait seams the executor and the workers program
//! against ([`Broker`], [`ResultBackend`]) together with the task and
//! control message shapes, a Redis implementation for deployment and
//! an in-memory implementation for tests.
//!
//! Queue layout: tasks travel on `qjazz.{service}` (one list per
//! priority band, FIFO within a band, plus a delayed set for
//! countdowns). Control and inspect commands fan out on a shared
//! channel with per-destination addressing; every worker pushes its
//! reply to a caller-owned reply queue that expires with the RPC
//! deadline.

pub mod message;
pub mod result;
pub mod traits;

mod redis;

#[cfg(any(test, feature = "test-support"))]
pub mod memory;

pub use message::{
    Command, ControlReply, ControlRequest, QueryTaskState, RunConfig, TaskKwargs, TaskMessage,
};
pub use self::redis::{RedisBroker, RedisResultStore};
pub use result::{ProgressUpdate, TaskMeta, TaskState};
pub use traits::{Broker, BrokerError, ResultBackend};

/// Queue name for a service.
pub fn task_queue(service: &str) -> String {
    format!("qjazz.{service}")
}

/// The single canonical task name.
pub const PROCESS_EXECUTE: &str = "process_execute";
