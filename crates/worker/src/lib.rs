// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! qjazz-worker: Processing worker daemon.
//!
//! Subscribes to its service queue, runs jobs on a bounded pool of
//! runner child processes, publishes progress to the result store,
//! moves artifacts to storage, dispatches subscriber callbacks and
//! serves the inspect/control plane (presence, process descriptions,
//! logs, files, downloads, revocation, cleanup).

pub mod cache;
pub mod callbacks;
pub mod cleanup;
pub mod config;
pub mod context;
pub mod pool;
pub mod processes;
pub mod runner;
pub mod storage;
pub mod worker;

pub use config::WorkerConfig;
pub use processes::{Feedback, Process, ProcessSet};
pub use worker::Worker;

/// Errors internal to the worker daemon.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error(transparent)]
    Broker(#[from] qjazz_broker::BrokerError),

    #[error(transparent)]
    Registry(#[from] qjazz_registry::RegistryError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Runner failed: {0}")]
    Runner(String),
}
