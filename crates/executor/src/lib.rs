// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! qjazz-executor: Client-side coordinator.
//!
//! Converts API calls into broker messages, tracks in-flight jobs in
//! the registry and composes job statuses from the registry, the
//! result store and worker inspection. Fully async: callers never
//! block an event loop, and a dropped call abandons its broker RPC
//! whose replies then expire with their own deadline.

pub mod error;
pub mod execute;
pub mod services;
pub mod status;

mod commands;
mod dismiss;
mod jobs;


use std::sync::Arc;
use std::time::Duration;

use qjazz_broker::{Broker, ResultBackend};
use qjazz_registry::Registry;

pub use dismiss::DismissOptions;
pub use error::ExecutorError;
pub use execute::{ExecuteOptions, JobHandle};
pub use services::ServiceMap;

/// Executor tuning knobs.
#[derive(Debug, Clone)]
pub struct ExecutorOptions {
    /// Default pending timeout when the caller does not set one.
    pub message_expiration_timeout: u64,
    /// Upper bound for result/registry TTL (seconds).
    pub result_expires: u64,
    /// Deadline for presence broadcasts.
    pub presence_timeout: Duration,
    /// Default deadline for addressed inspect commands.
    pub command_timeout: Duration,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            message_expiration_timeout: 600,
            result_expires: 86_400,
            presence_timeout: Duration::from_secs(1),
            command_timeout: Duration::from_secs(5),
        }
    }
}

/// The process executor.
///
/// Cheap to clone; all state is shared.
#[derive(Clone)]
pub struct Executor {
    pub(crate) broker: Arc<dyn Broker>,
    pub(crate) backend: Arc<dyn ResultBackend>,
    pub(crate) registry: Arc<dyn Registry>,
    pub(crate) services: services::ServiceCache,
    pub(crate) options: ExecutorOptions,
}

impl Executor {
    pub fn new(
        broker: Arc<dyn Broker>,
        backend: Arc<dyn ResultBackend>,
        registry: Arc<dyn Registry>,
        options: ExecutorOptions,
    ) -> Self {
        Self { broker, backend, registry, services: services::ServiceCache::new(), options }
    }

    pub fn options(&self) -> &ExecutorOptions {
        &self.options
    }
}
