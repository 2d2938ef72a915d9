// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! qjazz-registry: Shared index of in-flight and recently-completed jobs.
//!
//! A thin layer over a key/value store. Records live under
//! `qjazz::{job_id}::{service}::{realm|""}` as hashes with a TTL equal
//! to the result expiration, so a job record vanishes together with
//! its result. Lookups iterate with cursor-based SCAN; glob patterns
//! on the key layout implement the service and realm filters.

pub mod keys;
pub mod lock;
pub mod traits;

mod redis;

#[cfg(any(test, feature = "test-support"))]
pub mod memory;

pub use keys::{job_key, scan_pattern, JobKey};
pub use lock::LockGuard;
pub use self::redis::RedisRegistry;
pub use traits::{Registry, RegistryError, TaskInfo};
