// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! qjazz-core: Shared data model for the qjazz process execution platform.
//!
//! Everything that crosses a component boundary lives here: job
//! identifiers and statuses, the task meta envelope, process
//! descriptions, worker presence records and the error taxonomy
//! shared by the executor, the workers and the HTTP gateway.

pub mod macros;

pub mod clock;
pub mod error;
pub mod id;
pub mod job;
pub mod models;
pub mod process;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use error::{ErrorCode, FailureInfo, ProcessesError};
pub use id::JobId;
pub use job::{JobException, JobMeta, JobState, JobStatus};
pub use models::{Link, ProcessFiles, ProcessLog, WorkerPresence};
pub use process::{
    InputDescription, JobControlOption, JobExecute, JobResults, OutputDescription,
    ProcessDescription, ProcessSummary, Subscriber, ValuePassing,
};
