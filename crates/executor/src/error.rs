// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Executor error type.

use qjazz_broker::BrokerError;
use qjazz_core::ProcessesError;
use qjazz_registry::RegistryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error(transparent)]
    Processes(#[from] ProcessesError),

    #[error(transparent)]
    Broker(#[from] BrokerError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A bounded wait elapsed (sync result wait, RPC deadline).
    #[error("Operation timed out")]
    Timeout,
}

impl ExecutorError {
    /// Whether this error is a "service not available" condition.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            ExecutorError::Processes(
                ProcessesError::ServiceNotAvailable(_) | ProcessesError::UnreachableDestination(_)
            )
        )
    }
}
