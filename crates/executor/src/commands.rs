// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inspect/control command addressing.
//!
//! Addressed commands pick ONE destination uniformly at random so load
//! spreads over a service's workers; broadcast variants address every
//! destination and aggregate replies per worker.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::Rng;
use serde_json::Value;
use tracing::trace;

use qjazz_broker::{Command, ControlReply, ControlRequest};
use qjazz_core::ProcessesError;

use crate::error::ExecutorError;
use crate::Executor;

pub(crate) fn epoch_now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

fn new_request(
    command: Command,
    destination: Option<Vec<String>>,
    timeout: Duration,
) -> ControlRequest {
    let id = uuid::Uuid::new_v4().to_string();
    ControlRequest {
        reply_to: format!("qjazz.reply.{id}"),
        id,
        command,
        destination,
        expires_at: epoch_now() + timeout.as_secs().max(1),
    }
}

impl Executor {
    /// Send a command to one destination of a service, picked at random.
    pub(crate) async fn command_one(
        &self,
        service: &str,
        command: Command,
        timeout: Duration,
    ) -> Result<Value, ExecutorError> {
        let destinations = self.require_destinations(service)?;
        let index = rand::rng().random_range(0..destinations.len());
        let picked = destinations[index].clone();

        let request = new_request(command, Some(vec![picked.clone()]), timeout);
        let reply_to = request.reply_to.clone();
        self.broker.publish_control(request).await?;

        let mut replies = self.broker.collect_replies(&reply_to, timeout, 1).await?;
        trace!("=command reply from {service}: {replies:?}");

        match replies.pop() {
            Some(reply) => Ok(reply.payload),
            None => Err(ProcessesError::UnreachableDestination(picked).into()),
        }
    }

    /// Send a command to every destination of a service and aggregate.
    pub(crate) async fn command_broadcast(
        &self,
        service: &str,
        command: Command,
        timeout: Duration,
    ) -> Result<Vec<ControlReply>, ExecutorError> {
        let destinations = self.require_destinations(service)?;
        let expected = destinations.len();

        let request = new_request(command, Some(destinations.clone()), timeout);
        let reply_to = request.reply_to.clone();
        self.broker.publish_control(request).await?;

        let replies = self.broker.collect_replies(&reply_to, timeout, expected).await?;
        if replies.is_empty() {
            return Err(ProcessesError::UnreachableDestination(destinations.join(",")).into());
        }
        Ok(replies)
    }

    /// Broadcast `presence` to every worker (or an explicit
    /// destination list) and gather whatever replies arrive before
    /// the deadline: the worker population is unknown up front.
    pub(crate) async fn broadcast_presence(
        &self,
        destinations: Option<Vec<String>>,
        timeout: Duration,
    ) -> Result<Vec<ControlReply>, ExecutorError> {
        let expected = destinations.as_ref().map_or(usize::MAX, Vec::len);
        let request = new_request(Command::Presence, destinations, timeout);
        let reply_to = request.reply_to.clone();
        self.broker.publish_control(request).await?;
        Ok(self.broker.collect_replies(&reply_to, timeout, expected).await?)
    }

    /// Restart the worker pool of every destination of a service.
    pub async fn restart_pool(&self, service: &str) -> Result<(), ExecutorError> {
        self.command_broadcast(service, Command::RestartPool, self.options.command_timeout)
            .await?;
        Ok(())
    }

    /// Ping service workers; returns the replying destinations.
    pub async fn ping(
        &self,
        service: &str,
        timeout: Duration,
    ) -> Result<Vec<String>, ExecutorError> {
        let replies = self.command_broadcast(service, Command::Ping, timeout).await?;
        Ok(replies.into_iter().map(|reply| reply.destination).collect())
    }

    /// Ask every worker of a service to shut down.
    pub async fn shutdown(&self, service: &str) -> Result<(), ExecutorError> {
        self.command_broadcast(service, Command::Shutdown, self.options.command_timeout).await?;
        Ok(())
    }

    /// Ask a service worker to reload its processes cache.
    pub async fn reload_processes_cache(&self, service: &str) -> Result<(), ExecutorError> {
        self.command_broadcast(
            service,
            Command::ReloadProcessesCache,
            self.options.command_timeout,
        )
        .await?;
        Ok(())
    }
}
