// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! qjazz-server gateway entry point.
//!
//! Usage: `qjazz-server [--config <path>]`

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use qjazz_broker::{RedisBroker, RedisResultStore};
use qjazz_executor::{Executor, ExecutorOptions};
use qjazz_registry::RedisRegistry;
use qjazz_server::{AppState, DefaultAccessPolicy, ServerConfig};

fn config_path(args: &[String]) -> PathBuf {
    args.iter()
        .position(|arg| arg == "--config")
        .and_then(|index| args.get(index + 1))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("qjazz-server.toml"))
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("QJAZZ_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = match ServerConfig::load(&config_path(&args)) {
        Ok(config) => config,
        Err(err) => {
            error!("{err}");
            return ExitCode::from(1);
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            error!("Failed to start runtime: {err}");
            return ExitCode::from(2);
        }
    };

    match runtime.block_on(run(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("Fatal: {err}");
            ExitCode::from(2)
        }
    }
}

async fn run(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let url = config.broker.url.clone();
    let broker = Arc::new(RedisBroker::connect(&url).await?);
    let backend = Arc::new(RedisResultStore::from_broker(&broker));
    let registry = Arc::new(RedisRegistry::connect(&url).await?);

    let executor = Executor::new(
        broker,
        backend,
        registry,
        ExecutorOptions {
            message_expiration_timeout: config.executor.message_expiration_timeout,
            result_expires: config.executor.result_expires,
            command_timeout: config.timeout(),
            ..ExecutorOptions::default()
        },
    );

    let state = AppState::new(executor, config, Arc::new(DefaultAccessPolicy));

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
            shutdown.cancel();
        });
    }

    qjazz_server::serve(state, shutdown).await?;
    Ok(())
}
