// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! qjazz-worker daemon entry point.
//!
//! Usage: `qjazz-worker [--config <path>]`
//!
//! The binary re-executes itself in two hidden modes: `job-runner`
//! (executes one job function, driven over stdin/stdout) and
//! `describe-cache` (serves the description catalogue over a pipe).

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use qjazz_broker::{RedisBroker, RedisResultStore};
use qjazz_registry::RedisRegistry;
use qjazz_worker::cache::ChildCache;
use qjazz_worker::callbacks::Callbacks;
use qjazz_worker::pool::ProcessLauncher;
use qjazz_worker::storage::LocalStorage;
use qjazz_worker::{ProcessSet, Worker, WorkerConfig};

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("QJAZZ_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

fn config_path(args: &[String]) -> PathBuf {
    args.iter()
        .position(|arg| arg == "--config")
        .and_then(|index| args.get(index + 1))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("qjazz-worker.toml"))
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    // Hidden child modes re-executed by the daemon
    match args.first().map(String::as_str) {
        Some("job-runner") => {
            let code = qjazz_worker::runner::child_main(&ProcessSet::builtin());
            return ExitCode::from(code as u8);
        }
        Some("describe-cache") => {
            init_tracing();
            let code = qjazz_worker::cache::child_main(&ProcessSet::builtin());
            return ExitCode::from(code as u8);
        }
        _ => {}
    }

    init_tracing();

    let config = match WorkerConfig::load(&config_path(&args)) {
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

    match runtime.block_on(serve(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("Fatal: {err}");
            ExitCode::from(2)
        }
    }
}

async fn serve(config: WorkerConfig) -> Result<(), qjazz_worker::WorkerError> {
    let url = config.broker.url.clone();
    let broker = Arc::new(RedisBroker::connect(&url).await?);
    let backend = Arc::new(RedisResultStore::from_broker(&broker));
    let registry = Arc::new(RedisRegistry::connect(&url).await?);

    let callbacks = if config.callbacks.is_empty() {
        Callbacks::with_http()
    } else {
        Callbacks::from_config(&config.callbacks)?
    };

    let cache = Arc::new(ChildCache::start().await?);
    let worker = Arc::new(Worker::new(
        config,
        broker,
        backend,
        registry,
        Arc::new(ProcessLauncher),
        Arc::new(LocalStorage),
        callbacks,
        Arc::clone(&cache) as Arc<dyn qjazz_worker::cache::DescriptionCache>,
    ));

    // Graceful shutdown on SIGINT/SIGTERM
    {
        let worker = Arc::clone(&worker);
        tokio::spawn(async move {
            shutdown_signal().await;
            info!("Shutdown signal received");
            worker.stop();
        });
    }

    let outcome = Arc::clone(&worker).run().await;
    cache.stop().await;
    outcome
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = match signal(SignalKind::terminate()) {
            Ok(term) => term,
            Err(_) => return std::future::pending().await,
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = term.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
