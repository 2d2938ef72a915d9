// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Router assembly and the serve loop.

use axum::http::{HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::handlers::{api, files, jobs, landing, processes, services};
use crate::state::{spawn_update_loop, AppState};

/// Build the gateway router.
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.http.cross_origin);

    let router = Router::new()
        .route("/", get(landing::landing_page))
        .route("/processes/", get(processes::list_processes))
        .route("/processes/{ident}", get(processes::describe_process))
        .route(
            "/processes/{ident}/execution",
            axum::routing::post(processes::execute_process),
        )
        .route("/jobs/", get(jobs::list_jobs))
        .route(
            "/jobs/{job_id}",
            get(jobs::job_status).delete(jobs::dismiss_job),
        )
        .route("/jobs/{job_id}/results", get(jobs::job_results))
        .route("/jobs/{job_id}/log", get(jobs::job_log))
        .route("/jobs/{job_id}/files/", get(files::job_files))
        .route("/jobs/{job_id}/files/{*resource}", get(files::job_download))
        .route("/services/", get(services::list_services))
        .route("/api", get(api::api_document))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    match cors {
        Some(cors) => router.layer(cors),
        None => router,
    }
}

fn cors_layer(cross_origin: &str) -> Option<CorsLayer> {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::HEAD])
        .allow_headers(Any);
    match cross_origin {
        "all" => Some(layer.allow_origin(Any)),
        "same-origin" => None,
        origin => match origin.parse::<HeaderValue>() {
            Ok(origin) => Some(layer.allow_origin(origin)),
            Err(_) => {
                warn!("Invalid cross_origin value {cross_origin:?}, disabling CORS");
                None
            }
        },
    }
}

/// Bind, spawn the presence-refresh task and serve until the token
/// fires.
pub async fn serve(state: AppState, shutdown: CancellationToken) -> std::io::Result<()> {
    let listen = state.config.http.listen;
    spawn_update_loop(state.clone(), shutdown.clone());

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(listen).await?;
    info!("Gateway listening on {listen}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
