// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process listing, description and execution.

use std::collections::HashMap;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{debug, error, warn};

use qjazz_core::{JobControlOption, JobExecute, JobState, JobStatus, ProcessesError};
use qjazz_executor::{DismissOptions, ExecuteOptions, ExecutorError, JobHandle};

use super::make_link;
use crate::models::{map_executor_error, ApiError, ProcessList};
use crate::prefer::ExecutePrefs;
use crate::realm::JOB_REALM_HEADER;
use crate::state::AppState;

pub const JOB_ID_HEADER: &str = "X-Job-Id";

/// Longest accepted job tag.
const TAG_MAX_LEN: usize = 36;

pub async fn list_processes(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<ProcessList>, ApiError> {
    let service = state.resolve_service(&headers, query.get("service").map(String::as_str))?;

    let summaries = state
        .executor
        .processes(&service, state.timeout())
        .await
        .map_err(map_executor_error)?;

    let processes = summaries
        .into_iter()
        .filter(|summary| state.policy.execute_permission(&headers, &service, &summary.id))
        .map(|mut summary| {
            summary.links.insert(
                0,
                make_link(
                    &state,
                    &headers,
                    &format!("/processes/{}", summary.id),
                    "http://www.opengis.net/def/rel/ogc/1.0/processes",
                    "Process description",
                ),
            );
            summary
        })
        .collect();

    Ok(Json(ProcessList {
        processes,
        links: vec![make_link(&state, &headers, "/processes/", "self", "Processes list")],
    }))
}

pub async fn describe_process(
    State(state): State<AppState>,
    Path(ident): Path<String>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    let service = state.resolve_service(&headers, query.get("service").map(String::as_str))?;
    let project = state.policy.get_project(query.get("project").map(String::as_str));

    state.check_execute_permission(&headers, &service, &ident)?;

    let description = state
        .executor
        .describe(&service, &ident, project.as_deref(), state.timeout())
        .await
        .map_err(map_executor_error)?;

    let mut description = description.ok_or_else(|| {
        ApiError::not_found("Process not found", json!({"processId": ident}))
    })?;

    description.summary.links.insert(
        0,
        make_link(
            &state,
            &headers,
            &format!("/processes/{ident}"),
            "self",
            "Process description",
        ),
    );
    description.summary.links.push(make_link(
        &state,
        &headers,
        &format!("/processes/{ident}/execution"),
        "http://www.opengis.net/def/rel/ogc/1.0/execute",
        "Execute process",
    ));

    Ok(Json(description).into_response())
}

pub async fn execute_process(
    State(state): State<AppState>,
    Path(ident): Path<String>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    body: String,
) -> Result<Response, ApiError> {
    let service = state.resolve_service(&headers, query.get("service").map(String::as_str))?;
    let project = state.policy.get_project(query.get("project").map(String::as_str));

    state.check_execute_permission(&headers, &service, &ident)?;

    let tag = match query.get("tag") {
        Some(tag) if tag.len() > TAG_MAX_LEN => {
            return Err(ApiError::new(StatusCode::BAD_REQUEST, "Invalid tag"));
        }
        tag => tag.cloned(),
    };

    let request: JobExecute = serde_json::from_str(&body).map_err(|err| {
        error!("Invalid execute request: {err}");
        ApiError::new(StatusCode::BAD_REQUEST, format!("Invalid request: {err}"))
    })?;

    let prefs = ExecutePrefs::parse(&headers);
    let realm = state.realm.get_job_realm(&headers)?;

    // Priority is honored for admin realms only
    let priority = match prefs.priority {
        Some(priority) if state.realm.is_admin(realm.as_deref()) => priority,
        _ => 0,
    };

    let summary = state
        .executor
        .process_summary(&service, &ident, state.timeout())
        .await
        .map_err(map_executor_error)?
        .ok_or_else(|| ApiError::not_found("Process not found", json!({"processId": ident})))?;

    let execute_sync = prefs.execute_sync() && summary.allows(JobControlOption::SyncExecute);
    if execute_sync {
        debug!("Running synchronous execution for {ident} ({service})");
    }

    let options = ExecuteOptions {
        project,
        context: json!({"public_url": state.public_url(&headers)}),
        realm: realm.clone(),
        pending_timeout: prefs.wait.filter(|wait| *wait > 0),
        tag,
        countdown: (!execute_sync).then_some(prefs.delay).flatten(),
        priority,
    };

    let handle = state
        .executor
        .execute(&service, &ident, request, options)
        .await
        .map_err(map_executor_error)?;

    if execute_sync {
        let wait = Duration::from_secs(prefs.wait.unwrap_or(state.config.http.timeout));
        match handle.wait_result(wait).await {
            Ok(results) => {
                let mut response_headers = HeaderMap::new();
                insert_header(&mut response_headers, JOB_ID_HEADER, handle.job_id.as_str());
                if let Some(realm) = &realm {
                    insert_header(&mut response_headers, JOB_REALM_HEADER, realm);
                }
                return Ok((StatusCode::OK, response_headers, Json(results)).into_response());
            }
            Err(ExecutorError::Timeout) => {
                if !summary.allows(JobControlOption::AsyncExecute) {
                    // No async fallback possible: give up on the job
                    // entirely
                    error!("Synchronous request timeout for {}", handle.job_id);
                    let status = state
                        .executor
                        .dismiss(&handle.job_id, realm.as_deref(), DismissOptions::default())
                        .await
                        .unwrap_or_else(|err| {
                            warn!("Dismiss after sync timeout failed: {err}");
                            None
                        });
                    return Ok((
                        StatusCode::GATEWAY_TIMEOUT,
                        Json(status.map_or(json!({}), |status| json!(status))),
                    )
                        .into_response());
                }
                warn!("Synchronous request timeout: falling back to async response");
            }
            Err(ExecutorError::Processes(ProcessesError::DismissedTaskError(_))) => {
                // Job was dismissed under us while waiting: report the
                // status like an async response
            }
            Err(err) => {
                let mut api = map_executor_error(err);
                api.body.details = Some(json!({"jobId": handle.job_id}));
                return Err(api);
            }
        }
    }

    // Asynchronous (or fallen-back) response: 202 + status monitor
    accepted_response(&state, &headers, &handle, &service, realm).await
}

async fn accepted_response(
    state: &AppState,
    headers: &HeaderMap,
    handle: &JobHandle,
    service: &str,
    realm: Option<String>,
) -> Result<Response, ApiError> {
    let mut status = handle.status().await.map_err(map_executor_error)?;
    decorate_status_links(state, headers, &mut status, service);

    let location = state.href(headers, &format!("/jobs/{}", status.job_id));
    let mut response_headers = HeaderMap::new();
    insert_header(&mut response_headers, "Location", &location);
    insert_header(&mut response_headers, JOB_ID_HEADER, status.job_id.as_str());
    if let Some(realm) = &realm {
        insert_header(&mut response_headers, JOB_REALM_HEADER, realm);
    }

    Ok((StatusCode::ACCEPTED, response_headers, Json(status)).into_response())
}

fn decorate_status_links(
    state: &AppState,
    headers: &HeaderMap,
    status: &mut JobStatus,
    service: &str,
) {
    let job_path = format!("/jobs/{}", status.job_id);
    status.links = vec![
        make_link(
            state,
            headers,
            &job_path,
            "http://www.opengis.net/def/rel/iana/1.0/status",
            "Job status",
        ),
        make_link(
            state,
            headers,
            &format!(
                "/processes/{}/execution?service={service}",
                status.process_id.as_deref().unwrap_or_default()
            ),
            "self",
            "Job execution",
        ),
    ];
    if status.status == JobState::Successful {
        status.links.push(make_link(
            state,
            headers,
            &format!("{job_path}/results"),
            "http://www.opengis.net/def/rel/ogc/1.0/results",
            "Job results",
        ));
    }
}

fn insert_header(headers: &mut HeaderMap, name: &'static str, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(name, value);
    }
}
