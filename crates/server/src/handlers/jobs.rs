// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job listing, status, results, logs and dismissal.

use std::collections::HashMap;

use axum::extract::{OriginalUri, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use qjazz_core::{JobId, JobState, JobStatus};
use qjazz_executor::DismissOptions;

use super::{make_link, query_all};
use crate::models::{map_executor_error, ApiError, JobList, LogResponse};
use crate::state::AppState;

const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 1_000;

fn page_params(query: &HashMap<String, String>) -> Result<(usize, usize), ApiError> {
    let limit = match query.get("limit") {
        Some(raw) => raw
            .parse::<usize>()
            .ok()
            .filter(|limit| (1..MAX_LIMIT).contains(limit))
            .ok_or_else(|| ApiError::new(StatusCode::BAD_REQUEST, "Invalid limit"))?,
        None => DEFAULT_LIMIT,
    };
    let page = match query.get("page") {
        Some(raw) => raw
            .parse::<usize>()
            .ok()
            .filter(|page| *page >= 1)
            .ok_or_else(|| ApiError::new(StatusCode::BAD_REQUEST, "Invalid page"))?,
        None => 1,
    };
    Ok((limit, page))
}

pub async fn list_jobs(
    State(state): State<AppState>,
    headers: HeaderMap,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<JobList>, ApiError> {
    let service = query.get("service").map(String::as_str);
    let (limit, page) = page_params(&query)?;

    let process_ids = query_all(uri.query(), "processID");
    let filtered_status = query_all(uri.query(), "status");

    let realm = state.realm.listing_realm(&headers)?;

    let mut jobs = state
        .executor
        .jobs(service, realm.as_deref(), (page - 1) * limit, limit)
        .await
        .map_err(map_executor_error)?;

    if !process_ids.is_empty() || !filtered_status.is_empty() {
        jobs.retain(|status| {
            let process_ok = process_ids.is_empty()
                || status
                    .process_id
                    .as_deref()
                    .is_some_and(|id| process_ids.iter().any(|wanted| wanted == id));
            let status_ok = filtered_status.is_empty()
                || filtered_status.iter().any(|wanted| *wanted == status.status.to_string());
            process_ok && status_ok
        });
    }

    let full_page = jobs.len() >= limit;
    for status in &mut jobs {
        let path = format!("/jobs/{}", status.job_id);
        status.links.push(make_link(&state, &headers, &path, "related", "Job details"));
        if status.status == JobState::Successful {
            status.links.push(make_link(
                &state,
                &headers,
                &format!("{path}/results"),
                "http://www.opengis.net/def/rel/ogc/1.0/results",
                "Job results",
            ));
        }
    }

    let mut links = vec![make_link(
        &state,
        &headers,
        &format!("/jobs/?limit={limit}&page={page}"),
        "self",
        "Job list",
    )];
    // Next-page link only when this page came back full
    if full_page {
        links.push(make_link(
            &state,
            &headers,
            &format!("/jobs/?limit={limit}&page={}", page + 1),
            "next",
            "Job list",
        ));
    }
    if page > 1 {
        links.push(make_link(
            &state,
            &headers,
            &format!("/jobs/?limit={limit}&page={}", page - 1),
            "prev",
            "Job list",
        ));
    }

    Ok(Json(JobList { jobs, links }))
}

pub async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    let realm = state.realm.lookup_realm(&headers)?;
    let details = query.get("details").is_some_and(|raw| raw == "true" || raw == "1");

    let job_id = JobId::new(job_id);
    let status = state
        .executor
        .job_status(&job_id, realm.as_deref(), details)
        .await
        .map_err(map_executor_error)?;

    let mut status = status
        .ok_or_else(|| ApiError::not_found("Job not found", json!({"jobId": job_id})))?;

    attach_job_links(&state, &headers, &mut status);
    Ok(Json(status).into_response())
}

pub async fn dismiss_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<JobStatus>, ApiError> {
    let realm = state.realm.lookup_realm(&headers)?;
    let job_id = JobId::new(job_id);

    let status = state
        .executor
        .dismiss(&job_id, realm.as_deref(), DismissOptions::default())
        .await
        .map_err(map_executor_error)?;

    status
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Job not found", json!({"jobId": job_id})))
}

pub async fn job_results(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<qjazz_core::JobResults>, ApiError> {
    let realm = state.realm.lookup_realm(&headers)?;
    let job_id = JobId::new(job_id);

    let results = state
        .executor
        .job_results(&job_id, realm.as_deref())
        .await
        .map_err(map_executor_error)?;

    results
        .map(Json)
        .ok_or_else(|| ApiError::not_found("No results", json!({"jobId": job_id})))
}

pub async fn job_log(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<LogResponse>, ApiError> {
    let realm = state.realm.lookup_realm(&headers)?;
    let job_id = JobId::new(job_id);

    let log = state
        .executor
        .log_details(&job_id, realm.as_deref(), state.timeout())
        .await
        .map_err(map_executor_error)?
        .ok_or_else(|| ApiError::not_found("Job not found", json!({"jobId": job_id})))?;

    let path = format!("/jobs/{job_id}/log");
    Ok(Json(LogResponse {
        timestamp: log.timestamp,
        log: log.log,
        links: vec![make_link(&state, &headers, &path, "self", "Job execution log")],
    }))
}

fn attach_job_links(state: &AppState, headers: &HeaderMap, status: &mut JobStatus) {
    let path = format!("/jobs/{}", status.job_id);
    if status.status == JobState::Successful {
        status.links.push(make_link(
            state,
            headers,
            &format!("{path}/results"),
            "http://www.opengis.net/def/rel/ogc/1.0/results",
            "Job results",
        ));
    }
    status.links.push(make_link(
        state,
        headers,
        &format!("{path}/log"),
        "related",
        "Job execution logs",
    ));
    status.links.push(make_link(
        state,
        headers,
        &format!("{path}/files/"),
        "related",
        "Job files",
    ));
    status.links.push(make_link(state, headers, &path, "self", "Job status"));
}
