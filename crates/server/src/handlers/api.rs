// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OpenAPI document.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde_json::{json, Value};

use crate::state::AppState;

/// The OpenAPI document for the exposed surface. Assembled once per
/// request so server URLs reflect the caller's public URL.
pub async fn api_document(State(state): State<AppState>, headers: HeaderMap) -> Json<Value> {
    let base = state.public_url(&headers);
    Json(json!({
        "openapi": "3.0.3",
        "info": {
            "title": "qjazz processes",
            "description": "OGC API Processes frontend",
            "version": env!("CARGO_PKG_VERSION"),
        },
        "servers": [{"url": base}],
        "paths": {
            "/": {"get": {"summary": "Landing page", "tags": ["api"]}},
            "/api": {"get": {"summary": "This document", "tags": ["api"]}},
            "/services/": {"get": {"summary": "List available services", "tags": ["services"]}},
            "/processes/": {"get": {"summary": "List available processes", "tags": ["processes"]}},
            "/processes/{ident}": {
                "get": {
                    "summary": "Get process description",
                    "tags": ["processes"],
                    "parameters": [ident_param()],
                },
            },
            "/processes/{ident}/execution": {
                "post": {
                    "summary": "Execute process",
                    "description": "Sync or async execution per the Prefer header \
                                    (respond-async, wait, priority, delay)",
                    "tags": ["processes"],
                    "parameters": [ident_param()],
                    "responses": {
                        "200": {"description": "Process executed synchronously"},
                        "202": {"description": "Process accepted for asynchronous execution"},
                    },
                },
            },
            "/jobs/": {"get": {"summary": "List jobs", "tags": ["jobs"]}},
            "/jobs/{jobId}": {
                "get": {"summary": "Get job status", "tags": ["jobs"], "parameters": [job_param()]},
                "delete": {"summary": "Dismiss job", "tags": ["jobs"], "parameters": [job_param()]},
            },
            "/jobs/{jobId}/results": {
                "get": {"summary": "Get job results", "tags": ["jobs"], "parameters": [job_param()]},
            },
            "/jobs/{jobId}/log": {
                "get": {"summary": "Get job execution log", "tags": ["jobs"], "parameters": [job_param()]},
            },
            "/jobs/{jobId}/files/": {
                "get": {"summary": "List job files", "tags": ["jobs"], "parameters": [job_param()]},
            },
            "/jobs/{jobId}/files/{resource}": {
                "get": {"summary": "Download a job file", "tags": ["jobs"], "parameters": [job_param()]},
            },
        },
    }))
}

fn ident_param() -> Value {
    json!({
        "in": "path",
        "name": "ident",
        "required": true,
        "schema": {"type": "string"},
        "description": "Process identifier",
    })
}

fn job_param() -> Value {
    json!({
        "in": "path",
        "name": "jobId",
        "required": true,
        "schema": {"type": "string"},
        "description": "Job id",
    })
}
