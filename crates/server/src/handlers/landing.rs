// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Landing page: links only.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde_json::json;

use super::make_link;
use crate::state::AppState;

pub async fn landing_page(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Json<serde_json::Value> {
    let links = vec![
        make_link(&state, &headers, "/", "self", "Landing page"),
        make_link(
            &state,
            &headers,
            "/processes/",
            "http://www.opengis.net/def/rel/ogc/1.0/processes",
            "Processes list",
        ),
        make_link(
            &state,
            &headers,
            "/jobs/",
            "http://www.opengis.net/def/rel/ogc/1.0/job-list",
            "Jobs list",
        ),
        make_link(&state, &headers, "/services/", "related", "Available services"),
        make_link(
            &state,
            &headers,
            "/api",
            "service-desc",
            "API definition",
        ),
    ];

    Json(json!({
        "title": "qjazz processes",
        "description": "OGC API Processes frontend",
        "links": links,
    }))
}
