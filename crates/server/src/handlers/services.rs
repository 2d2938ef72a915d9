// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cached worker presences.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use qjazz_core::Link;

use super::make_link;
use crate::state::AppState;

#[derive(Serialize)]
struct ServiceEntry {
    name: String,
    title: String,
    description: String,
    /// Worker instances currently backing the service.
    instances: usize,
    online_since: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    versions: Vec<String>,
    links: Vec<Link>,
}

pub async fn list_services(State(state): State<AppState>, headers: HeaderMap) -> Json<Value> {
    let mut services: Vec<ServiceEntry> = state
        .executor
        .service_map()
        .into_iter()
        .filter(|(name, _)| state.policy.service_permission(&headers, name))
        .map(|(name, (destinations, presence))| ServiceEntry {
            links: vec![make_link(
                &state,
                &headers,
                &format!("/processes/?service={name}"),
                "http://www.opengis.net/def/rel/ogc/1.0/processes",
                "Processes list",
            )],
            name,
            title: presence.title,
            description: presence.description,
            instances: destinations.len(),
            online_since: presence.online_since,
            versions: presence.versions,
        })
        .collect();
    services.sort_by(|a, b| a.name.cmp(&b.name));

    Json(serde_json::json!({
        "services": services,
        "last_updated": state.executor.last_updated(),
    }))
}
