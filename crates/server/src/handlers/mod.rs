// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP handlers for the OGC-API-Processes surface.

pub mod api;
pub mod files;
pub mod jobs;
pub mod landing;
pub mod processes;
pub mod services;

use axum::http::HeaderMap;

use qjazz_core::Link;

use crate::state::AppState;

/// A link anchored on the gateway's public URL.
pub(crate) fn make_link(
    state: &AppState,
    headers: &HeaderMap,
    path: &str,
    rel: &str,
    title: &str,
) -> Link {
    Link::new(state.href(headers, path))
        .rel(rel)
        .mime_type("application/json")
        .title(title)
}

/// Values of a repeated query parameter (`?status=a&status=b`).
pub(crate) fn query_all(query: Option<&str>, name: &str) -> Vec<String> {
    let Some(query) = query else { return Vec::new() };
    query
        .split('&')
        .filter_map(|pair| pair.split_once('=').or(Some((pair, ""))))
        .filter(|(key, _)| *key == name)
        .map(|(_, value)| value.replace('+', " "))
        .filter_map(|value| urldecode(&value))
        .filter(|value| !value.is_empty())
        .collect()
}

/// Minimal percent-decoding for query values.
fn urldecode(raw: &str) -> Option<String> {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut index = 0;
    while index < bytes.len() {
        match bytes[index] {
            b'%' => {
                let hex = bytes.get(index + 1..index + 3)?;
                let hex = std::str::from_utf8(hex).ok()?;
                out.push(u8::from_str_radix(hex, 16).ok()?);
                index += 3;
            }
            byte => {
                out.push(byte);
                index += 1;
            }
        }
    }
    String::from_utf8(out).ok()
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
