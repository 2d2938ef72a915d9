// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job file listing and download streaming.
//!
//! Downloads resolve through the worker's `download_url` inspect: the
//! returned link decides how the gateway streams the bytes. `file://`
//! links stream from disk after a root check, `https://` links proxy
//! through the HTTP client, plain `http://` is refused unless
//! explicitly allowed.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tokio_util::io::ReaderStream;
use tracing::error;

use qjazz_core::{JobId, Link};

use super::make_link;
use crate::models::{map_executor_error, ApiError, FileLink, FilesResponse};
use crate::state::AppState;

pub async fn job_files(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<FilesResponse>, ApiError> {
    let realm = state.realm.lookup_realm(&headers)?;
    let job_id = JobId::new(job_id);
    let public_url = state.public_url(&headers);

    let files = state
        .executor
        .files(&job_id, Some(public_url.as_str()), realm.as_deref(), state.timeout())
        .await
        .map_err(map_executor_error)?
        .ok_or_else(|| ApiError::not_found("Job not found", json!({"jobId": job_id})))?;

    let path = format!("/jobs/{job_id}/files/");
    Ok(Json(FilesResponse {
        files: files.links.into_iter().map(FileLink::from).collect(),
        links: vec![make_link(&state, &headers, &path, "self", "Job files")],
    }))
}

pub async fn job_download(
    State(state): State<AppState>,
    Path((job_id, resource)): Path<(String, String)>,
    method: Method,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let realm = state.realm.lookup_realm(&headers)?;
    let job_id = JobId::new(job_id);

    let link = state
        .executor
        .download_url(
            &job_id,
            &resource,
            state.config.storage.download_url_expiration,
            realm.as_deref(),
            state.timeout(),
        )
        .await
        .map_err(map_executor_error)?
        .ok_or_else(|| {
            ApiError::not_found(
                "Job or resource not found",
                json!({"jobId": job_id, "resource": resource}),
            )
        })?;

    match link.href.split_once("://") {
        Some(("file", path)) => stream_local(&state, &link, path, &method).await,
        Some(("https", _)) => proxy_stream(&state, &link, &method).await,
        Some(("http", _)) => {
            if !state.config.storage.allow_insecure_connection {
                error!("Refusing insecure download link for {job_id}");
                return Err(ApiError::new(StatusCode::FORBIDDEN, "Forbidden"));
            }
            proxy_stream(&state, &link, &method).await
        }
        _ => {
            error!("Unsupported storage url scheme in {}", link.href);
            Err(ApiError::new(StatusCode::BAD_GATEWAY, "Unsupported storage scheme"))
        }
    }
}

/// Stream a local file in fixed-size chunks.
async fn stream_local(
    state: &AppState,
    link: &Link,
    path: &str,
    method: &Method,
) -> Result<Response, ApiError> {
    let path = std::path::Path::new(path);
    let canonical = path
        .canonicalize()
        .map_err(|_| ApiError::not_found("Resource not found", json!({})))?;

    // The link must point under the configured storage root
    let root = state
        .config
        .storage
        .local_root
        .as_ref()
        .and_then(|root| root.canonicalize().ok())
        .ok_or_else(|| ApiError::new(StatusCode::FORBIDDEN, "Local storage not configured"))?;
    if !canonical.starts_with(&root) {
        error!("Download link escapes the storage root: {}", canonical.display());
        return Err(ApiError::new(StatusCode::FORBIDDEN, "Forbidden"));
    }

    let metadata = canonical
        .metadata()
        .map_err(|_| ApiError::not_found("Resource not found", json!({})))?;

    let mut response_headers = HeaderMap::new();
    content_headers(&mut response_headers, link, Some(metadata.len()));
    if let Ok(modified) = metadata.modified() {
        let rfc2822 = chrono::DateTime::<chrono::Utc>::from(modified).to_rfc2822();
        if let Ok(value) = HeaderValue::from_str(&rfc2822) {
            response_headers.insert(header::LAST_MODIFIED, value);
        }
    }

    if method == Method::HEAD {
        return Ok((StatusCode::OK, response_headers).into_response());
    }

    let file = tokio::fs::File::open(&canonical)
        .await
        .map_err(|_| ApiError::not_found("Resource not found", json!({})))?;
    let stream = ReaderStream::with_capacity(file, state.config.storage.chunksize);
    Ok((StatusCode::OK, response_headers, Body::from_stream(stream)).into_response())
}

/// Proxy-stream a remote storage URL with chunked transfer.
async fn proxy_stream(state: &AppState, link: &Link, method: &Method) -> Result<Response, ApiError> {
    let mut response_headers = HeaderMap::new();
    content_headers(&mut response_headers, link, link.length);

    if method == Method::HEAD {
        return Ok((StatusCode::OK, response_headers).into_response());
    }

    let upstream = state.http_client.get(&link.href).send().await.map_err(|err| {
        error!("Upstream download failed: {err}");
        ApiError::new(StatusCode::BAD_GATEWAY, "Storage backend error")
    })?;
    if !upstream.status().is_success() {
        return Err(ApiError::new(StatusCode::BAD_GATEWAY, "Storage backend error"));
    }

    Ok((
        StatusCode::OK,
        response_headers,
        Body::from_stream(upstream.bytes_stream()),
    )
        .into_response())
}

fn content_headers(headers: &mut HeaderMap, link: &Link, length: Option<u64>) {
    if let Some(mime) = &link.mime_type {
        if let Ok(value) = HeaderValue::from_str(mime) {
            headers.insert(header::CONTENT_TYPE, value);
        }
    }
    if let Some(length) = length {
        if let Ok(value) = HeaderValue::from_str(&length.to_string()) {
            headers.insert(header::CONTENT_LENGTH, value);
        }
    }
}
