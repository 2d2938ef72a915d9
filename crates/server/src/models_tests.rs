// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use qjazz_core::{JobId, ProcessesError};
use qjazz_executor::ExecutorError;
use yare::parameterized;

#[parameterized(
    unknown_service = { ProcessesError::ServiceNotAvailable("demo".into()), 503 },
    unreachable = { ProcessesError::UnreachableDestination("w1".into()), 503 },
    dismissed_twice = { ProcessesError::DismissedTaskError(JobId::new("job-1")), 403 },
    bad_input = { ProcessesError::InputValueError("bad".into()), 400 },
    project_required = { ProcessesError::ProjectRequired("p".into()), 400 },
    process_missing = { ProcessesError::ProcessNotFound("p".into()), 404 },
    processing = { ProcessesError::RunProcessException, 500 },
    internal = { ProcessesError::Internal("x".into()), 500 },
)]
fn taxonomy_mapping(err: ProcessesError, status: u16) {
    let api = map_executor_error(ExecutorError::Processes(err));
    assert_eq!(api.status.as_u16(), status);
}

#[test]
fn timeout_maps_to_504() {
    assert_eq!(map_executor_error(ExecutorError::Timeout).status.as_u16(), 504);
}

#[test]
fn service_unavailable_body() {
    let api =
        map_executor_error(ExecutorError::Processes(ProcessesError::ServiceNotAvailable("demo".into())));
    assert_eq!(api.body.message, "Service not known");
}

#[test]
fn internal_errors_hide_details() {
    let api = map_executor_error(ExecutorError::Processes(ProcessesError::Internal(
        "secret stack trace".into(),
    )));
    assert_eq!(api.body.message, "Internal error");
    assert!(api.body.details.is_none());
}

#[test]
fn file_link_display_size() {
    let link = Link::new("/x").length(1_048_576);
    let file: FileLink = link.into();
    assert_eq!(file.display_size, "1.05 MB");
}
