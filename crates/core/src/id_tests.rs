// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn generated_ids_carry_prefix() {
    let id = JobId::generate();
    assert!(id.as_str().starts_with(JobId::PREFIX));
    assert_eq!(id.as_str().len(), JobId::PREFIX.len() + 19);
}

#[test]
fn generated_ids_are_unique() {
    let a = JobId::generate();
    let b = JobId::generate();
    assert_ne!(a, b);
}

#[test]
fn job_id_display() {
    let id = JobId::new("job-abc");
    assert_eq!(id.to_string(), "job-abc");
}

#[test]
fn job_id_from_str() {
    let id: JobId = "job-xyz".into();
    assert_eq!(id, "job-xyz");
}

#[test]
fn job_id_serde_transparent() {
    let id = JobId::new("job-1");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"job-1\"");

    let parsed: JobId = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, id);
}
