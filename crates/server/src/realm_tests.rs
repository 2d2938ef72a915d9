// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn realm(enabled: bool, admin_tokens: &[&str]) -> JobRealm {
    JobRealm::new(JobRealmSection {
        enabled,
        admin_tokens: admin_tokens.iter().map(|t| t.to_string()).collect(),
    })
}

fn headers_with(value: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(JOB_REALM_HEADER, value.parse().unwrap());
    headers
}

#[parameterized(
    minimal = { "abcdefgh", true },
    with_dash = { "abc-def_12", true },
    uuid = { "0e4d7c9a-9f2b-4d3e-8a6f-2b1c3d4e5f6a", true },
    too_short = { "abcdefg", false },
    leading_dash = { "-bcdefgh", false },
    spaced = { "abc defgh", false },
    dotted = { "abc.defgh", false },
    empty = { "", false },
)]
fn realm_validation(value: &str, valid: bool) {
    assert_eq!(valid_realm(value), valid);
}

#[test]
fn disabled_mode_passes_none() {
    let realm = realm(false, &[]);
    let headers = headers_with("abcdefgh");
    assert_eq!(realm.get_job_realm(&headers).unwrap(), None);
    assert_eq!(realm.listing_realm(&headers).unwrap(), None);
    assert_eq!(realm.lookup_realm(&headers).unwrap(), None);
}

#[test]
fn execute_mints_when_absent() {
    let realm = realm(true, &[]);
    let minted = realm.get_job_realm(&HeaderMap::new()).unwrap().unwrap();
    assert!(valid_realm(&minted));
}

#[test]
fn execute_keeps_client_realm() {
    let realm = realm(true, &[]);
    let kept = realm.get_job_realm(&headers_with("abcdefgh")).unwrap();
    assert_eq!(kept.as_deref(), Some("abcdefgh"));
}

#[test]
fn invalid_realm_is_unauthorized() {
    let realm = realm(true, &[]);
    let err = realm.get_job_realm(&headers_with("short")).unwrap_err();
    assert_eq!(err.status.as_u16(), 401);
}

#[test]
fn listing_requires_realm() {
    let realm = realm(true, &[]);
    let err = realm.listing_realm(&HeaderMap::new()).unwrap_err();
    assert_eq!(err.status.as_u16(), 401);
}

#[test]
fn lookup_without_realm_matches_nothing() {
    let realm = realm(true, &[]);
    // Empty-realm filter: realm-scoped jobs read as not found
    assert_eq!(realm.lookup_realm(&HeaderMap::new()).unwrap(), Some(String::new()));
}

#[test]
fn admin_tokens_lift_the_filter() {
    let realm = realm(true, &["admintoken"]);
    assert_eq!(realm.listing_realm(&headers_with("admintoken")).unwrap(), None);
    assert_eq!(realm.lookup_realm(&headers_with("admintoken")).unwrap(), None);
    assert!(realm.is_admin(Some("admintoken")));
    assert!(!realm.is_admin(Some("abcdefgh")));
}
