// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn default_policy_allows_everything() {
    let policy = DefaultAccessPolicy;
    let headers = HeaderMap::new();
    assert!(policy.service_permission(&headers, "demo"));
    assert!(policy.execute_permission(&headers, "demo", "echo"));
    assert_eq!(policy.format_path("/jobs/"), "/jobs/");
}

#[test]
fn default_policy_falls_back_to_first_service() {
    let policy = DefaultAccessPolicy;
    let known = vec!["zulu".to_string(), "alpha".to_string()];
    assert_eq!(policy.get_service(&HeaderMap::new(), None, &known).as_deref(), Some("alpha"));
    assert_eq!(
        policy.get_service(&HeaderMap::new(), Some("zulu"), &known).as_deref(),
        Some("zulu"),
    );
    assert_eq!(policy.get_service(&HeaderMap::new(), None, &[]), None);
}

#[test]
fn static_policy_denies_unknown() {
    let mut allowed = HashMap::new();
    allowed.insert("demo".to_string(), vec!["echo".to_string()]);
    let policy = StaticAccessPolicy::new(allowed, "/ogc");

    let headers = HeaderMap::new();
    assert!(policy.service_permission(&headers, "demo"));
    assert!(!policy.service_permission(&headers, "other"));
    assert!(policy.execute_permission(&headers, "demo", "echo"));
    assert!(!policy.execute_permission(&headers, "demo", "sleep"));
    assert_eq!(policy.format_path("/jobs/"), "/ogc/jobs/");

    let known = vec!["demo".to_string(), "other".to_string()];
    assert_eq!(policy.get_service(&headers, Some("other"), &known), None);
    assert_eq!(policy.get_service(&headers, Some("demo"), &known).as_deref(), Some("demo"));
}
