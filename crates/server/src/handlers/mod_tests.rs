// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    none = { None, "status", &[] },
    single = { Some("status=running"), "status", &["running"] },
    repeated = { Some("status=running&status=failed"), "status", &["running", "failed"] },
    mixed = { Some("limit=10&status=running&page=2"), "status", &["running"] },
    other_key = { Some("processID=echo"), "status", &[] },
    empty_value = { Some("status="), "status", &[] },
    encoded = { Some("processID=my%20process"), "processID", &["my process"] },
    plus_space = { Some("processID=my+process"), "processID", &["my process"] },
)]
fn query_all_extraction(query: Option<&str>, name: &str, expected: &[&str]) {
    assert_eq!(query_all(query, name), expected);
}

#[test]
fn urldecode_rejects_bad_escapes() {
    assert_eq!(urldecode("abc%2"), None);
    assert_eq!(urldecode("abc%zz"), None);
    assert_eq!(urldecode("abc%20def").as_deref(), Some("abc def"));
}
