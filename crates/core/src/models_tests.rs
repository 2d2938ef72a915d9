// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn link_mime_type_serializes_as_type() {
    let link = Link::new("https://example.com/out.tif")
        .rel("related")
        .mime_type("image/tiff")
        .title("out.tif")
        .length(1_048_576);

    let json = serde_json::to_value(&link).unwrap();
    assert_eq!(json["href"], "https://example.com/out.tif");
    assert_eq!(json["type"], "image/tiff");
    assert_eq!(json["length"], 1_048_576);
    assert!(json.get("mime_type").is_none());
}

#[test]
fn link_empty_fields_omitted() {
    let json = serde_json::to_value(Link::new("/x")).unwrap();
    assert_eq!(json.as_object().unwrap().len(), 1);
}

#[test]
fn presence_round_trip() {
    let presence = WorkerPresence {
        service: "demo".into(),
        title: "Demo service".into(),
        description: String::new(),
        links: vec![],
        online_since: 1000,
        versions: vec!["qjazz 0.2.0".into()],
        result_expires: 86400,
        callbacks: vec!["https".into()],
        entrypoint: None,
    };
    let json = serde_json::to_string(&presence).unwrap();
    let parsed: WorkerPresence = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, presence);
}
