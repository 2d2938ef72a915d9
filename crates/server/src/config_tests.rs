// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn defaults() {
    let config = ServerConfig::default();
    assert_eq!(config.http.listen.port(), 9180);
    assert_eq!(config.http.update_interval, 30);
    assert_eq!(config.executor.message_expiration_timeout, 600);
    assert!(!config.job_realm.enabled);
    assert!(!config.storage.allow_insecure_connection);
}

#[test]
fn full_config_parses() {
    let config: ServerConfig = toml::from_str(
        r#"
        [http]
        listen = "0.0.0.0:8080"
        update_interval = 5
        timeout = 10
        cross_origin = "same-origin"
        public_url = "https://maps.example/processes"
        proxy = true

        [executor]
        message_expiration_timeout = 120
        result_expires = 3600

        [broker]
        url = "redis://broker:6379/0"

        [job_realm]
        enabled = true
        admin_tokens = ["admintoken1"]

        [storage]
        chunksize = 8192
        allow_insecure_connection = true
        "#,
    )
    .unwrap();

    assert_eq!(config.http.listen.port(), 8080);
    assert_eq!(config.http.public_url.as_deref(), Some("https://maps.example/processes"));
    assert!(config.job_realm.enabled);
    assert_eq!(config.job_realm.admin_tokens, vec!["admintoken1".to_string()]);
    assert_eq!(config.storage.chunksize, 8192);
    assert_eq!(config.timeout(), Duration::from_secs(10));
}

#[test]
fn unknown_keys_rejected() {
    assert!(toml::from_str::<ServerConfig>("[http]\nbogus = 1\n").is_err());
}
