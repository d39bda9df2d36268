//! Configuration resolution behaviour through the lookup seam.

use std::collections::HashMap;

use pictor_config::{AppConfig, ConfigError};

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |name| map.get(name).cloned()
}

#[test]
fn explicit_bucket_wins_over_table_and_staging() {
    let config = AppConfig::from_lookup(lookup(&[
        ("AWS_REGION", "us-east-1"),
        ("PICTOR_ENV", "staging"),
        ("PICTOR_BUCKET", "downloads.example.com"),
    ]))
    .expect("config resolves");
    assert_eq!(config.store.bucket, "downloads.example.com");
    assert_eq!(config.store.region, "us-east-1");
    assert_eq!(
        config.store.domain(),
        "downloads.example.com.s3.amazonaws.com"
    );
}

#[test]
fn production_table_resolves_bucket_by_region() {
    let config = AppConfig::from_lookup(lookup(&[("AWS_REGION", "eu-central-1")]))
        .expect("config resolves");
    assert_eq!(config.store.bucket, "pictor-prod-downloads-eu-central-1");
    assert_eq!(config.store.region, "eu-central-1");

    let config =
        AppConfig::from_lookup(lookup(&[("AWS_REGION", "us-east-1")])).expect("config resolves");
    assert_eq!(config.store.bucket, "downloads.pictor.io");
}

#[test]
fn staging_env_selects_the_shared_staging_bucket() {
    let config =
        AppConfig::from_lookup(lookup(&[("PICTOR_ENV", "staging")])).expect("config resolves");
    assert_eq!(config.store.bucket, "staging-downloads.pictor.io");
    assert_eq!(config.store.region, "us-east-1");

    // The staging bucket is pinned regardless of the deployment region.
    let config = AppConfig::from_lookup(lookup(&[
        ("PICTOR_ENV", "Staging"),
        ("AWS_REGION", "eu-west-1"),
    ]))
    .expect("config resolves");
    assert_eq!(config.store.bucket, "staging-downloads.pictor.io");
    assert_eq!(config.store.region, "us-east-1");
}

#[test]
fn unknown_region_is_reported() {
    let err =
        AppConfig::from_lookup(lookup(&[("AWS_REGION", "ap-south-1")])).expect_err("no replica");
    assert_eq!(
        err,
        ConfigError::UnknownRegion {
            region: "ap-south-1".to_string()
        }
    );
}

#[test]
fn missing_region_is_reported() {
    let err = AppConfig::from_lookup(lookup(&[])).expect_err("no region");
    assert_eq!(err, ConfigError::MissingEnv { name: "AWS_REGION" });

    // An explicit bucket still needs a region for the client.
    let err = AppConfig::from_lookup(lookup(&[("PICTOR_BUCKET", "b")])).expect_err("no region");
    assert_eq!(err, ConfigError::MissingEnv { name: "AWS_REGION" });
}

#[test]
fn defaults_cover_bind_addr_and_port() {
    let config =
        AppConfig::from_lookup(lookup(&[("AWS_REGION", "us-east-1")])).expect("config resolves");
    assert_eq!(config.http.bind_addr.to_string(), "0.0.0.0");
    assert_eq!(config.http.port, 8080);
}

#[test]
fn invalid_port_is_a_typed_failure() {
    let err = AppConfig::from_lookup(lookup(&[
        ("AWS_REGION", "us-east-1"),
        ("PICTOR_HTTP_PORT", "eighty"),
    ]))
    .expect_err("bad port");
    assert!(matches!(
        err,
        ConfigError::InvalidField {
            field: "PICTOR_HTTP_PORT",
            ..
        }
    ));
}
