//! Typed configuration models.
//!
//! # Design
//! - Pure data carriers resolved once at bootstrap.
//! - Bucket selection is explicit: an exact bucket name wins, then the
//!   staging environment, then the production region table. The original
//!   deployment kept a mutable global region table; that is deliberately
//!   gone.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
const DEFAULT_HTTP_PORT: u16 = 8080;

/// Production bucket replicas by region.
const PRODUCTION_BUCKETS: &[(&str, &str)] = &[
    ("us-east-1", "downloads.pictor.io"),
    ("us-west-2", "pictor-prod-downloads-us-west-2"),
    ("eu-central-1", "pictor-prod-downloads-eu-central-1"),
    ("eu-west-1", "pictor-prod-downloads-eu-west-1"),
];

/// Staging deployments share one bucket regardless of region.
const STAGING_BUCKET: &str = "staging-downloads.pictor.io";
const STAGING_REGION: &str = "us-east-1";

/// Top-level application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    pub http: HttpConfig,
    /// Object-store settings.
    pub store: StoreProfile,
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// IP address the server binds to.
    pub bind_addr: IpAddr,
    /// Port the server binds to.
    pub port: u16,
}

/// Object-store settings for one deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreProfile {
    /// Bucket holding master images and derived variants.
    pub bucket: String,
    /// Region the bucket lives in.
    pub region: String,
}

impl StoreProfile {
    /// Public domain name of the bucket, used as a redirect target.
    #[must_use]
    pub fn domain(&self) -> String {
        format!("{}.s3.amazonaws.com", self.bucket)
    }
}

impl AppConfig {
    /// Resolve configuration through an environment lookup function.
    ///
    /// Bucket resolution order: an explicit `PICTOR_BUCKET` wins; otherwise
    /// `PICTOR_ENV=staging` selects the shared staging bucket (pinned to
    /// `us-east-1`); otherwise the production table maps `AWS_REGION` to its
    /// regional replica.
    ///
    /// # Errors
    ///
    /// Returns an error when `AWS_REGION` is missing outside staging, when
    /// the region has no production bucket, or when an address or port fails
    /// to parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr_raw =
            lookup("PICTOR_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_addr_raw
            .parse::<IpAddr>()
            .map_err(|_| ConfigError::InvalidField {
                field: "PICTOR_BIND_ADDR",
                reason: "not an ip address",
                value: Some(bind_addr_raw),
            })?;

        let port = match lookup("PICTOR_HTTP_PORT") {
            None => DEFAULT_HTTP_PORT,
            Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::InvalidField {
                field: "PICTOR_HTTP_PORT",
                reason: "not a port number",
                value: Some(raw),
            })?,
        };

        let staging = lookup("PICTOR_ENV")
            .is_some_and(|value| value.trim().eq_ignore_ascii_case("staging"));
        let explicit = lookup("PICTOR_BUCKET").filter(|value| !value.trim().is_empty());

        let (bucket, region) = match explicit {
            Some(bucket) => {
                let region = required_region(&lookup)?;
                (bucket, region)
            }
            None if staging => (STAGING_BUCKET.to_string(), STAGING_REGION.to_string()),
            None => {
                let region = required_region(&lookup)?;
                let bucket = production_bucket(&region).ok_or(ConfigError::UnknownRegion {
                    region: region.clone(),
                })?;
                (bucket.to_string(), region)
            }
        };

        Ok(Self {
            http: HttpConfig { bind_addr, port },
            store: StoreProfile { bucket, region },
        })
    }
}

fn required_region(lookup: &impl Fn(&str) -> Option<String>) -> Result<String, ConfigError> {
    lookup("AWS_REGION")
        .filter(|value| !value.trim().is_empty())
        .ok_or(ConfigError::MissingEnv { name: "AWS_REGION" })
}

fn production_bucket(region: &str) -> Option<&'static str> {
    PRODUCTION_BUCKETS
        .iter()
        .find(|(table_region, _)| *table_region == region)
        .map(|(_, bucket)| *bucket)
}
