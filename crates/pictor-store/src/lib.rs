#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    rustdoc::broken_intra_doc_links,
    missing_docs
)]

//! S3-backed implementation of the [`ObjectStore`] collaborator.
//!
//! The store is constructed with an explicit client and bucket; there is no
//! global bucket or region state. A not-found HEAD response is a normal
//! outcome and resolves to `false`, every other failure propagates with
//! operation and key context.

/// Error types for object-store operations.
pub mod error;

pub use error::StoreError;

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::primitives::{ByteStream, DateTime};
use bytes::Bytes;
use pictor_core::{CacheMetadata, ObjectStore};
use tracing::debug;

/// Object store backed by one S3 bucket.
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    /// Construct a store over an existing client and bucket.
    #[must_use]
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Public domain name of the backing bucket.
    #[must_use]
    pub fn domain(&self) -> String {
        format!("{}.s3.amazonaws.com", self.bucket)
    }

    /// Bucket this store reads from and writes to.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn exists(&self, key: &str) -> anyhow::Result<bool> {
        debug!(bucket = %self.bucket, key = %key, "head object");
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(SdkError::ServiceError(context)) if context.err().is_not_found() => Ok(false),
            Err(err) => Err(StoreError::Head {
                key: key.to_string(),
                source: err.into(),
            }
            .into()),
        }
    }

    async fn get(&self, key: &str) -> anyhow::Result<Bytes> {
        debug!(bucket = %self.bucket, key = %key, "get object");
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| StoreError::Get {
                key: key.to_string(),
                source: err.into(),
            })?;
        let body = output.body.collect().await.map_err(|err| StoreError::Get {
            key: key.to_string(),
            source: err.into(),
        })?;
        Ok(body.into_bytes())
    }

    async fn put(
        &self,
        key: &str,
        content_type: &str,
        body: Bytes,
        metadata: &CacheMetadata,
    ) -> anyhow::Result<()> {
        debug!(bucket = %self.bucket, key = %key, content_type, "put object");
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .cache_control(&metadata.cache_control)
            .expires(DateTime::from_millis(metadata.expires.timestamp_millis()))
            .tagging(&metadata.tagging)
            .send()
            .await
            .map_err(|err| StoreError::Put {
                key: key.to_string(),
                source: err.into(),
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::config::Region;

    fn store() -> S3ObjectStore {
        let config = aws_sdk_s3::Config::builder()
            .region(Region::new("us-east-1"))
            .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest())
            .build();
        S3ObjectStore::new(Client::from_conf(config), "downloads.example.com")
    }

    #[test]
    fn domain_joins_bucket_with_s3_suffix() {
        assert_eq!(store().domain(), "downloads.example.com.s3.amazonaws.com");
        assert_eq!(store().bucket(), "downloads.example.com");
    }

    #[test]
    fn expiry_converts_to_sdk_datetime_millis() {
        let metadata = CacheMetadata::derived_variant();
        let converted = DateTime::from_millis(metadata.expires.timestamp_millis());
        assert_eq!(converted.to_millis().ok(), Some(metadata.expires.timestamp_millis()));
    }
}
