//! Amazon S3 object store backend.
//!
//! Works against AWS S3 and S3-compatible stores (MinIO, LocalStack) via
//! an optional endpoint override and path-style addressing.

use crate::core::{ObjectLocation, StorageError, TagSet};
use crate::storage::traits::ObjectStore;

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Tag, Tagging};
use aws_sdk_s3::Client;
use std::path::Path;
use tokio::io::AsyncWriteExt;

/// S3 client settings beyond the shared AWS configuration.
#[derive(Debug, Clone, Default)]
pub struct S3StoreConfig {
    /// Custom endpoint for S3-compatible stores.
    pub endpoint_url: Option<String>,
    /// Use `host/bucket/key` addressing instead of virtual-hosted buckets.
    pub force_path_style: bool,
}

/// Object store backed by the AWS SDK S3 client.
///
/// The client is cheap to clone and is shared by every invocation in the
/// process.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    /// Wraps an existing client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a client from shared AWS configuration plus store settings.
    pub fn from_sdk_config(shared: &aws_config::SdkConfig, settings: &S3StoreConfig) -> Self {
        let mut builder = aws_sdk_s3::config::Builder::from(shared);
        if let Some(endpoint) = &settings.endpoint_url {
            builder = builder.endpoint_url(endpoint);
        }
        builder = builder.force_path_style(settings.force_path_style);
        Self::new(Client::from_conf(builder.build()))
    }

    /// Returns the underlying client.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Builds the `CopySource` header value: bucket plus a percent-encoded key
/// with its `/` separators preserved.
pub(crate) fn copy_source(location: &ObjectLocation) -> String {
    let encoded_key = location
        .key
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/");
    format!("{}/{}", location.bucket, encoded_key)
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn download(&self, location: &ObjectLocation, dest: &Path) -> Result<u64, StorageError> {
        let output = self
            .client
            .get_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().map(|se| se.is_no_such_key()) == Some(true) {
                    StorageError::NotFound {
                        location: location.clone(),
                    }
                } else {
                    StorageError::download(location, DisplayErrorContext(&e).to_string())
                }
            })?;

        let mut body = output.body;
        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| StorageError::download(location, e.to_string()))?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        tracing::info!(
            location = %location,
            dest = %dest.display(),
            bytes = written,
            "Successfully downloaded object"
        );
        Ok(written)
    }

    async fn tag(&self, location: &ObjectLocation, tags: &TagSet) -> Result<(), StorageError> {
        let tag_set = tags
            .iter()
            .map(|(key, value)| Tag::builder().key(key).value(value).build())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StorageError::tag(location, e.to_string()))?;
        let tagging = Tagging::builder()
            .set_tag_set(Some(tag_set))
            .build()
            .map_err(|e| StorageError::tag(location, e.to_string()))?;

        self.client
            .put_object_tagging()
            .bucket(&location.bucket)
            .key(&location.key)
            .tagging(tagging)
            .send()
            .await
            .map_err(|e| StorageError::tag(location, DisplayErrorContext(&e).to_string()))?;

        tracing::info!(location = %location, tags = ?tags, "Successfully tagged object");
        Ok(())
    }

    async fn copy(
        &self,
        source: &ObjectLocation,
        destination_bucket: &str,
    ) -> Result<ObjectLocation, StorageError> {
        let destination = source.in_bucket(destination_bucket);

        self.client
            .copy_object()
            .copy_source(copy_source(source))
            .bucket(&destination.bucket)
            .key(&destination.key)
            .send()
            .await
            .map_err(|e| {
                StorageError::copy(source, &destination, DisplayErrorContext(&e).to_string())
            })?;

        tracing::info!(
            source = %source,
            destination = %destination,
            "Successfully copied object"
        );
        Ok(destination)
    }

    async fn delete(&self, location: &ObjectLocation) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .send()
            .await
            .map_err(|e| StorageError::delete(location, DisplayErrorContext(&e).to_string()))?;

        tracing::info!(location = %location, "Successfully deleted object");
        Ok(())
    }

    async fn upload(&self, source: &Path, location: &ObjectLocation) -> Result<(), StorageError> {
        let body = ByteStream::from_path(source)
            .await
            .map_err(|e| StorageError::upload(location, e.to_string()))?;

        self.client
            .put_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .body(body)
            .send()
            .await
            .map_err(|e| StorageError::upload(location, DisplayErrorContext(&e).to_string()))?;

        tracing::info!(
            source = %source.display(),
            location = %location,
            "Uploaded file"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_source_keeps_separators() {
        let location = ObjectLocation::new("uploads", "docs/Q1 report+final.pdf");
        assert_eq!(
            copy_source(&location),
            "uploads/docs/Q1%20report%2Bfinal.pdf"
        );
    }

    #[test]
    fn test_copy_source_plain_key() {
        let location = ObjectLocation::new("uploads", "report.pdf");
        assert_eq!(copy_source(&location), "uploads/report.pdf");
    }
}
