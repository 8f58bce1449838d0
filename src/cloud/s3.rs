//! S3-backed artifact uploads.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::DisplayErrorContext;
use tracing::debug;

use crate::error::CloudError;

use super::contracts::ObjectUploader;

/// Uploads artifacts into a single region's bucket.
#[derive(Debug)]
pub struct S3ArtifactClient {
    /// S3 client.
    client: Client,
    /// Region the artifact bucket lives in.
    region: String,
}

impl S3ArtifactClient {
    /// Creates an uploader for the given region using ambient credentials.
    pub async fn new(region: &str) -> Self {
        let config = aws_config::from_env()
            .region(aws_config::Region::new(region.to_string()))
            .load()
            .await;

        Self {
            client: Client::new(&config),
            region: region.to_string(),
        }
    }

    /// Creates an uploader with an existing client.
    #[must_use]
    pub fn with_client(client: Client, region: &str) -> Self {
        Self {
            client,
            region: region.to_string(),
        }
    }
}

#[async_trait]
impl ObjectUploader for S3ArtifactClient {
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
    ) -> std::result::Result<String, CloudError> {
        debug!("Uploading s3://{bucket}/{key}");

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body.into())
            .send()
            .await
            .map_err(|e| CloudError::service(format!("S3 put error: {}", DisplayErrorContext(e))))?;

        Ok(format!(
            "https://{bucket}.s3.{}.amazonaws.com/{key}",
            self.region
        ))
    }
}
