//! Staging of custom resource bundles into the artifact bucket.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::debug;

use crate::cloud::ObjectUploader;
use crate::error::{ArtifactError, CloudError, EnvForgeError, Result};

use super::catalog::environment_bundles;

/// Upper bound on concurrent bundle uploads.
const MAX_CONCURRENT_UPLOADS: usize = 4;

/// Uploads the environment's custom resource bundles to a regional bucket.
pub struct ArtifactStager {
    uploader: Arc<dyn ObjectUploader>,
}

impl ArtifactStager {
    /// Creates a stager backed by the given uploader.
    #[must_use]
    pub fn new(uploader: Arc<dyn ObjectUploader>) -> Self {
        Self { uploader }
    }

    /// Uploads every bundle and returns a map of function name to URL.
    ///
    /// Keys are content-addressed, so re-staging an unchanged bundle
    /// rewrites the same object and URLs from earlier deployments remain
    /// valid. Uploads run concurrently; the first failure aborts the rest.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError::Upload`] carrying the first upload failure.
    pub async fn stage(&self, bucket: &str) -> Result<HashMap<String, String>> {
        let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_UPLOADS));
        let mut uploads = JoinSet::new();
        for bundle in environment_bundles() {
            let uploader = Arc::clone(&self.uploader);
            let semaphore = Arc::clone(&semaphore);
            let bucket = String::from(bucket);
            uploads.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|err| CloudError::service(format!("upload slot closed: {err}")))?;
                let key = bundle.artifact_key();
                debug!("Staging custom resource {} as {key}", bundle.name());
                let url = uploader
                    .upload(&bucket, &key, bundle.payload().as_bytes().to_vec())
                    .await?;
                Ok::<(String, String), CloudError>((String::from(bundle.name()), url))
            });
        }

        let mut urls = HashMap::new();
        while let Some(joined) = uploads.join_next().await {
            let outcome = joined
                .map_err(|err| EnvForgeError::internal(format!("upload task failed: {err}")))?;
            match outcome {
                Ok((name, url)) => {
                    urls.insert(name, url);
                }
                Err(source) => {
                    uploads.abort_all();
                    return Err(ArtifactError::Upload {
                        bucket: String::from(bucket),
                        source,
                    }
                    .into());
                }
            }
        }
        Ok(urls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::{
        CERTIFICATE_VALIDATION_FUNCTION, CUSTOM_DOMAIN_FUNCTION, CustomResourceBundle,
        DNS_DELEGATION_FUNCTION,
    };
    use async_trait::async_trait;
    use mockall::mock;

    mock! {
        Uploader {}

        #[async_trait]
        impl ObjectUploader for Uploader {
            async fn upload(
                &self,
                bucket: &str,
                key: &str,
                body: Vec<u8>,
            ) -> std::result::Result<String, CloudError>;
        }
    }

    #[tokio::test]
    async fn test_stage_uploads_every_bundle() {
        let mut uploader = MockUploader::new();
        uploader
            .expect_upload()
            .withf(|bucket, key, body| {
                bucket == "mockbucket"
                    && key.starts_with("manual/scripts/custom-resources/")
                    && key.ends_with(".js")
                    && !body.is_empty()
            })
            .times(3)
            .returning(|bucket, key, _| {
                Ok(format!("https://{bucket}.s3.us-west-2.amazonaws.com/{key}"))
            });

        let stager = ArtifactStager::new(Arc::new(uploader));
        let urls = stager.stage("mockbucket").await.unwrap();

        assert_eq!(urls.len(), 3);
        for function in [
            CERTIFICATE_VALIDATION_FUNCTION,
            CUSTOM_DOMAIN_FUNCTION,
            DNS_DELEGATION_FUNCTION,
        ] {
            let url = urls.get(function).unwrap();
            assert!(url.contains(&function.to_lowercase()), "{url}");
        }
    }

    #[tokio::test]
    async fn test_stage_wraps_the_first_failure() {
        let mut uploader = MockUploader::new();
        uploader
            .expect_upload()
            .returning(|_, _, _| Err(CloudError::service("some error")));

        let stager = ArtifactStager::new(Arc::new(uploader));
        let err = stager.stage("mockbucket").await.unwrap_err();

        assert_eq!(
            err.to_string(),
            "upload custom resources to bucket mockbucket: some error"
        );
    }

    #[tokio::test]
    async fn test_stage_keys_match_the_catalog() {
        let expected_keys: Vec<String> = environment_bundles()
            .iter()
            .map(CustomResourceBundle::artifact_key)
            .collect();

        let mut uploader = MockUploader::new();
        uploader
            .expect_upload()
            .withf(move |_, key, _| expected_keys.iter().any(|expected| expected == key))
            .times(3)
            .returning(|_, key, _| Ok(format!("https://b.s3.amazonaws.com/{key}")));

        let stager = ArtifactStager::new(Arc::new(uploader));
        stager.stage("mockbucket").await.unwrap();
    }
}
