//! Collaborator contracts consumed by the deployer.
//!
//! The deployer never talks to the cloud directly; it goes through these
//! capability traits so test doubles can be substituted without network
//! access. The production implementations live in [`super::cfn`] and
//! [`super::s3`].

use async_trait::async_trait;
use std::io::Write;

use crate::error::CloudError;

use super::types::{AppRegionalResources, Application, StackParameter};

/// Options applied to a stack create or update call.
#[derive(Debug, Clone, Default)]
pub struct StackUpdateOptions {
    /// Role the control plane assumes for the stack's own actions.
    pub role_arn: Option<String>,
}

impl StackUpdateOptions {
    /// Creates options that deploy under the given execution role.
    #[must_use]
    pub fn with_role(role_arn: impl Into<String>) -> Self {
        Self {
            role_arn: Some(role_arn.into()),
        }
    }
}

/// Looks up the region-scoped resources an application owns.
#[async_trait]
pub trait AppResourceLookup: Send + Sync {
    /// Returns the artifact bucket and encryption key for the application
    /// in the given region.
    async fn regional_resources(
        &self,
        app: &Application,
        region: &str,
    ) -> std::result::Result<AppRegionalResources, CloudError>;
}

/// Uploads objects to the artifact store.
#[async_trait]
pub trait ObjectUploader: Send + Sync {
    /// Uploads `body` under `key` and returns the object's URL.
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
    ) -> std::result::Result<String, CloudError>;
}

/// Drives the environment's infrastructure stack on the control plane.
#[async_trait]
pub trait EnvironmentStack: Send + Sync {
    /// Returns the parameters of the currently deployed environment stack.
    ///
    /// A stack that has never been deployed yields an empty list.
    async fn stack_parameters(
        &self,
        app: &str,
        env: &str,
    ) -> std::result::Result<Vec<StackParameter>, CloudError>;

    /// Creates or updates the named stack from a rendered template and
    /// parameter set, writing human-readable progress to `sink` until the
    /// operation reaches a terminal state.
    ///
    /// Failure carries the control plane's own diagnostic; callers surface
    /// it without rewrapping.
    async fn update_and_render(
        &self,
        sink: &mut (dyn Write + Send),
        stack_name: &str,
        template_body: &str,
        parameters: &[StackParameter],
        opts: &StackUpdateOptions,
    ) -> std::result::Result<(), CloudError>;
}
