//! Environment deployment orchestration.
//!
//! [`EnvDeployer`] drives one environment through the full pipeline: resolve
//! the application's regional resources, stage the custom resource bundles,
//! synthesize the desired stack, and create or update the stack on the
//! control plane. It owns no cloud logic itself; every external effect goes
//! through the capability traits in [`crate::cloud`] so the pipeline can be
//! exercised against test doubles.

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::artifacts::ArtifactStager;
use crate::cloud::{
    AppRegionalResources, AppResourceLookup, Application, CloudFormationStacks, Environment,
    EnvironmentStack, ObjectUploader, S3ArtifactClient, StackParameter, StackUpdateOptions,
    bucket_arn, partition_for_region,
};
use crate::error::{ParameterDescribeError, RenderError, ResolveError, Result};
use crate::stack::{
    AppInformation, DeployEnvironmentInput, DeploymentOutput, DesiredStackInput,
    EnvStackSynthesizer, LATEST_ENV_TEMPLATE_VERSION, StackSerializer,
};

/// Builds the serializer that turns one deployment's desired state and the
/// previously deployed parameters into a template and parameter set.
pub type SerializerFactory =
    Box<dyn Fn(DesiredStackInput, Vec<StackParameter>) -> Box<dyn StackSerializer> + Send + Sync>;

/// The cloud collaborators behind an [`EnvDeployer`].
pub struct Collaborators {
    /// Resolves the application's region-scoped resources.
    pub resources: Arc<dyn AppResourceLookup>,
    /// Uploads custom resource bundles to the artifact bucket.
    pub uploader: Arc<dyn ObjectUploader>,
    /// Reads and drives the environment's infrastructure stack.
    pub stacks: Arc<dyn EnvironmentStack>,
}

/// Deploys one environment of an application.
///
/// The deployer is scoped to a single application and environment pair for
/// its whole lifetime. Regional resource resolution is memoized, so repeated
/// operations within a session describe the application stack at most once.
pub struct EnvDeployer {
    app: Application,
    env: Environment,
    resources: Arc<dyn AppResourceLookup>,
    uploader: Arc<dyn ObjectUploader>,
    stacks: Arc<dyn EnvironmentStack>,
    serializer_factory: SerializerFactory,
    regional_resources: OnceCell<AppRegionalResources>,
}

impl EnvDeployer {
    /// Creates a deployer wired to the live control plane.
    ///
    /// Credentials come from the ambient provider chain; when the
    /// environment names a manager role, that role is assumed for every
    /// read and write the deployer performs in the environment's region.
    pub async fn new(app: Application, env: Environment) -> Self {
        let base = aws_config::from_env()
            .region(aws_config::Region::new(env.region.clone()))
            .load()
            .await;
        let config = if env.manager_role_arn.is_empty() {
            base
        } else {
            let provider = aws_config::sts::AssumeRoleProvider::builder(&env.manager_role_arn)
                .configure(&base)
                .session_name("envforge")
                .build()
                .await;
            aws_config::from_env()
                .credentials_provider(provider)
                .region(aws_config::Region::new(env.region.clone()))
                .load()
                .await
        };
        let cfn = Arc::new(CloudFormationStacks::from_config(&config));
        let uploader = Arc::new(S3ArtifactClient::with_client(
            aws_sdk_s3::Client::new(&config),
            &env.region,
        ));
        Self::new_with(
            app,
            env,
            Collaborators {
                resources: cfn.clone(),
                uploader,
                stacks: cfn,
            },
        )
    }

    /// Creates a deployer over explicit collaborators.
    #[must_use]
    pub fn new_with(app: Application, env: Environment, collaborators: Collaborators) -> Self {
        Self {
            app,
            env,
            resources: collaborators.resources,
            uploader: collaborators.uploader,
            stacks: collaborators.stacks,
            serializer_factory: Box::new(|input, previous| {
                Box::new(EnvStackSynthesizer::new(input, previous))
            }),
            regional_resources: OnceCell::new(),
        }
    }

    /// Replaces the stack serializer factory.
    #[must_use]
    pub fn with_serializer_factory(mut self, factory: SerializerFactory) -> Self {
        self.serializer_factory = factory;
        self
    }

    /// Resolves the application's resources in the environment's region,
    /// describing the application stack only on the first call.
    ///
    /// A failed resolution is not cached; the next call retries.
    async fn regional_resources(&self) -> Result<&AppRegionalResources> {
        self.regional_resources
            .get_or_try_init(|| async {
                debug!(
                    "Resolving resources for application {} in {}",
                    self.app.name, self.env.region
                );
                let resolved = self
                    .resources
                    .regional_resources(&self.app, &self.env.region)
                    .await
                    .map_err(|source| ResolveError::ResourceLookup {
                        region: self.env.region.clone(),
                        source,
                    })?;
                if resolved.s3_bucket.is_empty() {
                    return Err(ResolveError::MissingBucket {
                        region: self.env.region.clone(),
                    }
                    .into());
                }
                Ok(resolved)
            })
            .await
    }

    /// Stages the environment's custom resource bundles in the application's
    /// regional artifact bucket and returns their URLs keyed by function
    /// name.
    ///
    /// Object keys embed a digest of the bundle contents, so re-running a
    /// stage that already completed rewrites the same objects in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the regional resources cannot be resolved, if the
    /// application has no artifact bucket in the environment's region, or if
    /// any bundle upload fails.
    pub async fn upload_artifacts(&self) -> Result<HashMap<String, String>> {
        let resources = self.regional_resources().await?;
        info!("Staging custom resources in bucket {}", resources.s3_bucket);
        let stager = ArtifactStager::new(Arc::clone(&self.uploader));
        stager.stage(&resources.s3_bucket).await
    }

    /// Renders the environment's stack template and parameter document
    /// without touching the stack.
    ///
    /// Parameters are reconciled against the currently deployed stack so the
    /// rendered document shows exactly what a deployment would apply.
    ///
    /// # Errors
    ///
    /// Returns an error if the regional resources cannot be resolved, the
    /// deployed parameters cannot be described, or synthesis fails.
    pub async fn generate_cloudformation_template(
        &self,
        input: &DeployEnvironmentInput,
    ) -> Result<DeploymentOutput> {
        let stack_input = self.build_stack_input(input).await?;
        let serializer = self.serializer(stack_input).await?;
        let template = serializer
            .template()
            .map_err(|source| RenderError::Template { source })?;
        let parameters = serializer
            .serialized_parameters()
            .map_err(|source| RenderError::Parameters { source })?;
        Ok(DeploymentOutput {
            template,
            parameters,
        })
    }

    /// Creates or updates the environment's infrastructure stack, writing
    /// deployment progress to `progress` until the stack settles.
    ///
    /// The stack operation runs under the environment's execution role when
    /// one is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if synthesis fails or the stack operation does not
    /// reach a clean terminal state. Control plane failures carry the
    /// provider's own diagnostic unchanged.
    pub async fn deploy_environment(
        &self,
        progress: &mut (dyn Write + Send),
        input: &DeployEnvironmentInput,
    ) -> Result<()> {
        let stack_input = self.build_stack_input(input).await?;
        let serializer = self.serializer(stack_input).await?;
        let template = serializer
            .template()
            .map_err(|source| RenderError::Template { source })?;
        let parameters = serializer.reconciled_parameters();
        let opts = if self.env.execution_role_arn.is_empty() {
            StackUpdateOptions::default()
        } else {
            StackUpdateOptions::with_role(self.env.execution_role_arn.clone())
        };
        let stack_name = self.env.stack_name(&self.app.name);
        info!("Deploying stack {stack_name}");
        self.stacks
            .update_and_render(progress, &stack_name, &template, &parameters, &opts)
            .await?;
        Ok(())
    }

    /// Builds a serializer seeded with the currently deployed parameters.
    async fn serializer(&self, stack_input: DesiredStackInput) -> Result<Box<dyn StackSerializer>> {
        let previous = self
            .stacks
            .stack_parameters(&self.app.name, &self.env.name)
            .await
            .map_err(|source| ParameterDescribeError { source })?;
        Ok((self.serializer_factory)(stack_input, previous))
    }

    /// Assembles the desired stack input from the deployment request and the
    /// resolved regional resources.
    async fn build_stack_input(
        &self,
        input: &DeployEnvironmentInput,
    ) -> Result<DesiredStackInput> {
        let resources = self.regional_resources().await?;
        let partition = partition_for_region(&self.env.region)?;
        Ok(DesiredStackInput {
            name: self.env.name.clone(),
            app: AppInformation {
                name: self.app.name.clone(),
                domain: self.app.domain.clone(),
                account_principal_arn: input.root_user_arn.clone(),
            },
            additional_tags: self.app.tags.clone(),
            custom_resources_urls: input.custom_resources_urls.clone(),
            artifact_bucket_arn: bucket_arn(partition, &resources.s3_bucket),
            artifact_bucket_key_arn: resources.kms_key_arn.clone(),
            manifest: input.manifest.clone(),
            raw_manifest: input.raw_manifest.clone(),
            version: String::from(LATEST_ENV_TEMPLATE_VERSION),
        })
    }
}
