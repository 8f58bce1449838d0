//! CloudFormation-backed stack operations.
//!
//! One adapter implements both control-plane contracts: resolving the
//! application's regional resource stack outputs, and driving the
//! environment stack itself with streamed progress events.

use std::collections::HashSet;
use std::io::Write;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_cloudformation::Client;
use aws_sdk_cloudformation::error::{DisplayErrorContext, SdkError};
use aws_sdk_cloudformation::types::{Capability, Parameter, StackEvent, StackStatus};
use tracing::debug;

use crate::error::CloudError;

use super::contracts::{AppResourceLookup, EnvironmentStack, StackUpdateOptions};
use super::types::{AppRegionalResources, Application, StackParameter};

/// Suffix of the stack holding an application's regional resources.
const APP_RESOURCE_STACK_SUFFIX: &str = "infrastructure";

/// Output key carrying the artifact bucket name.
const BUCKET_OUTPUT_KEY: &str = "PipelineBucket";

/// Output key carrying the KMS key ARN.
const KMS_OUTPUT_KEY: &str = "KMSKeyARN";

/// Interval between progress polls.
const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// CloudFormation client scoped to one region.
#[derive(Debug)]
pub struct CloudFormationStacks {
    /// CloudFormation client.
    client: Client,
}

impl CloudFormationStacks {
    /// Creates a stack client for the given region using ambient credentials.
    pub async fn new(region: &str) -> Self {
        let config = aws_config::from_env()
            .region(aws_config::Region::new(region.to_string()))
            .load()
            .await;

        Self {
            client: Client::new(&config),
        }
    }

    /// Creates a stack client from an already loaded AWS configuration.
    #[must_use]
    pub fn from_config(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }

    /// Creates a stack client with an existing client.
    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Describes a stack, mapping "does not exist" to `None`.
    async fn fetch_stack(
        &self,
        stack_name: &str,
    ) -> Result<Option<aws_sdk_cloudformation::types::Stack>, CloudError> {
        let result = self
            .client
            .describe_stacks()
            .stack_name(stack_name)
            .send()
            .await;

        match result {
            Ok(response) => Ok(response.stacks.unwrap_or_default().into_iter().next()),
            Err(err) => {
                let text = error_text(err);
                if text.contains("does not exist") {
                    Ok(None)
                } else {
                    Err(CloudError::service(text))
                }
            }
        }
    }

    /// Streams stack events to `sink` until the stack reaches a terminal
    /// state. Only events newer than `since` (epoch seconds) are shown.
    async fn render_progress(
        &self,
        sink: &mut (dyn Write + Send),
        stack_name: &str,
        since: i64,
    ) -> Result<(), CloudError> {
        let mut seen: HashSet<String> = HashSet::new();
        loop {
            let response = self
                .client
                .describe_stack_events()
                .stack_name(stack_name)
                .send()
                .await
                .map_err(|err| CloudError::service(error_text(err)))?;

            // Events arrive newest first; replay unseen ones chronologically.
            let mut fresh: Vec<&StackEvent> = response
                .stack_events()
                .iter()
                .filter(|event| event.timestamp().is_some_and(|t| t.secs() >= since))
                .filter(|event| event.event_id().is_some_and(|id| !seen.contains(id)))
                .collect();
            fresh.reverse();
            for event in fresh {
                if let Some(id) = event.event_id() {
                    seen.insert(String::from(id));
                }
                write_event(sink, event)?;
            }

            let stack = self.fetch_stack(stack_name).await?.ok_or_else(|| {
                CloudError::service(format!("stack {stack_name} does not exist"))
            })?;
            match stack.stack_status() {
                Some(StackStatus::CreateComplete | StackStatus::UpdateComplete) => {
                    return Ok(());
                }
                Some(
                    status @ (StackStatus::CreateFailed
                    | StackStatus::RollbackComplete
                    | StackStatus::RollbackFailed
                    | StackStatus::UpdateRollbackComplete
                    | StackStatus::UpdateRollbackFailed
                    | StackStatus::DeleteComplete
                    | StackStatus::DeleteFailed),
                ) => {
                    let message = stack.stack_status_reason().map_or_else(
                        || format!("stack {stack_name} reached status {}", status.as_str()),
                        String::from,
                    );
                    return Err(CloudError::service(message));
                }
                Some(_) => tokio::time::sleep(POLL_INTERVAL).await,
                None => {
                    return Err(CloudError::invalid_response(format!(
                        "stack {stack_name} has no status"
                    )));
                }
            }
        }
    }
}

/// Renders an SDK error with its full source chain.
fn error_text<E, R>(err: SdkError<E, R>) -> String
where
    E: std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    format!("{}", DisplayErrorContext(err))
}

/// Writes one stack event as a progress line.
fn write_event(sink: &mut (dyn Write + Send), event: &StackEvent) -> Result<(), CloudError> {
    let time = event
        .timestamp()
        .and_then(|t| chrono::DateTime::from_timestamp(t.secs(), 0))
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_default();
    let status = event
        .resource_status()
        .map(aws_sdk_cloudformation::types::ResourceStatus::as_str)
        .unwrap_or_default();
    let resource_type = event.resource_type().unwrap_or_default();
    let logical_id = event.logical_resource_id().unwrap_or_default();
    match event.resource_status_reason() {
        Some(reason) => {
            writeln!(sink, "{time} {status} {resource_type} {logical_id} ({reason})")
        }
        None => writeln!(sink, "{time} {status} {resource_type} {logical_id}"),
    }
    .map_err(|e| CloudError::service(format!("write deployment progress: {e}")))
}

#[async_trait]
impl AppResourceLookup for CloudFormationStacks {
    async fn regional_resources(
        &self,
        app: &Application,
        region: &str,
    ) -> Result<AppRegionalResources, CloudError> {
        let stack_name = format!("{}-{APP_RESOURCE_STACK_SUFFIX}", app.name);
        debug!("Resolving outputs of {stack_name} in {region}");

        let stack = self.fetch_stack(&stack_name).await?.ok_or_else(|| {
            CloudError::service(format!("stack {stack_name} does not exist"))
        })?;
        let output = |key: &str| -> String {
            stack
                .outputs()
                .iter()
                .find(|output| output.output_key() == Some(key))
                .and_then(|output| output.output_value())
                .map(String::from)
                .unwrap_or_default()
        };

        Ok(AppRegionalResources {
            s3_bucket: output(BUCKET_OUTPUT_KEY),
            kms_key_arn: output(KMS_OUTPUT_KEY),
        })
    }
}

#[async_trait]
impl EnvironmentStack for CloudFormationStacks {
    async fn stack_parameters(
        &self,
        app: &str,
        env: &str,
    ) -> Result<Vec<StackParameter>, CloudError> {
        let stack_name = format!("{app}-{env}");
        let Some(stack) = self.fetch_stack(&stack_name).await? else {
            debug!("Stack {stack_name} not deployed yet; no previous parameters");
            return Ok(Vec::new());
        };

        Ok(stack
            .parameters()
            .iter()
            .filter_map(|parameter| {
                match (parameter.parameter_key(), parameter.parameter_value()) {
                    (Some(key), Some(value)) => Some(StackParameter::new(key, value)),
                    _ => None,
                }
            })
            .collect())
    }

    async fn update_and_render(
        &self,
        sink: &mut (dyn Write + Send),
        stack_name: &str,
        template_body: &str,
        parameters: &[StackParameter],
        opts: &StackUpdateOptions,
    ) -> Result<(), CloudError> {
        let started = chrono::Utc::now().timestamp();
        let parameters: Vec<Parameter> = parameters
            .iter()
            .map(|parameter| {
                Parameter::builder()
                    .parameter_key(&parameter.key)
                    .parameter_value(&parameter.value)
                    .build()
            })
            .collect();
        let token = format!("envforge-{}", uuid::Uuid::new_v4());

        if self.fetch_stack(stack_name).await?.is_some() {
            debug!("Updating stack {stack_name}");
            let update = self
                .client
                .update_stack()
                .stack_name(stack_name)
                .template_body(template_body)
                .set_parameters(Some(parameters))
                .capabilities(Capability::CapabilityIam)
                .capabilities(Capability::CapabilityNamedIam)
                .set_role_arn(opts.role_arn.clone())
                .client_request_token(token)
                .send()
                .await;
            if let Err(err) = update {
                let text = error_text(err);
                if text.contains("No updates are to be performed") {
                    writeln!(sink, "No changes to deploy for stack {stack_name}.")
                        .map_err(|e| {
                            CloudError::service(format!("write deployment progress: {e}"))
                        })?;
                    return Ok(());
                }
                return Err(CloudError::service(text));
            }
        } else {
            debug!("Creating stack {stack_name}");
            self.client
                .create_stack()
                .stack_name(stack_name)
                .template_body(template_body)
                .set_parameters(Some(parameters))
                .capabilities(Capability::CapabilityIam)
                .capabilities(Capability::CapabilityNamedIam)
                .set_role_arn(opts.role_arn.clone())
                .client_request_token(token)
                .send()
                .await
                .map_err(|err| CloudError::service(error_text(err)))?;
        }

        self.render_progress(sink, stack_name, started).await
    }
}
