//! Desired-state modeling and template synthesis for environment stacks.
//!
//! This module turns an environment manifest plus application context into
//! the two artifacts a deployment needs:
//! - A CloudFormation template body, assembled as typed data and rendered
//!   deterministically
//! - A parameter file reconciled against the previously deployed values

mod input;
mod params;
mod resources;
mod synthesizer;
mod template;
mod toggles;

pub use input::{
    AppInformation, DeployEnvironmentInput, DeploymentOutput, DesiredStackInput,
    LATEST_ENV_TEMPLATE_VERSION,
};
pub use params::{
    PARAM_ALB_WORKLOADS, PARAM_ALIASES, PARAM_APP_DNS_DELEGATION_ROLE, PARAM_APP_DNS_NAME,
    PARAM_APP_NAME, PARAM_CREATE_HTTPS_LISTENER, PARAM_CREATE_INTERNAL_HTTPS_LISTENER,
    PARAM_EFS_WORKLOADS, PARAM_ENVIRONMENT_NAME, PARAM_INTERNAL_ALB_SUBNETS,
    PARAM_INTERNAL_ALB_WORKLOADS, PARAM_NAT_WORKLOADS, PARAM_SERVICE_DISCOVERY_ENDPOINT,
    PARAM_TOOLS_PRINCIPAL_ARN, ParameterDeclaration, ParameterValue, declared_parameters,
    reconcile, serialize_parameters,
};
pub use synthesizer::{EnvStackSynthesizer, StackSerializer};
pub use template::{
    CONDITION_CREATE_ALB, CONDITION_CREATE_EFS, CONDITION_CREATE_HTTPS_LISTENER,
    CONDITION_CREATE_INTERNAL_ALB, CONDITION_CREATE_INTERNAL_HTTPS_LISTENER,
    CONDITION_CREATE_NAT_GATEWAYS, CONDITION_DELEGATE_DNS, CONDITION_EXPORT_HTTPS_LISTENER,
    EnvTemplate, Export, Output, ParameterSpec, Resource, TemplateMetadata,
};
pub use toggles::{CertificateSource, FeatureToggles, VpcTopology};
