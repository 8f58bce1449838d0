//! Stack parameter declaration and reconciliation.
//!
//! Every parameter the environment template accepts is declared here with a
//! classification: either its value is fully determined by the desired state,
//! or it is owned by the running stack and inherited from the previously
//! deployed value. Reconciliation folds the two sources together so repeated
//! deployments never clobber values the stack accumulated at runtime.

use serde::Serialize;

use crate::cloud::StackParameter;
use crate::error::ParameterError;

use super::input::DesiredStackInput;
use super::toggles::FeatureToggles;

/// Application name parameter.
pub const PARAM_APP_NAME: &str = "AppName";
/// Environment name parameter.
pub const PARAM_ENVIRONMENT_NAME: &str = "EnvironmentName";
/// Root principal of the account that manages the application.
pub const PARAM_TOOLS_PRINCIPAL_ARN: &str = "ToolsAccountPrincipalARN";
/// Application domain name, empty when the application has none.
pub const PARAM_APP_DNS_NAME: &str = "AppDNSName";
/// Role assumed to write delegation records into the application zone.
pub const PARAM_APP_DNS_DELEGATION_ROLE: &str = "AppDNSDelegationRole";
/// Private service discovery namespace name.
pub const PARAM_SERVICE_DISCOVERY_ENDPOINT: &str = "ServiceDiscoveryEndpoint";
/// Whether the public load balancer carries an HTTPS listener.
pub const PARAM_CREATE_HTTPS_LISTENER: &str = "CreateHTTPSListener";
/// Whether the internal load balancer carries an HTTPS listener.
pub const PARAM_CREATE_INTERNAL_HTTPS_LISTENER: &str = "CreateInternalHTTPSListener";
/// Comma-separated subnet placement for the internal load balancer.
pub const PARAM_INTERNAL_ALB_SUBNETS: &str = "InternalALBSubnets";
/// Comma-separated HTTPS aliases registered by deployed workloads.
pub const PARAM_ALIASES: &str = "Aliases";
/// Comma-separated workloads behind the public load balancer.
pub const PARAM_ALB_WORKLOADS: &str = "ALBWorkloads";
/// Comma-separated workloads behind the internal load balancer.
pub const PARAM_INTERNAL_ALB_WORKLOADS: &str = "InternalALBWorkloads";
/// Comma-separated workloads mounting the shared file system.
pub const PARAM_EFS_WORKLOADS: &str = "EFSWorkloads";
/// Comma-separated workloads requiring NAT egress.
pub const PARAM_NAT_WORKLOADS: &str = "NATWorkloads";

/// How a parameter's deployed value is determined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterValue {
    /// The desired state dictates the value outright.
    Desired(String),
    /// The previously deployed value is kept if one exists.
    Inherit {
        /// Value used when the stack has no previous deployment.
        default: String,
    },
}

/// A template parameter together with its value classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDeclaration {
    /// Template parameter key.
    pub key: &'static str,
    /// Value classification.
    pub value: ParameterValue,
}

impl ParameterDeclaration {
    const fn desired(key: &'static str, value: String) -> Self {
        Self {
            key,
            value: ParameterValue::Desired(value),
        }
    }

    const fn inherit(key: &'static str, default: String) -> Self {
        Self {
            key,
            value: ParameterValue::Inherit { default },
        }
    }
}

/// Declares every template parameter for the given desired state, in the
/// order they are emitted.
#[must_use]
pub fn declared_parameters(
    input: &DesiredStackInput,
    toggles: &FeatureToggles,
) -> Vec<ParameterDeclaration> {
    let https_listener = if toggles.https_listener() {
        ParameterDeclaration::desired(PARAM_CREATE_HTTPS_LISTENER, String::from("true"))
    } else {
        ParameterDeclaration::inherit(PARAM_CREATE_HTTPS_LISTENER, String::from("false"))
    };
    let internal_https_listener = if toggles.internal_https_listener() {
        ParameterDeclaration::desired(PARAM_CREATE_INTERNAL_HTTPS_LISTENER, String::from("true"))
    } else {
        ParameterDeclaration::inherit(PARAM_CREATE_INTERNAL_HTTPS_LISTENER, String::from("false"))
    };
    let internal_alb_subnets = if toggles.internal_alb_subnets.is_empty() {
        ParameterDeclaration::inherit(PARAM_INTERNAL_ALB_SUBNETS, String::new())
    } else {
        ParameterDeclaration::desired(
            PARAM_INTERNAL_ALB_SUBNETS,
            toggles.internal_alb_subnets.join(","),
        )
    };

    vec![
        ParameterDeclaration::desired(PARAM_APP_NAME, input.app.name.clone()),
        ParameterDeclaration::desired(PARAM_ENVIRONMENT_NAME, input.name.clone()),
        ParameterDeclaration::desired(
            PARAM_TOOLS_PRINCIPAL_ARN,
            input.app.account_principal_arn.clone(),
        ),
        ParameterDeclaration::desired(
            PARAM_APP_DNS_NAME,
            input.app.domain.clone().unwrap_or_default(),
        ),
        ParameterDeclaration::desired(
            PARAM_APP_DNS_DELEGATION_ROLE,
            input.app_dns_delegation_role().unwrap_or_default(),
        ),
        ParameterDeclaration::inherit(
            PARAM_SERVICE_DISCOVERY_ENDPOINT,
            format!("{}.{}.local", input.name, input.app.name),
        ),
        https_listener,
        internal_https_listener,
        internal_alb_subnets,
        ParameterDeclaration::inherit(PARAM_ALIASES, String::new()),
        ParameterDeclaration::inherit(PARAM_ALB_WORKLOADS, String::new()),
        ParameterDeclaration::inherit(PARAM_INTERNAL_ALB_WORKLOADS, String::new()),
        ParameterDeclaration::inherit(PARAM_EFS_WORKLOADS, String::new()),
        ParameterDeclaration::inherit(PARAM_NAT_WORKLOADS, String::new()),
    ]
}

/// Folds declarations over the previously deployed parameters.
///
/// Desired declarations take their declared value. Inherited declarations
/// take the previously deployed value when one exists for the key, and the
/// declared default otherwise.
#[must_use]
pub fn reconcile(
    declarations: Vec<ParameterDeclaration>,
    previous: &[StackParameter],
) -> Vec<StackParameter> {
    declarations
        .into_iter()
        .map(|declaration| {
            let value = match declaration.value {
                ParameterValue::Desired(value) => value,
                ParameterValue::Inherit { default } => previous
                    .iter()
                    .find(|parameter| parameter.key == declaration.key)
                    .map_or(default, |parameter| parameter.value.clone()),
            };
            StackParameter::new(declaration.key, value)
        })
        .collect()
}

#[derive(Serialize)]
struct SerializedParameter<'a> {
    #[serde(rename = "ParameterKey")]
    key: &'a str,
    #[serde(rename = "ParameterValue")]
    value: &'a str,
}

/// Serializes reconciled parameters in the deployment file format.
///
/// # Errors
///
/// Returns [`ParameterError::Serialize`] if JSON serialization fails.
pub fn serialize_parameters(parameters: &[StackParameter]) -> Result<String, ParameterError> {
    let serialized: Vec<SerializedParameter<'_>> = parameters
        .iter()
        .map(|parameter| SerializedParameter {
            key: &parameter.key,
            value: &parameter.value,
        })
        .collect();
    Ok(serde_json::to_string_pretty(&serialized)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::EnvironmentManifest;
    use crate::stack::input::{AppInformation, LATEST_ENV_TEMPLATE_VERSION};
    use std::collections::{BTreeMap, HashMap};

    fn input(manifest: EnvironmentManifest, domain: Option<&str>) -> DesiredStackInput {
        DesiredStackInput {
            name: String::from("test"),
            app: AppInformation {
                name: String::from("phonetool"),
                domain: domain.map(String::from),
                account_principal_arn: String::from("arn:aws:iam::1111:root"),
            },
            additional_tags: BTreeMap::new(),
            custom_resources_urls: HashMap::new(),
            artifact_bucket_arn: String::from("arn:aws:s3:::mockbucket"),
            artifact_bucket_key_arn: String::new(),
            manifest,
            raw_manifest: String::new(),
            version: String::from(LATEST_ENV_TEMPLATE_VERSION),
        }
    }

    fn declarations_for(
        manifest: EnvironmentManifest,
        domain: Option<&str>,
    ) -> Vec<ParameterDeclaration> {
        let input = input(manifest, domain);
        let toggles = FeatureToggles::from_input(&input);
        declared_parameters(&input, &toggles)
    }

    #[test]
    fn test_identity_parameters_are_always_desired() {
        let declarations = declarations_for(EnvironmentManifest::named("test"), None);

        let app = declarations
            .iter()
            .find(|d| d.key == PARAM_APP_NAME)
            .unwrap();
        assert_eq!(
            app.value,
            ParameterValue::Desired(String::from("phonetool"))
        );
        let dns = declarations
            .iter()
            .find(|d| d.key == PARAM_APP_DNS_NAME)
            .unwrap();
        assert_eq!(dns.value, ParameterValue::Desired(String::new()));
    }

    #[test]
    fn test_https_listener_desired_with_domain() {
        let declarations =
            declarations_for(EnvironmentManifest::named("test"), Some("example.com"));

        let listener = declarations
            .iter()
            .find(|d| d.key == PARAM_CREATE_HTTPS_LISTENER)
            .unwrap();
        assert_eq!(
            listener.value,
            ParameterValue::Desired(String::from("true"))
        );
    }

    #[test]
    fn test_https_listener_inherited_without_tls() {
        let declarations = declarations_for(EnvironmentManifest::named("test"), None);

        let listener = declarations
            .iter()
            .find(|d| d.key == PARAM_CREATE_HTTPS_LISTENER)
            .unwrap();
        assert_eq!(
            listener.value,
            ParameterValue::Inherit {
                default: String::from("false")
            }
        );
    }

    #[test]
    fn test_internal_alb_subnets_joined_when_placed() {
        let mut manifest = EnvironmentManifest::named("test");
        manifest.http.private.subnets = vec![String::from("subnet-1"), String::from("subnet-2")];
        let declarations = declarations_for(manifest, None);

        let placement = declarations
            .iter()
            .find(|d| d.key == PARAM_INTERNAL_ALB_SUBNETS)
            .unwrap();
        assert_eq!(
            placement.value,
            ParameterValue::Desired(String::from("subnet-1,subnet-2"))
        );
    }

    #[test]
    fn test_reconcile_keeps_previously_deployed_values() {
        let declarations = declarations_for(EnvironmentManifest::named("test"), None);
        let previous = vec![
            StackParameter::new(PARAM_ALB_WORKLOADS, "frontend,api"),
            StackParameter::new(PARAM_CREATE_HTTPS_LISTENER, "true"),
            StackParameter::new(PARAM_APP_NAME, "stale-app-name"),
        ];

        let reconciled = reconcile(declarations, &previous);

        let lookup = |key: &str| {
            reconciled
                .iter()
                .find(|parameter| parameter.key == key)
                .map(|parameter| parameter.value.clone())
                .unwrap()
        };
        // Inherited keys keep what the stack accumulated.
        assert_eq!(lookup(PARAM_ALB_WORKLOADS), "frontend,api");
        assert_eq!(lookup(PARAM_CREATE_HTTPS_LISTENER), "true");
        // Desired keys ignore the previous deployment.
        assert_eq!(lookup(PARAM_APP_NAME), "phonetool");
    }

    #[test]
    fn test_reconcile_defaults_on_first_deployment() {
        let declarations = declarations_for(EnvironmentManifest::named("test"), None);

        let reconciled = reconcile(declarations, &[]);

        let lookup = |key: &str| {
            reconciled
                .iter()
                .find(|parameter| parameter.key == key)
                .map(|parameter| parameter.value.clone())
                .unwrap()
        };
        assert_eq!(lookup(PARAM_SERVICE_DISCOVERY_ENDPOINT), "test.phonetool.local");
        assert_eq!(lookup(PARAM_ALB_WORKLOADS), "");
        assert_eq!(lookup(PARAM_CREATE_HTTPS_LISTENER), "false");
    }

    #[test]
    fn test_serialized_parameters_use_deployment_file_format() {
        let parameters = vec![
            StackParameter::new(PARAM_APP_NAME, "phonetool"),
            StackParameter::new(PARAM_ENVIRONMENT_NAME, "test"),
        ];

        let json = serialize_parameters(&parameters).unwrap();

        assert!(json.contains("\"ParameterKey\": \"AppName\""));
        assert!(json.contains("\"ParameterValue\": \"phonetool\""));
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), 2);
        assert_eq!(parsed[0]["ParameterKey"], "AppName");
        assert_eq!(parsed[1]["ParameterKey"], "EnvironmentName");
    }
}
