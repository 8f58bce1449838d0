//! Environment stack synthesis.
//!
//! The synthesizer owns the desired state and the previously deployed
//! parameter set, and renders both deployment artifacts from them: the
//! template body and the reconciled parameter file.

use crate::cloud::StackParameter;
use crate::error::{ParameterError, TemplateError};

use super::input::DesiredStackInput;
use super::params;
use super::resources;
use super::template::{EnvTemplate, TemplateMetadata};
use super::toggles::FeatureToggles;

/// Renders deployable stack artifacts from desired state.
///
/// The deployer treats stack rendering as a collaborator so alternate
/// synthesis strategies can be swapped in behind this seam.
pub trait StackSerializer: Send + Sync {
    /// Renders the CloudFormation template body.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError`] when toggle evaluation or section
    /// synthesis fails.
    fn template(&self) -> Result<String, TemplateError>;

    /// Reconciles declared parameters against the previous deployment.
    fn reconciled_parameters(&self) -> Vec<StackParameter>;

    /// Renders the reconciled parameters in the deployment file format.
    ///
    /// # Errors
    ///
    /// Returns [`ParameterError`] when serialization fails.
    fn serialized_parameters(&self) -> Result<String, ParameterError> {
        params::serialize_parameters(&self.reconciled_parameters())
    }
}

/// Synthesizes the environment stack from desired state and the parameters
/// of the previous deployment.
pub struct EnvStackSynthesizer {
    input: DesiredStackInput,
    previous: Vec<StackParameter>,
}

impl EnvStackSynthesizer {
    /// Creates a synthesizer for one deployment.
    #[must_use]
    pub const fn new(input: DesiredStackInput, previous: Vec<StackParameter>) -> Self {
        Self { input, previous }
    }

    fn build_template(&self) -> Result<EnvTemplate, TemplateError> {
        let toggles = FeatureToggles::from_input(&self.input);
        toggles.validate()?;
        Ok(EnvTemplate {
            description: format!(
                "Shared infrastructure for the {} environment of application {}.",
                self.input.name, self.input.app.name
            ),
            metadata: TemplateMetadata {
                manifest: self.input.raw_manifest.clone(),
                version: self.input.version.clone(),
            },
            parameters: resources::parameters(),
            conditions: resources::conditions(),
            resources: resources::resources(&self.input, &toggles)?,
            outputs: resources::outputs(&toggles),
        })
    }
}

impl StackSerializer for EnvStackSynthesizer {
    fn template(&self) -> Result<String, TemplateError> {
        self.build_template()?.render()
    }

    fn reconciled_parameters(&self) -> Vec<StackParameter> {
        let toggles = FeatureToggles::from_input(&self.input);
        params::reconcile(
            params::declared_parameters(&self.input, &toggles),
            &self.previous,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::EnvironmentManifest;
    use crate::stack::input::{AppInformation, LATEST_ENV_TEMPLATE_VERSION};
    use std::collections::{BTreeMap, HashMap};

    fn desired_input(domain: Option<&str>) -> DesiredStackInput {
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
            manifest: EnvironmentManifest::named("test"),
            raw_manifest: String::from("name: test\ntype: Environment\n"),
            version: String::from(LATEST_ENV_TEMPLATE_VERSION),
        }
    }

    #[test]
    fn test_template_renders_all_sections() {
        let synthesizer = EnvStackSynthesizer::new(desired_input(None), vec![]);

        let template = synthesizer.template().unwrap();

        assert!(template.contains("Description: Shared infrastructure for the test environment"));
        assert!(template.contains("Version: v1.24.0"));
        assert!(template.contains("name: test"));
        assert!(template.contains("Parameters:"));
        assert!(template.contains("Resources:"));
        assert!(template.contains("Outputs:"));
        assert!(template.contains("Cluster"));
    }

    #[test]
    fn test_template_requires_staged_urls_with_domain() {
        let synthesizer = EnvStackSynthesizer::new(desired_input(Some("example.com")), vec![]);

        let err = synthesizer.template().unwrap_err();
        assert!(
            err.to_string()
                .starts_with("no staged URL for custom resource function")
        );
    }

    #[test]
    fn test_parameters_reconcile_against_previous_deployment() {
        let previous = vec![
            StackParameter::new("ALBWorkloads", "frontend"),
            StackParameter::new("ServiceDiscoveryEndpoint", "legacy.phonetool.local"),
        ];
        let synthesizer = EnvStackSynthesizer::new(desired_input(None), previous);

        let reconciled = synthesizer.reconciled_parameters();
        let lookup = |key: &str| {
            reconciled
                .iter()
                .find(|parameter| parameter.key == key)
                .map(|parameter| parameter.value.clone())
                .unwrap()
        };
        assert_eq!(lookup("ALBWorkloads"), "frontend");
        assert_eq!(lookup("ServiceDiscoveryEndpoint"), "legacy.phonetool.local");
        assert_eq!(lookup("AppName"), "phonetool");

        let json = synthesizer.serialized_parameters().unwrap();
        assert!(json.contains("\"ParameterValue\": \"frontend\""));
    }

    #[test]
    fn test_invalid_toggles_fail_synthesis() {
        let mut input = desired_input(None);
        // An imported VPC without subnet identifiers cannot be synthesized.
        input.manifest.network.vpc.id = Some(String::from("vpc-123"));

        let synthesizer = EnvStackSynthesizer::new(input, vec![]);
        let err = synthesizer.template().unwrap_err();
        assert!(err.to_string().starts_with("inconsistent feature toggles"));
    }
}
