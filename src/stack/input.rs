//! Desired-state inputs for environment stack synthesis.
//!
//! [`DesiredStackInput`] is the complete record the synthesizer needs to
//! produce a template and parameter set. It is built fresh per deployment
//! call and never cached.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::manifest::EnvironmentManifest;

/// Schema version stamped into synthesized environment templates.
///
/// Bumped whenever the template's parameter or output surface changes shape.
pub const LATEST_ENV_TEMPLATE_VERSION: &str = "v1.24.0";

/// Application identity carried into a stack input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppInformation {
    /// Application name.
    pub name: String,
    /// Optional custom DNS root owned by the application.
    pub domain: Option<String>,
    /// Principal ARN of the application's root account, for cross-account
    /// trust.
    pub account_principal_arn: String,
}

/// The complete desired state for one environment stack synthesis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DesiredStackInput {
    /// Environment name.
    pub name: String,
    /// Application identity.
    pub app: AppInformation,
    /// Tags applied to the stack in addition to the defaults.
    pub additional_tags: BTreeMap<String, String>,
    /// Staged custom resource URLs, keyed by function name.
    pub custom_resources_urls: HashMap<String, String>,
    /// Partition-qualified ARN of the artifact bucket.
    pub artifact_bucket_arn: String,
    /// ARN of the artifact encryption key.
    pub artifact_bucket_key_arn: String,
    /// Typed environment manifest.
    pub manifest: EnvironmentManifest,
    /// Raw manifest text, embedded into template metadata for provenance.
    pub raw_manifest: String,
    /// Template schema version.
    pub version: String,
}

/// Caller-supplied input to the deployment operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployEnvironmentInput {
    /// Principal ARN of the application's root account.
    pub root_user_arn: String,
    /// Staged custom resource URLs, normally the output of an artifact
    /// upload.
    pub custom_resources_urls: HashMap<String, String>,
    /// Typed environment manifest.
    pub manifest: EnvironmentManifest,
    /// Raw manifest text.
    pub raw_manifest: String,
}

/// Rendered template and serialized parameters, the observable artifact of
/// a preview call.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DeploymentOutput {
    /// Rendered template body.
    pub template: String,
    /// Serialized parameter list.
    pub parameters: String,
}

impl DesiredStackInput {
    /// Computes the DNS delegation role ARN for the application, derived
    /// from the account in the root principal ARN.
    ///
    /// Returns `None` when the application has no domain or the principal
    /// ARN does not parse.
    #[must_use]
    pub fn app_dns_delegation_role(&self) -> Option<String> {
        self.app.domain.as_ref()?;

        // arn:partition:service:region:account:resource
        let parts: Vec<&str> = self.app.account_principal_arn.splitn(6, ':').collect();
        if parts.len() != 6 || parts[0] != "arn" || parts[1].is_empty() || parts[4].is_empty() {
            return None;
        }

        Some(format!(
            "arn:{}:iam::{}:role/{}-DNSDelegationRole",
            parts[1], parts[4], self.app.name
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::EnvironmentManifest;

    fn input_with(domain: Option<&str>, principal: &str) -> DesiredStackInput {
        DesiredStackInput {
            name: String::from("test"),
            app: AppInformation {
                name: String::from("phonetool"),
                domain: domain.map(String::from),
                account_principal_arn: String::from(principal),
            },
            additional_tags: BTreeMap::new(),
            custom_resources_urls: HashMap::new(),
            artifact_bucket_arn: String::from("arn:aws:s3:::mockbucket"),
            artifact_bucket_key_arn: String::from("mockKMS"),
            manifest: EnvironmentManifest::named("test"),
            raw_manifest: String::from("name: test\ntype: Environment\n"),
            version: String::from(LATEST_ENV_TEMPLATE_VERSION),
        }
    }

    #[test]
    fn test_dns_delegation_role() {
        let input = input_with(Some("example.com"), "arn:aws:iam::1111:root");
        assert_eq!(
            input.app_dns_delegation_role().unwrap(),
            "arn:aws:iam::1111:role/phonetool-DNSDelegationRole"
        );
    }

    #[test]
    fn test_dns_delegation_role_without_domain() {
        let input = input_with(None, "arn:aws:iam::1111:root");
        assert!(input.app_dns_delegation_role().is_none());
    }

    #[test]
    fn test_dns_delegation_role_with_bad_arn() {
        let input = input_with(Some("example.com"), "not-an-arn");
        assert!(input.app_dns_delegation_role().is_none());
    }
}
