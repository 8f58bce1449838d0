//! Content-addressed catalog of custom resource bundles.
//!
//! The Lambda payloads backing the stack's custom resources are embedded in
//! the binary and addressed by the hash of their contents. A bundle's key
//! changes if and only if its payload changes, so uploads are idempotent
//! and previously deployed stacks keep referencing the bytes they were
//! deployed with.

use sha2::{Digest, Sha256};

/// Function requesting and validating the environment's ACM certificate.
pub const CERTIFICATE_VALIDATION_FUNCTION: &str = "CertificateValidationFunction";
/// Function managing alias records in the environment's hosted zone.
pub const CUSTOM_DOMAIN_FUNCTION: &str = "CustomDomainFunction";
/// Function writing delegation records into the application's hosted zone.
pub const DNS_DELEGATION_FUNCTION: &str = "DNSDelegationFunction";

const ARTIFACT_KEY_PREFIX: &str = "manual/scripts/custom-resources";

/// A custom resource bundle with its embedded payload.
#[derive(Debug, Clone)]
pub struct CustomResourceBundle {
    name: &'static str,
    payload: &'static str,
}

impl CustomResourceBundle {
    const fn new(name: &'static str, payload: &'static str) -> Self {
        Self { name, payload }
    }

    /// The function name the template references.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The bundle's JavaScript source.
    #[must_use]
    pub const fn payload(&self) -> &'static str {
        self.payload
    }

    /// The content-addressed object key for this bundle.
    #[must_use]
    pub fn artifact_key(&self) -> String {
        let digest = hex::encode(Sha256::digest(self.payload.as_bytes()));
        format!(
            "{ARTIFACT_KEY_PREFIX}/{}/{digest}.js",
            self.name.to_lowercase()
        )
    }
}

/// Returns the bundles an environment stack needs staged.
#[must_use]
pub fn environment_bundles() -> Vec<CustomResourceBundle> {
    vec![
        CustomResourceBundle::new(
            CERTIFICATE_VALIDATION_FUNCTION,
            include_str!("../../templates/custom-resources/dns-cert-validator.js"),
        ),
        CustomResourceBundle::new(
            CUSTOM_DOMAIN_FUNCTION,
            include_str!("../../templates/custom-resources/custom-domain.js"),
        ),
        CustomResourceBundle::new(
            DNS_DELEGATION_FUNCTION,
            include_str!("../../templates/custom-resources/dns-delegation.js"),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_bundles_cover_all_functions() {
        let names: Vec<&str> = environment_bundles().iter().map(|b| b.name()).collect();
        assert_eq!(
            names,
            vec![
                CERTIFICATE_VALIDATION_FUNCTION,
                CUSTOM_DOMAIN_FUNCTION,
                DNS_DELEGATION_FUNCTION,
            ]
        );
    }

    #[test]
    fn test_artifact_key_is_content_addressed() {
        let bundle = CustomResourceBundle::new(DNS_DELEGATION_FUNCTION, "exports.handler = 1;\n");

        let key = bundle.artifact_key();

        assert!(key.starts_with("manual/scripts/custom-resources/dnsdelegationfunction/"));
        assert!(key.ends_with(".js"));
        let digest = key
            .rsplit('/')
            .next()
            .unwrap()
            .strip_suffix(".js")
            .unwrap();
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_artifact_key_is_stable() {
        for bundle in environment_bundles() {
            assert_eq!(bundle.artifact_key(), bundle.artifact_key());
        }
    }

    #[test]
    fn test_payload_changes_the_key() {
        let one = CustomResourceBundle::new(CUSTOM_DOMAIN_FUNCTION, "a");
        let two = CustomResourceBundle::new(CUSTOM_DOMAIN_FUNCTION, "b");
        assert_ne!(one.artifact_key(), two.artifact_key());
    }

    #[test]
    fn test_bundles_are_nonempty() {
        for bundle in environment_bundles() {
            assert!(!bundle.payload().is_empty(), "{} is empty", bundle.name());
        }
    }
}
