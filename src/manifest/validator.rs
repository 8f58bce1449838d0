//! Manifest validation.
//!
//! This module checks an environment manifest for structural consistency
//! before any template synthesis runs, so toggle evaluation downstream can
//! assume a well-formed input.

use crate::error::{EnvForgeError, ManifestError, Result};
use std::collections::HashSet;
use tracing::debug;

use super::spec::{ENVIRONMENT_MANIFEST_TYPE, EnvironmentManifest, SubnetConfig};

/// Validator for environment manifests.
#[derive(Debug, Default)]
pub struct ManifestValidator;

/// Validation result containing all issues found.
#[derive(Debug, Default)]
pub struct ValidationReport {
    /// List of validation errors.
    pub errors: Vec<ValidationIssue>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationIssue {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ValidationReport {
    /// Returns true if no errors were found.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(ValidationIssue {
            field: field.to_string(),
            message: message.into(),
        });
    }
}

impl ManifestValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates an environment manifest.
    ///
    /// # Errors
    ///
    /// Returns the first validation error found; the full report (errors
    /// and warnings) is available on success.
    pub fn validate(&self, manifest: &EnvironmentManifest) -> Result<ValidationReport> {
        let mut report = ValidationReport::default();

        Self::validate_identity(manifest, &mut report);
        Self::validate_vpc(manifest, &mut report);
        Self::validate_listeners(manifest, &mut report);

        if report.errors.is_empty() {
            debug!("Manifest validation passed");
            Ok(report)
        } else {
            let first = &report.errors[0];
            Err(EnvForgeError::Manifest(ManifestError::Validation {
                message: first.message.clone(),
                field: Some(first.field.clone()),
            }))
        }
    }

    /// Validates the manifest's name and type.
    fn validate_identity(manifest: &EnvironmentManifest, report: &mut ValidationReport) {
        if manifest.name.is_empty() {
            report.error("name", "Environment name cannot be empty");
        } else if !is_valid_name(&manifest.name) {
            report.error(
                "name",
                format!(
                    "Environment name '{}' is invalid. Must be lowercase alphanumeric with hyphens.",
                    manifest.name
                ),
            );
        }

        if manifest.manifest_type != ENVIRONMENT_MANIFEST_TYPE {
            report.error(
                "type",
                format!(
                    "Manifest type must be '{ENVIRONMENT_MANIFEST_TYPE}', found '{}'",
                    manifest.manifest_type
                ),
            );
        }
    }

    /// Validates the VPC topology: fully managed or fully imported.
    fn validate_vpc(manifest: &EnvironmentManifest, report: &mut ValidationReport) {
        let vpc = &manifest.network.vpc;

        if vpc.id.is_some() && vpc.cidr.is_some() {
            report.error(
                "network.vpc",
                "A VPC cannot declare both an imported 'id' and a managed 'cidr'",
            );
            return;
        }

        if vpc.id.is_some() {
            Self::validate_imported_subnets(&vpc.subnets.public, "public", report);
            Self::validate_imported_subnets(&vpc.subnets.private, "private", report);
        } else {
            Self::validate_managed_subnets(&vpc.subnets.public, "public", report);
            Self::validate_managed_subnets(&vpc.subnets.private, "private", report);
            Self::validate_subnet_balance(manifest, report);
        }
    }

    /// Imported VPCs must import at least one subnet of each kind, by id.
    fn validate_imported_subnets(
        subnets: &[SubnetConfig],
        group: &str,
        report: &mut ValidationReport,
    ) {
        let field = format!("network.vpc.subnets.{group}");

        if subnets.iter().all(|s| s.id.is_none()) {
            report.error(
                &field,
                format!("An imported VPC must import at least one {group} subnet by 'id'"),
            );
        }

        for subnet in subnets {
            if subnet.cidr.is_some() {
                report.error(
                    &field,
                    "Subnets of an imported VPC must use 'id', not 'cidr'",
                );
                return;
            }
        }
    }

    /// Managed VPCs declare subnets by CIDR only.
    fn validate_managed_subnets(
        subnets: &[SubnetConfig],
        group: &str,
        report: &mut ValidationReport,
    ) {
        let field = format!("network.vpc.subnets.{group}");

        for subnet in subnets {
            if subnet.id.is_some() {
                report.error(
                    &field,
                    "Subnets of a managed VPC must use 'cidr', not 'id'",
                );
                return;
            }
        }

        if subnets.len() > 2 {
            report.error(
                &field,
                format!("A managed VPC supports at most 2 {group} subnets, found {}", subnets.len()),
            );
        }
    }

    /// Each private subnet routes through a NAT gateway placed in the public
    /// subnet with the same ordinal. The check runs on the effective subnet
    /// sets so a group that falls back to the defaults counts as 2.
    fn validate_subnet_balance(manifest: &EnvironmentManifest, report: &mut ValidationReport) {
        let public = manifest.public_managed_subnets().len();
        let private = manifest.private_managed_subnets().len();
        if public < private {
            report.error(
                "network.vpc.subnets",
                format!(
                    "Each private subnet's NAT gateway needs a public subnet, found {public} public and {private} private"
                ),
            );
        }
    }

    /// Validates listener certificate lists.
    fn validate_listeners(manifest: &EnvironmentManifest, report: &mut ValidationReport) {
        Self::validate_certificates(
            &manifest.http.public.certificates,
            "http.public.certificates",
            report,
        );
        Self::validate_certificates(
            &manifest.http.private.certificates,
            "http.private.certificates",
            report,
        );

        if manifest.http.public.ssl_policy.is_some()
            && manifest.http.public.certificates.is_empty()
        {
            report.warnings.push(String::from(
                "http.public.ssl_policy has no effect without imported certificates or an application domain",
            ));
        }
    }

    fn validate_certificates(
        certificates: &[String],
        field: &str,
        report: &mut ValidationReport,
    ) {
        let mut seen = HashSet::new();
        for cert in certificates {
            if cert.is_empty() {
                report.error(field, "Certificate ARNs cannot be empty");
                return;
            }
            if !seen.insert(cert.as_str()) {
                report.error(field, format!("Duplicate certificate ARN: {cert}"));
                return;
            }
        }
    }
}

/// Checks whether a name is lowercase alphanumeric with hyphens.
fn is_valid_name(name: &str) -> bool {
    name.chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !name.starts_with('-')
        && !name.ends_with('-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::spec::SubnetConfig;

    fn imported_subnet(id: &str) -> SubnetConfig {
        SubnetConfig {
            id: Some(id.to_string()),
            cidr: None,
            az: None,
        }
    }

    fn managed_subnet(cidr: &str) -> SubnetConfig {
        SubnetConfig {
            id: None,
            cidr: Some(cidr.to_string()),
            az: None,
        }
    }

    #[test]
    fn test_valid_default_manifest() {
        let manifest = EnvironmentManifest::named("test");
        let report = ManifestValidator::new().validate(&manifest).unwrap();
        assert!(report.is_valid());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_rejects_wrong_type() {
        let mut manifest = EnvironmentManifest::named("test");
        manifest.manifest_type = String::from("Service");

        let err = ManifestValidator::new().validate(&manifest).unwrap_err();
        assert!(err.to_string().contains("Manifest type must be 'Environment'"));
    }

    #[test]
    fn test_rejects_vpc_with_id_and_cidr() {
        let mut manifest = EnvironmentManifest::named("test");
        manifest.network.vpc.id = Some(String::from("vpc-012345"));
        manifest.network.vpc.cidr = Some(String::from("10.1.0.0/16"));

        let err = ManifestValidator::new().validate(&manifest).unwrap_err();
        assert!(err.to_string().contains("both an imported 'id' and a managed 'cidr'"));
    }

    #[test]
    fn test_rejects_imported_vpc_without_subnet_ids() {
        let mut manifest = EnvironmentManifest::named("test");
        manifest.network.vpc.id = Some(String::from("vpc-012345"));

        let err = ManifestValidator::new().validate(&manifest).unwrap_err();
        assert!(err.to_string().contains("must import at least one public subnet"));
    }

    #[test]
    fn test_accepts_fully_imported_vpc() {
        let mut manifest = EnvironmentManifest::named("test");
        manifest.network.vpc.id = Some(String::from("vpc-012345"));
        manifest.network.vpc.subnets.public = vec![imported_subnet("subnet-011")];
        manifest.network.vpc.subnets.private = vec![imported_subnet("subnet-022")];

        let report = ManifestValidator::new().validate(&manifest).unwrap();
        assert!(report.is_valid());
    }

    #[test]
    fn test_rejects_fewer_public_than_private_subnets() {
        let mut manifest = EnvironmentManifest::named("test");
        manifest.network.vpc.subnets.public = vec![managed_subnet("10.0.0.0/24")];
        manifest.network.vpc.subnets.private = vec![
            managed_subnet("10.0.2.0/24"),
            managed_subnet("10.0.3.0/24"),
        ];

        let err = ManifestValidator::new().validate(&manifest).unwrap_err();
        assert!(err.to_string().contains("found 1 public and 2 private"));
    }

    #[test]
    fn test_rejects_single_public_subnet_with_default_private() {
        // An empty private group falls back to the two default CIDRs, so a
        // lone public subnet still cannot host both NAT gateways.
        let mut manifest = EnvironmentManifest::named("test");
        manifest.network.vpc.subnets.public = vec![managed_subnet("10.0.0.0/24")];

        let err = ManifestValidator::new().validate(&manifest).unwrap_err();
        assert!(err.to_string().contains("found 1 public and 2 private"));
    }

    #[test]
    fn test_accepts_more_public_than_private_subnets() {
        let mut manifest = EnvironmentManifest::named("test");
        manifest.network.vpc.subnets.public = vec![
            managed_subnet("10.0.0.0/24"),
            managed_subnet("10.0.1.0/24"),
        ];
        manifest.network.vpc.subnets.private = vec![managed_subnet("10.0.2.0/24")];

        let report = ManifestValidator::new().validate(&manifest).unwrap();
        assert!(report.is_valid());
    }

    #[test]
    fn test_rejects_duplicate_certificates() {
        let mut manifest = EnvironmentManifest::named("test");
        manifest.http.public.certificates = vec![
            String::from("arn:aws:acm:us-west-2:1111:certificate/abc"),
            String::from("arn:aws:acm:us-west-2:1111:certificate/abc"),
        ];

        let err = ManifestValidator::new().validate(&manifest).unwrap_err();
        assert!(err.to_string().contains("Duplicate certificate ARN"));
    }

    #[test]
    fn test_warns_on_ssl_policy_without_certs() {
        let mut manifest = EnvironmentManifest::named("test");
        manifest.http.public.ssl_policy = Some(String::from("ELBSecurityPolicy-TLS13-1-2-2021-06"));

        let report = ManifestValidator::new().validate(&manifest).unwrap();
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 1);
    }
}
