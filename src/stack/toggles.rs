//! Feature toggle evaluation for environment templates.
//!
//! Each toggle maps the desired state onto exactly one of a small
//! enumerated set of states before any resource synthesis happens, so the
//! template assembly downstream never sees a partially enabled feature.

use crate::error::TemplateError;
use crate::manifest::ManagedSubnet;

use super::input::DesiredStackInput;

/// VPC topology: resources created by the stack, or identifiers imported
/// from an existing network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VpcTopology {
    /// The stack creates the VPC and its subnets from CIDR blocks.
    Managed {
        /// VPC CIDR block.
        cidr: String,
        /// Public subnets to create.
        public_subnets: Vec<ManagedSubnet>,
        /// Private subnets to create.
        private_subnets: Vec<ManagedSubnet>,
    },
    /// The stack references an existing VPC and its subnets.
    Imported {
        /// Imported VPC identifier.
        id: String,
        /// Imported public subnet identifiers.
        public_ids: Vec<String>,
        /// Imported private subnet identifiers.
        private_ids: Vec<String>,
    },
}

impl VpcTopology {
    /// Returns true for an imported topology.
    #[must_use]
    pub const fn is_imported(&self) -> bool {
        matches!(self, Self::Imported { .. })
    }
}

/// Where a listener's TLS certificates come from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CertificateSource {
    /// No TLS on this listener.
    #[default]
    None,
    /// Operator-imported certificate ARNs. The first is the primary
    /// listener certificate; the rest attach via association blocks.
    Imported(Vec<String>),
    /// A certificate requested and validated by the stack's custom
    /// resources, available only with DNS delegation.
    Managed,
}

impl CertificateSource {
    /// Returns true if the listener gets an HTTPS listener at all.
    #[must_use]
    pub const fn enables_https(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// The full toggle set driving template shape.
///
/// Evaluation is total: every toggle is in exactly one state once
/// [`FeatureToggles::from_input`] returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureToggles {
    /// VPC topology.
    pub vpc: VpcTopology,
    /// Public listener certificate source.
    pub public_certificates: CertificateSource,
    /// Internal listener certificate source. Never `Managed`.
    pub internal_certificates: CertificateSource,
    /// Imported subnet placement for the internal load balancer; empty
    /// means the environment's private subnets.
    pub internal_alb_subnets: Vec<String>,
    /// Whether the application delegates a DNS zone to this environment.
    pub dns_delegation: bool,
    /// Whether cluster-level container insights are enabled.
    pub container_insights: bool,
}

impl FeatureToggles {
    /// Derives the toggle set from a desired stack input.
    #[must_use]
    pub fn from_input(input: &DesiredStackInput) -> Self {
        let manifest = &input.manifest;

        let vpc = if manifest.is_imported_vpc() {
            VpcTopology::Imported {
                id: manifest.network.vpc.id.clone().unwrap_or_default(),
                public_ids: manifest.imported_public_subnet_ids(),
                private_ids: manifest.imported_private_subnet_ids(),
            }
        } else {
            VpcTopology::Managed {
                cidr: manifest.vpc_cidr(),
                public_subnets: manifest.public_managed_subnets(),
                private_subnets: manifest.private_managed_subnets(),
            }
        };

        let public_certificates = if manifest.http.public.certificates.is_empty() {
            if input.app.domain.is_some() {
                CertificateSource::Managed
            } else {
                CertificateSource::None
            }
        } else {
            CertificateSource::Imported(manifest.http.public.certificates.clone())
        };

        let internal_certificates = if manifest.http.private.certificates.is_empty() {
            CertificateSource::None
        } else {
            CertificateSource::Imported(manifest.http.private.certificates.clone())
        };

        Self {
            vpc,
            public_certificates,
            internal_certificates,
            internal_alb_subnets: manifest.http.private.subnets.clone(),
            dns_delegation: input.app.domain.is_some(),
            container_insights: manifest.observability.container_insights,
        }
    }

    /// Checks the toggle set's internal invariants.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::ToggleState`] if any invariant is violated.
    pub fn validate(&self) -> Result<(), TemplateError> {
        if let CertificateSource::Imported(certs) = &self.public_certificates {
            if certs.is_empty() {
                return Err(toggle_error("imported public certificate set is empty"));
            }
        }

        if let CertificateSource::Imported(certs) = &self.internal_certificates {
            if certs.is_empty() {
                return Err(toggle_error("imported internal certificate set is empty"));
            }
        }

        if self.public_certificates == CertificateSource::Managed && !self.dns_delegation {
            return Err(toggle_error(
                "managed certificates require an application domain",
            ));
        }

        if self.internal_certificates == CertificateSource::Managed {
            return Err(toggle_error(
                "internal listeners only support imported certificates",
            ));
        }

        if let VpcTopology::Imported {
            public_ids,
            private_ids,
            ..
        } = &self.vpc
        {
            if public_ids.is_empty() || private_ids.is_empty() {
                return Err(toggle_error(
                    "an imported VPC must supply public and private subnet identifiers",
                ));
            }
        }

        Ok(())
    }

    /// Returns true when the template wires a public HTTPS listener.
    #[must_use]
    pub const fn https_listener(&self) -> bool {
        self.public_certificates.enables_https()
    }

    /// Returns true when the template wires an internal HTTPS listener.
    #[must_use]
    pub const fn internal_https_listener(&self) -> bool {
        self.internal_certificates.enables_https()
    }

    /// Returns true when the template creates the private hosted zone.
    ///
    /// An internal listener with imported certificates suppresses the zone;
    /// DNS is then owned by the certificate's domain.
    #[must_use]
    pub const fn private_hosted_zone(&self) -> bool {
        !matches!(self.internal_certificates, CertificateSource::Imported(_))
    }
}

fn toggle_error(reason: &str) -> TemplateError {
    TemplateError::ToggleState {
        reason: reason.to_string(),
    }
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

    #[test]
    fn test_defaults_to_managed_vpc_without_tls() {
        let toggles = FeatureToggles::from_input(&input(EnvironmentManifest::named("test"), None));

        assert!(!toggles.vpc.is_imported());
        assert_eq!(toggles.public_certificates, CertificateSource::None);
        assert!(!toggles.https_listener());
        assert!(!toggles.dns_delegation);
        assert!(toggles.private_hosted_zone());
        assert!(toggles.validate().is_ok());
    }

    #[test]
    fn test_domain_implies_managed_certificates() {
        let toggles = FeatureToggles::from_input(&input(
            EnvironmentManifest::named("test"),
            Some("example.com"),
        ));

        assert_eq!(toggles.public_certificates, CertificateSource::Managed);
        assert!(toggles.https_listener());
        assert!(toggles.dns_delegation);
        assert!(toggles.validate().is_ok());
    }

    #[test]
    fn test_imported_certificates_win_over_domain() {
        let mut manifest = EnvironmentManifest::named("test");
        manifest.http.public.certificates = vec![String::from("arn:cert/one")];

        let toggles = FeatureToggles::from_input(&input(manifest, Some("example.com")));
        assert_eq!(
            toggles.public_certificates,
            CertificateSource::Imported(vec![String::from("arn:cert/one")])
        );
    }

    #[test]
    fn test_internal_imported_certs_suppress_private_zone() {
        let mut manifest = EnvironmentManifest::named("test");
        manifest.http.private.certificates = vec![String::from("arn:cert/internal")];

        let toggles = FeatureToggles::from_input(&input(manifest, None));
        assert!(toggles.internal_https_listener());
        assert!(!toggles.private_hosted_zone());
    }

    #[test]
    fn test_validate_rejects_empty_imported_certs() {
        let mut toggles =
            FeatureToggles::from_input(&input(EnvironmentManifest::named("test"), None));
        toggles.public_certificates = CertificateSource::Imported(vec![]);

        let err = toggles.validate().unwrap_err();
        assert!(err.to_string().contains("imported public certificate set is empty"));
    }

    #[test]
    fn test_validate_rejects_managed_certs_without_domain() {
        let mut toggles =
            FeatureToggles::from_input(&input(EnvironmentManifest::named("test"), None));
        toggles.public_certificates = CertificateSource::Managed;

        let err = toggles.validate().unwrap_err();
        assert!(err.to_string().contains("managed certificates require"));
    }
}
