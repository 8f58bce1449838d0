//! Environment manifest types.
//!
//! This module defines the structs that map to the environment manifest
//! file. The manifest declaratively describes the shared infrastructure an
//! environment provides: networking, load balancer listeners, and telemetry.

use serde::{Deserialize, Serialize};

/// Manifest type discriminator for environments.
pub const ENVIRONMENT_MANIFEST_TYPE: &str = "Environment";

/// Default CIDR for a managed VPC.
pub const DEFAULT_VPC_CIDR: &str = "10.0.0.0/16";

/// Default CIDRs for managed public subnets.
pub const DEFAULT_PUBLIC_SUBNET_CIDRS: &[&str] = &["10.0.0.0/24", "10.0.1.0/24"];

/// Default CIDRs for managed private subnets.
pub const DEFAULT_PRIVATE_SUBNET_CIDRS: &[&str] = &["10.0.2.0/24", "10.0.3.0/24"];

/// The root manifest structure for an environment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnvironmentManifest {
    /// Environment name.
    pub name: String,
    /// Manifest type; must be `Environment`.
    #[serde(rename = "type", default = "default_manifest_type")]
    pub manifest_type: String,
    /// Network topology configuration.
    #[serde(default)]
    pub network: NetworkConfig,
    /// Load balancer listener configuration.
    #[serde(default)]
    pub http: HttpConfig,
    /// Telemetry configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Network topology configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkConfig {
    /// VPC configuration.
    #[serde(default)]
    pub vpc: VpcConfig,
}

/// VPC configuration: either managed (CIDR blocks, resources created by the
/// stack) or imported (existing VPC and subnet identifiers).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VpcConfig {
    /// Identifier of an existing VPC to import.
    #[serde(default)]
    pub id: Option<String>,
    /// CIDR block for a managed VPC.
    #[serde(default)]
    pub cidr: Option<String>,
    /// Subnet configuration.
    #[serde(default)]
    pub subnets: SubnetsConfig,
}

/// Public and private subnet groups.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubnetsConfig {
    /// Public subnets.
    #[serde(default)]
    pub public: Vec<SubnetConfig>,
    /// Private subnets.
    #[serde(default)]
    pub private: Vec<SubnetConfig>,
}

/// A single subnet: an imported identifier or a managed CIDR block.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubnetConfig {
    /// Identifier of an existing subnet to import.
    #[serde(default)]
    pub id: Option<String>,
    /// CIDR block for a managed subnet.
    #[serde(default)]
    pub cidr: Option<String>,
    /// Availability zone placement.
    #[serde(default)]
    pub az: Option<String>,
}

/// Load balancer listener configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HttpConfig {
    /// Public load balancer listener.
    #[serde(default)]
    pub public: ListenerConfig,
    /// Internal load balancer listener.
    #[serde(default)]
    pub private: PrivateListenerConfig,
}

/// Public listener configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListenerConfig {
    /// Imported certificate ARNs. The first becomes the primary listener
    /// certificate; the rest attach through association blocks.
    #[serde(default)]
    pub certificates: Vec<String>,
    /// TLS negotiation policy name.
    #[serde(default)]
    pub ssl_policy: Option<String>,
}

/// Internal listener configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrivateListenerConfig {
    /// Imported certificate ARNs for the internal listener.
    #[serde(default)]
    pub certificates: Vec<String>,
    /// Subnet identifiers the internal load balancer is placed in. Defaults
    /// to the environment's private subnets.
    #[serde(default)]
    pub subnets: Vec<String>,
    /// TLS negotiation policy name.
    #[serde(default)]
    pub ssl_policy: Option<String>,
}

/// Telemetry configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObservabilityConfig {
    /// Enables cluster-level container insights.
    #[serde(default)]
    pub container_insights: bool,
}

/// A managed subnet resolved to its effective CIDR block and optional
/// availability zone pin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedSubnet {
    /// CIDR block.
    pub cidr: String,
    /// Declared availability zone, if the manifest pins one.
    pub az: Option<String>,
}

fn default_manifest_type() -> String {
    String::from(ENVIRONMENT_MANIFEST_TYPE)
}

impl EnvironmentManifest {
    /// Creates a minimal manifest with the given environment name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            manifest_type: default_manifest_type(),
            network: NetworkConfig::default(),
            http: HttpConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }

    /// Returns true if the manifest imports an existing VPC.
    #[must_use]
    pub fn is_imported_vpc(&self) -> bool {
        self.network.vpc.id.is_some()
    }

    /// Returns the identifiers of imported public subnets.
    #[must_use]
    pub fn imported_public_subnet_ids(&self) -> Vec<String> {
        Self::subnet_ids(&self.network.vpc.subnets.public)
    }

    /// Returns the identifiers of imported private subnets.
    #[must_use]
    pub fn imported_private_subnet_ids(&self) -> Vec<String> {
        Self::subnet_ids(&self.network.vpc.subnets.private)
    }

    /// Returns the effective CIDR of a managed VPC.
    #[must_use]
    pub fn vpc_cidr(&self) -> String {
        self.network
            .vpc
            .cidr
            .clone()
            .unwrap_or_else(|| String::from(DEFAULT_VPC_CIDR))
    }

    /// Returns the managed public subnets with defaults applied.
    #[must_use]
    pub fn public_managed_subnets(&self) -> Vec<ManagedSubnet> {
        Self::managed_subnets(&self.network.vpc.subnets.public, DEFAULT_PUBLIC_SUBNET_CIDRS)
    }

    /// Returns the managed private subnets with defaults applied.
    #[must_use]
    pub fn private_managed_subnets(&self) -> Vec<ManagedSubnet> {
        Self::managed_subnets(
            &self.network.vpc.subnets.private,
            DEFAULT_PRIVATE_SUBNET_CIDRS,
        )
    }

    fn subnet_ids(subnets: &[SubnetConfig]) -> Vec<String> {
        subnets.iter().filter_map(|s| s.id.clone()).collect()
    }

    fn managed_subnets(subnets: &[SubnetConfig], defaults: &[&str]) -> Vec<ManagedSubnet> {
        let declared: Vec<ManagedSubnet> = subnets
            .iter()
            .filter_map(|s| {
                s.cidr.clone().map(|cidr| ManagedSubnet {
                    cidr,
                    az: s.az.clone(),
                })
            })
            .collect();
        if declared.is_empty() {
            defaults
                .iter()
                .map(|cidr| ManagedSubnet {
                    cidr: (*cidr).to_string(),
                    az: None,
                })
                .collect()
        } else {
            declared
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_managed_defaults() {
        let manifest = EnvironmentManifest::named("test");
        assert!(!manifest.is_imported_vpc());
        assert_eq!(manifest.vpc_cidr(), "10.0.0.0/16");

        let public = manifest.public_managed_subnets();
        assert_eq!(public.len(), 2);
        assert_eq!(public[0].cidr, "10.0.0.0/24");
        assert_eq!(public[1].cidr, "10.0.1.0/24");
        assert!(public.iter().all(|subnet| subnet.az.is_none()));

        let private = manifest.private_managed_subnets();
        assert_eq!(private[0].cidr, "10.0.2.0/24");
        assert_eq!(private[1].cidr, "10.0.3.0/24");
    }

    #[test]
    fn test_declared_subnets_keep_their_az() {
        let mut manifest = EnvironmentManifest::named("test");
        manifest.network.vpc.subnets.public = vec![
            SubnetConfig {
                id: None,
                cidr: Some(String::from("10.1.0.0/24")),
                az: Some(String::from("us-west-2a")),
            },
            SubnetConfig {
                id: None,
                cidr: Some(String::from("10.1.1.0/24")),
                az: None,
            },
        ];

        let public = manifest.public_managed_subnets();
        assert_eq!(
            public,
            vec![
                ManagedSubnet {
                    cidr: String::from("10.1.0.0/24"),
                    az: Some(String::from("us-west-2a")),
                },
                ManagedSubnet {
                    cidr: String::from("10.1.1.0/24"),
                    az: None,
                },
            ]
        );
    }

    #[test]
    fn test_imported_subnet_ids() {
        let mut manifest = EnvironmentManifest::named("test");
        manifest.network.vpc.id = Some(String::from("vpc-012345"));
        manifest.network.vpc.subnets.public = vec![
            SubnetConfig {
                id: Some(String::from("subnet-aaa")),
                cidr: None,
                az: None,
            },
            SubnetConfig {
                id: Some(String::from("subnet-bbb")),
                cidr: None,
                az: None,
            },
        ];

        assert!(manifest.is_imported_vpc());
        assert_eq!(
            manifest.imported_public_subnet_ids(),
            vec!["subnet-aaa", "subnet-bbb"]
        );
        assert!(manifest.imported_private_subnet_ids().is_empty());
    }
}
