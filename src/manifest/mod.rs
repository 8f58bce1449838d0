//! Environment manifest module.
//!
//! This module handles everything manifest-related:
//! - Parsing and deserializing the environment manifest file
//! - Environment variable and .env overrides
//! - Structural validation ahead of template synthesis

mod parser;
mod spec;
mod validator;

pub use parser::{DEFAULT_MANIFEST_FILES, ManifestParser, find_manifest_file};
pub use spec::{
    DEFAULT_PRIVATE_SUBNET_CIDRS, DEFAULT_PUBLIC_SUBNET_CIDRS, DEFAULT_VPC_CIDR,
    ENVIRONMENT_MANIFEST_TYPE, EnvironmentManifest, HttpConfig, ListenerConfig, ManagedSubnet,
    NetworkConfig, ObservabilityConfig, PrivateListenerConfig, SubnetConfig, SubnetsConfig,
    VpcConfig,
};
pub use validator::{ManifestValidator, ValidationIssue, ValidationReport};
