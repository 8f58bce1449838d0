//! Custom resource artifact handling.
//!
//! Environment stacks with DNS delegation rely on Lambda-backed custom
//! resources. This module owns their embedded payloads and stages them
//! into the application's regional artifact bucket ahead of deployment.

mod catalog;
mod stager;

pub use catalog::{
    CERTIFICATE_VALIDATION_FUNCTION, CUSTOM_DOMAIN_FUNCTION, CustomResourceBundle,
    DNS_DELEGATION_FUNCTION, environment_bundles,
};
pub use stager::ArtifactStager;
