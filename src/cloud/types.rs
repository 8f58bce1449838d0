//! Core identity types shared across the deployment pipeline.
//!
//! These records describe the application and environment being deployed.
//! They are immutable inputs owned by the caller; nothing in the pipeline
//! mutates them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An application: the top-level grouping that owns environments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Application {
    /// Application name.
    pub name: String,
    /// Optional custom DNS root owned by the application.
    #[serde(default)]
    pub domain: Option<String>,
    /// Tags applied to every stack the application deploys.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// An environment: one deployable unit of shared infrastructure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Environment {
    /// Environment name (e.g. "test", "prod").
    pub name: String,
    /// Region the environment lives in.
    pub region: String,
    /// Role assumed for control-plane read and describe operations.
    pub manager_role_arn: String,
    /// Role the stack's own deployment actions run under.
    pub execution_role_arn: String,
}

/// Region-scoped resources an application owns.
///
/// Resolved once per deployer instance and cached for its lifetime. A
/// successful lookup with an empty bucket name is still treated as a
/// resolution failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppRegionalResources {
    /// Artifact bucket name.
    pub s3_bucket: String,
    /// Artifact encryption key identifier.
    pub kms_key_arn: String,
}

/// A single stack parameter as deployed to the control plane.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StackParameter {
    /// Parameter key.
    pub key: String,
    /// Parameter value.
    pub value: String,
}

impl StackParameter {
    /// Creates a new stack parameter.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl std::fmt::Display for StackParameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

impl Application {
    /// Creates an application with no domain and no tags.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            domain: None,
            tags: BTreeMap::new(),
        }
    }
}

impl Environment {
    /// Returns the name of the environment's infrastructure stack.
    #[must_use]
    pub fn stack_name(&self, app: &str) -> String {
        format!("{app}-{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_name() {
        let env = Environment {
            name: String::from("test"),
            region: String::from("us-west-2"),
            manager_role_arn: String::from("arn:aws:iam::1111:role/manager"),
            execution_role_arn: String::from("arn:aws:iam::1111:role/exec"),
        };
        assert_eq!(env.stack_name("phonetool"), "phonetool-test");
    }

    #[test]
    fn test_parameter_display() {
        let param = StackParameter::new("AppName", "phonetool");
        assert_eq!(param.to_string(), "AppName=phonetool");
    }
}
