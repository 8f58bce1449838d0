//! Typed representation of the environment CloudFormation template.
//!
//! The template is assembled as data and rendered with serde, never by
//! string concatenation. Section order follows field order; contents within
//! a section are ordered maps so rendering is deterministic.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::error::TemplateError;

/// Condition name: the public load balancer exists.
pub const CONDITION_CREATE_ALB: &str = "CreateALB";
/// Condition name: the internal load balancer exists.
pub const CONDITION_CREATE_INTERNAL_ALB: &str = "CreateInternalALB";
/// Condition name: the application delegates DNS to this environment.
pub const CONDITION_DELEGATE_DNS: &str = "DelegateDNS";
/// Condition name: HTTPS is requested on the public listener.
pub const CONDITION_CREATE_HTTPS_LISTENER: &str = "CreateHTTPSListener";
/// Condition name: the public load balancer and its HTTPS listener both
/// exist. Gates the listener resources and the exported listener ARN.
pub const CONDITION_EXPORT_HTTPS_LISTENER: &str = "ExportHTTPSListener";
/// Condition name: HTTPS is requested on the internal listener.
pub const CONDITION_CREATE_INTERNAL_HTTPS_LISTENER: &str = "CreateInternalHTTPSListener";
/// Condition name: the internal load balancer and its HTTPS listener both
/// exist.
pub const CONDITION_EXPORT_INTERNAL_HTTPS_LISTENER: &str = "ExportInternalHTTPSListener";
/// Condition name: the shared file system exists.
pub const CONDITION_CREATE_EFS: &str = "CreateEFS";
/// Condition name: NAT gateways route private egress.
pub const CONDITION_CREATE_NAT_GATEWAYS: &str = "CreateNATGateways";

/// Template metadata block recording provenance.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateMetadata {
    /// The manifest the template was synthesized from, verbatim.
    #[serde(rename = "Manifest")]
    pub manifest: String,
    /// Template schema version.
    #[serde(rename = "Version")]
    pub version: String,
}

/// A `Parameters` section entry.
#[derive(Debug, Clone, Serialize)]
pub struct ParameterSpec {
    /// CloudFormation parameter type.
    #[serde(rename = "Type")]
    pub parameter_type: &'static str,
    /// Optional default value.
    #[serde(rename = "Default", skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl ParameterSpec {
    /// A required string parameter.
    #[must_use]
    pub const fn string() -> Self {
        Self {
            parameter_type: "String",
            default: None,
        }
    }

    /// A string parameter with a default value.
    #[must_use]
    pub fn string_with_default(default: impl Into<String>) -> Self {
        Self {
            parameter_type: "String",
            default: Some(default.into()),
        }
    }
}

/// A `Resources` section entry.
#[derive(Debug, Clone, Serialize)]
pub struct Resource {
    /// CloudFormation resource type.
    #[serde(rename = "Type")]
    pub resource_type: &'static str,
    /// Condition gating the resource's creation.
    #[serde(rename = "Condition", skip_serializing_if = "Option::is_none")]
    pub condition: Option<&'static str>,
    /// Explicit creation ordering.
    #[serde(rename = "DependsOn", skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<&'static str>,
    /// Resource properties.
    #[serde(rename = "Properties", skip_serializing_if = "Value::is_null")]
    pub properties: Value,
}

impl Resource {
    /// An unconditional resource.
    #[must_use]
    pub const fn new(resource_type: &'static str, properties: Value) -> Self {
        Self {
            resource_type,
            condition: None,
            depends_on: Vec::new(),
            properties,
        }
    }

    /// Gates the resource behind a condition.
    #[must_use]
    pub const fn when(mut self, condition: &'static str) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Adds an explicit dependency.
    #[must_use]
    pub fn depends_on(mut self, logical_id: &'static str) -> Self {
        self.depends_on.push(logical_id);
        self
    }
}

/// A cross-stack export attached to an output.
#[derive(Debug, Clone, Serialize)]
pub struct Export {
    /// Exported name, usually a `Fn::Sub` over the stack name.
    #[serde(rename = "Name")]
    pub name: Value,
}

/// An `Outputs` section entry.
#[derive(Debug, Clone, Serialize)]
pub struct Output {
    /// Output value.
    #[serde(rename = "Value")]
    pub value: Value,
    /// Optional cross-stack export.
    #[serde(rename = "Export", skip_serializing_if = "Option::is_none")]
    pub export: Option<Export>,
    /// Condition gating the output.
    #[serde(rename = "Condition", skip_serializing_if = "Option::is_none")]
    pub condition: Option<&'static str>,
}

impl Output {
    /// An output exported as `${AWS::StackName}-<suffix>`.
    #[must_use]
    pub fn exported(value: Value, suffix: &str) -> Self {
        Self {
            value,
            export: Some(Export {
                name: serde_json::json!({ "Fn::Sub": format!("${{AWS::StackName}}-{suffix}") }),
            }),
            condition: None,
        }
    }

    /// An output without an export.
    #[must_use]
    pub const fn plain(value: Value) -> Self {
        Self {
            value,
            export: None,
            condition: None,
        }
    }

    /// Gates the output behind a condition.
    #[must_use]
    pub const fn when(mut self, condition: &'static str) -> Self {
        self.condition = Some(condition);
        self
    }
}

/// The complete environment template.
///
/// Field order is section order in the rendered document.
#[derive(Debug, Clone, Serialize)]
pub struct EnvTemplate {
    /// Human-readable stack description.
    #[serde(rename = "Description")]
    pub description: String,
    /// Provenance metadata.
    #[serde(rename = "Metadata")]
    pub metadata: TemplateMetadata,
    /// Template parameters.
    #[serde(rename = "Parameters")]
    pub parameters: BTreeMap<String, ParameterSpec>,
    /// Template conditions.
    #[serde(rename = "Conditions")]
    pub conditions: BTreeMap<String, Value>,
    /// Template resources.
    #[serde(rename = "Resources")]
    pub resources: BTreeMap<String, Resource>,
    /// Template outputs.
    #[serde(rename = "Outputs")]
    pub outputs: BTreeMap<String, Output>,
}

impl EnvTemplate {
    /// Renders the template as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Serialize`] if serialization fails.
    pub fn render(&self) -> Result<String, TemplateError> {
        Ok(serde_yaml::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_template() -> EnvTemplate {
        let mut parameters = BTreeMap::new();
        parameters.insert(String::from("AppName"), ParameterSpec::string());
        parameters.insert(
            String::from("ALBWorkloads"),
            ParameterSpec::string_with_default(""),
        );

        let mut conditions = BTreeMap::new();
        conditions.insert(
            String::from(CONDITION_CREATE_ALB),
            serde_json::json!({ "Fn::Not": [{ "Fn::Equals": [{ "Ref": "ALBWorkloads" }, ""] }] }),
        );

        let mut resources = BTreeMap::new();
        resources.insert(
            String::from("Cluster"),
            Resource::new("AWS::ECS::Cluster", Value::Null),
        );
        resources.insert(
            String::from("PublicLoadBalancer"),
            Resource::new(
                "AWS::ElasticLoadBalancingV2::LoadBalancer",
                serde_json::json!({ "Scheme": "internet-facing" }),
            )
            .when(CONDITION_CREATE_ALB),
        );

        let mut outputs = BTreeMap::new();
        outputs.insert(
            String::from("ClusterId"),
            Output::exported(serde_json::json!({ "Ref": "Cluster" }), "ClusterId"),
        );

        EnvTemplate {
            description: String::from("CloudFormation environment template."),
            metadata: TemplateMetadata {
                manifest: String::from("name: test\ntype: Environment\n"),
                version: String::from("v1.24.0"),
            },
            parameters,
            conditions,
            resources,
            outputs,
        }
    }

    #[test]
    fn test_render_orders_sections() {
        let rendered = minimal_template().render().unwrap();

        let description = rendered.find("Description:").unwrap();
        let metadata = rendered.find("Metadata:").unwrap();
        let parameters = rendered.find("Parameters:").unwrap();
        let conditions = rendered.find("Conditions:").unwrap();
        let resources = rendered.find("Resources:").unwrap();
        let outputs = rendered.find("Outputs:").unwrap();
        assert!(description < metadata);
        assert!(metadata < parameters);
        assert!(parameters < conditions);
        assert!(conditions < resources);
        assert!(resources < outputs);
    }

    #[test]
    fn test_render_is_deterministic() {
        let template = minimal_template();
        assert_eq!(template.render().unwrap(), template.render().unwrap());
    }

    #[test]
    fn test_conditional_resource_carries_condition() {
        let rendered = minimal_template().render().unwrap();
        assert!(rendered.contains("Condition: CreateALB"));
    }

    #[test]
    fn test_null_properties_are_omitted() {
        let rendered = minimal_template().render().unwrap();
        // The cluster resource has no properties block at all.
        assert!(!rendered.contains("Properties: null"));
    }

    #[test]
    fn test_export_uses_stack_name_prefix() {
        let rendered = minimal_template().render().unwrap();
        assert!(rendered.contains("${AWS::StackName}-ClusterId"));
    }
}
