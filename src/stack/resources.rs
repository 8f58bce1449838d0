//! Synthesis of the environment template's sections.
//!
//! Builders here translate the evaluated feature toggles into concrete
//! parameter, condition, resource and output entries. Resource presence is
//! decided structurally from the toggles; runtime conditions only gate the
//! workload-driven pieces (load balancers, EFS, NAT) that flip as services
//! are deployed into the environment.

use std::collections::BTreeMap;

use serde_json::{Value, json};

use crate::error::TemplateError;

use super::input::DesiredStackInput;
use super::params::{
    PARAM_ALB_WORKLOADS, PARAM_ALIASES, PARAM_APP_DNS_DELEGATION_ROLE, PARAM_APP_DNS_NAME,
    PARAM_APP_NAME, PARAM_CREATE_HTTPS_LISTENER, PARAM_CREATE_INTERNAL_HTTPS_LISTENER,
    PARAM_EFS_WORKLOADS, PARAM_ENVIRONMENT_NAME, PARAM_INTERNAL_ALB_SUBNETS,
    PARAM_INTERNAL_ALB_WORKLOADS, PARAM_NAT_WORKLOADS, PARAM_SERVICE_DISCOVERY_ENDPOINT,
    PARAM_TOOLS_PRINCIPAL_ARN,
};
use super::template::{
    CONDITION_CREATE_ALB, CONDITION_CREATE_EFS, CONDITION_CREATE_HTTPS_LISTENER,
    CONDITION_CREATE_INTERNAL_ALB, CONDITION_CREATE_INTERNAL_HTTPS_LISTENER,
    CONDITION_CREATE_NAT_GATEWAYS, CONDITION_DELEGATE_DNS, CONDITION_EXPORT_HTTPS_LISTENER,
    CONDITION_EXPORT_INTERNAL_HTTPS_LISTENER, Output, ParameterSpec, Resource,
};
use super::toggles::{CertificateSource, FeatureToggles, VpcTopology};

/// Builds the `Parameters` section.
pub(super) fn parameters() -> BTreeMap<String, ParameterSpec> {
    let mut parameters = BTreeMap::new();
    parameters.insert(String::from(PARAM_APP_NAME), ParameterSpec::string());
    parameters.insert(String::from(PARAM_ENVIRONMENT_NAME), ParameterSpec::string());
    parameters.insert(
        String::from(PARAM_TOOLS_PRINCIPAL_ARN),
        ParameterSpec::string(),
    );
    parameters.insert(String::from(PARAM_APP_DNS_NAME), ParameterSpec::string());
    parameters.insert(
        String::from(PARAM_APP_DNS_DELEGATION_ROLE),
        ParameterSpec::string(),
    );
    parameters.insert(
        String::from(PARAM_SERVICE_DISCOVERY_ENDPOINT),
        ParameterSpec::string(),
    );
    parameters.insert(
        String::from(PARAM_CREATE_HTTPS_LISTENER),
        ParameterSpec::string_with_default("false"),
    );
    parameters.insert(
        String::from(PARAM_CREATE_INTERNAL_HTTPS_LISTENER),
        ParameterSpec::string_with_default("false"),
    );
    parameters.insert(
        String::from(PARAM_INTERNAL_ALB_SUBNETS),
        ParameterSpec::string_with_default(""),
    );
    parameters.insert(
        String::from(PARAM_ALIASES),
        ParameterSpec::string_with_default(""),
    );
    parameters.insert(
        String::from(PARAM_ALB_WORKLOADS),
        ParameterSpec::string_with_default(""),
    );
    parameters.insert(
        String::from(PARAM_INTERNAL_ALB_WORKLOADS),
        ParameterSpec::string_with_default(""),
    );
    parameters.insert(
        String::from(PARAM_EFS_WORKLOADS),
        ParameterSpec::string_with_default(""),
    );
    parameters.insert(
        String::from(PARAM_NAT_WORKLOADS),
        ParameterSpec::string_with_default(""),
    );
    parameters
}

fn param_not_empty(parameter: &str) -> Value {
    json!({ "Fn::Not": [{ "Fn::Equals": [{ "Ref": parameter }, ""] }] })
}

fn param_is_true(parameter: &str) -> Value {
    json!({ "Fn::Equals": [{ "Ref": parameter }, "true"] })
}

/// Builds the `Conditions` section.
pub(super) fn conditions() -> BTreeMap<String, Value> {
    let mut conditions = BTreeMap::new();
    conditions.insert(
        String::from(CONDITION_CREATE_ALB),
        param_not_empty(PARAM_ALB_WORKLOADS),
    );
    conditions.insert(
        String::from(CONDITION_CREATE_INTERNAL_ALB),
        param_not_empty(PARAM_INTERNAL_ALB_WORKLOADS),
    );
    conditions.insert(
        String::from(CONDITION_DELEGATE_DNS),
        param_not_empty(PARAM_APP_DNS_NAME),
    );
    conditions.insert(
        String::from(CONDITION_CREATE_HTTPS_LISTENER),
        param_is_true(PARAM_CREATE_HTTPS_LISTENER),
    );
    conditions.insert(
        String::from(CONDITION_EXPORT_HTTPS_LISTENER),
        json!({ "Fn::And": [
            { "Condition": CONDITION_CREATE_ALB },
            { "Condition": CONDITION_CREATE_HTTPS_LISTENER },
        ]}),
    );
    conditions.insert(
        String::from(CONDITION_CREATE_INTERNAL_HTTPS_LISTENER),
        param_is_true(PARAM_CREATE_INTERNAL_HTTPS_LISTENER),
    );
    conditions.insert(
        String::from(CONDITION_EXPORT_INTERNAL_HTTPS_LISTENER),
        json!({ "Fn::And": [
            { "Condition": CONDITION_CREATE_INTERNAL_ALB },
            { "Condition": CONDITION_CREATE_INTERNAL_HTTPS_LISTENER },
        ]}),
    );
    conditions.insert(
        String::from(CONDITION_CREATE_EFS),
        param_not_empty(PARAM_EFS_WORKLOADS),
    );
    conditions.insert(
        String::from(CONDITION_CREATE_NAT_GATEWAYS),
        param_not_empty(PARAM_NAT_WORKLOADS),
    );
    conditions
}

/// Builds the `Resources` section.
///
/// # Errors
///
/// Returns [`TemplateError::MissingCustomResource`] or
/// [`TemplateError::MalformedUrl`] when DNS delegation is on and a custom
/// resource bundle location is absent or unparseable.
pub(super) fn resources(
    input: &DesiredStackInput,
    toggles: &FeatureToggles,
) -> Result<BTreeMap<String, Resource>, TemplateError> {
    let mut resources = BTreeMap::new();
    network_resources(&mut resources, input, toggles);
    nat_resources(&mut resources, toggles);
    cluster_resources(&mut resources, input, toggles);
    security_group_resources(&mut resources, toggles);
    public_load_balancer_resources(&mut resources, input, toggles);
    internal_load_balancer_resources(&mut resources, input, toggles);
    efs_resources(&mut resources, toggles);
    dns_resources(&mut resources, input, toggles)?;
    Ok(resources)
}

fn vpc_ref(toggles: &FeatureToggles) -> Value {
    match &toggles.vpc {
        VpcTopology::Managed { .. } => json!({ "Ref": "VPC" }),
        VpcTopology::Imported { id, .. } => json!(id),
    }
}

fn public_subnet_values(toggles: &FeatureToggles) -> Vec<Value> {
    match &toggles.vpc {
        VpcTopology::Managed { public_subnets, .. } => (1..=public_subnets.len())
            .map(|index| json!({ "Ref": format!("PublicSubnet{index}") }))
            .collect(),
        VpcTopology::Imported { public_ids, .. } => {
            public_ids.iter().map(|id| json!(id)).collect()
        }
    }
}

fn private_subnet_values(toggles: &FeatureToggles) -> Vec<Value> {
    match &toggles.vpc {
        VpcTopology::Managed { private_subnets, .. } => (1..=private_subnets.len())
            .map(|index| json!({ "Ref": format!("PrivateSubnet{index}") }))
            .collect(),
        VpcTopology::Imported { private_ids, .. } => {
            private_ids.iter().map(|id| json!(id)).collect()
        }
    }
}

/// A subnet's placement: the declared zone when the manifest pins one,
/// otherwise the region's zone at the subnet's ordinal.
fn availability_zone(index: usize, az: Option<&str>) -> Value {
    match az {
        Some(az) => json!(az),
        None => json!({ "Fn::Select": [index, { "Fn::GetAZs": "" }] }),
    }
}

/// Tags stamped onto the environment's taggable anchor resources.
fn resource_tags(input: &DesiredStackInput) -> Value {
    let mut tags = vec![
        json!({ "Key": "envforge-application", "Value": { "Ref": PARAM_APP_NAME } }),
        json!({ "Key": "envforge-environment", "Value": { "Ref": PARAM_ENVIRONMENT_NAME } }),
    ];
    for (key, value) in &input.additional_tags {
        tags.push(json!({ "Key": key, "Value": value }));
    }
    Value::Array(tags)
}

fn network_resources(
    resources: &mut BTreeMap<String, Resource>,
    input: &DesiredStackInput,
    toggles: &FeatureToggles,
) {
    let VpcTopology::Managed {
        cidr,
        public_subnets,
        private_subnets,
    } = &toggles.vpc
    else {
        return;
    };

    resources.insert(
        String::from("VPC"),
        Resource::new(
            "AWS::EC2::VPC",
            json!({
                "CidrBlock": cidr,
                "EnableDnsHostnames": true,
                "EnableDnsSupport": true,
                "InstanceTenancy": "default",
                "Tags": resource_tags(input),
            }),
        ),
    );
    resources.insert(
        String::from("InternetGateway"),
        Resource::new("AWS::EC2::InternetGateway", Value::Null),
    );
    resources.insert(
        String::from("VPCGatewayAttachment"),
        Resource::new(
            "AWS::EC2::VPCGatewayAttachment",
            json!({
                "InternetGatewayId": { "Ref": "InternetGateway" },
                "VpcId": { "Ref": "VPC" },
            }),
        ),
    );
    resources.insert(
        String::from("PublicRouteTable"),
        Resource::new(
            "AWS::EC2::RouteTable",
            json!({ "VpcId": { "Ref": "VPC" } }),
        ),
    );
    resources.insert(
        String::from("DefaultPublicRoute"),
        Resource::new(
            "AWS::EC2::Route",
            json!({
                "DestinationCidrBlock": "0.0.0.0/0",
                "GatewayId": { "Ref": "InternetGateway" },
                "RouteTableId": { "Ref": "PublicRouteTable" },
            }),
        )
        .depends_on("VPCGatewayAttachment"),
    );

    for (index, subnet) in public_subnets.iter().enumerate() {
        let ordinal = index + 1;
        resources.insert(
            format!("PublicSubnet{ordinal}"),
            Resource::new(
                "AWS::EC2::Subnet",
                json!({
                    "AvailabilityZone": availability_zone(index, subnet.az.as_deref()),
                    "CidrBlock": subnet.cidr,
                    "MapPublicIpOnLaunch": true,
                    "VpcId": { "Ref": "VPC" },
                }),
            ),
        );
        resources.insert(
            format!("PublicSubnet{ordinal}RouteTableAssociation"),
            Resource::new(
                "AWS::EC2::SubnetRouteTableAssociation",
                json!({
                    "RouteTableId": { "Ref": "PublicRouteTable" },
                    "SubnetId": { "Ref": format!("PublicSubnet{ordinal}") },
                }),
            ),
        );
    }
    for (index, subnet) in private_subnets.iter().enumerate() {
        let ordinal = index + 1;
        resources.insert(
            format!("PrivateSubnet{ordinal}"),
            Resource::new(
                "AWS::EC2::Subnet",
                json!({
                    "AvailabilityZone": availability_zone(index, subnet.az.as_deref()),
                    "CidrBlock": subnet.cidr,
                    "MapPublicIpOnLaunch": false,
                    "VpcId": { "Ref": "VPC" },
                }),
            ),
        );
    }
}

fn nat_resources(resources: &mut BTreeMap<String, Resource>, toggles: &FeatureToggles) {
    let VpcTopology::Managed { private_subnets, .. } = &toggles.vpc else {
        return;
    };

    for ordinal in 1..=private_subnets.len() {
        resources.insert(
            format!("NatGateway{ordinal}EIP"),
            Resource::new("AWS::EC2::EIP", json!({ "Domain": "vpc" }))
                .when(CONDITION_CREATE_NAT_GATEWAYS)
                .depends_on("VPCGatewayAttachment"),
        );
        resources.insert(
            format!("NatGateway{ordinal}"),
            Resource::new(
                "AWS::EC2::NatGateway",
                json!({
                    "AllocationId": { "Fn::GetAtt": [format!("NatGateway{ordinal}EIP"), "AllocationId"] },
                    "SubnetId": { "Ref": format!("PublicSubnet{ordinal}") },
                }),
            )
            .when(CONDITION_CREATE_NAT_GATEWAYS),
        );
        resources.insert(
            format!("PrivateRouteTable{ordinal}"),
            Resource::new(
                "AWS::EC2::RouteTable",
                json!({ "VpcId": { "Ref": "VPC" } }),
            )
            .when(CONDITION_CREATE_NAT_GATEWAYS),
        );
        resources.insert(
            format!("PrivateRoute{ordinal}"),
            Resource::new(
                "AWS::EC2::Route",
                json!({
                    "DestinationCidrBlock": "0.0.0.0/0",
                    "NatGatewayId": { "Ref": format!("NatGateway{ordinal}") },
                    "RouteTableId": { "Ref": format!("PrivateRouteTable{ordinal}") },
                }),
            )
            .when(CONDITION_CREATE_NAT_GATEWAYS),
        );
        resources.insert(
            format!("PrivateSubnet{ordinal}RouteTableAssociation"),
            Resource::new(
                "AWS::EC2::SubnetRouteTableAssociation",
                json!({
                    "RouteTableId": { "Ref": format!("PrivateRouteTable{ordinal}") },
                    "SubnetId": { "Ref": format!("PrivateSubnet{ordinal}") },
                }),
            )
            .when(CONDITION_CREATE_NAT_GATEWAYS),
        );
    }
}

fn cluster_resources(
    resources: &mut BTreeMap<String, Resource>,
    input: &DesiredStackInput,
    toggles: &FeatureToggles,
) {
    let insights = if toggles.container_insights {
        "enabled"
    } else {
        "disabled"
    };
    resources.insert(
        String::from("Cluster"),
        Resource::new(
            "AWS::ECS::Cluster",
            json!({
                "CapacityProviders": ["FARGATE", "FARGATE_SPOT"],
                "ClusterSettings": [{ "Name": "containerInsights", "Value": insights }],
                "Tags": resource_tags(input),
            }),
        ),
    );
    resources.insert(
        String::from("ServiceDiscoveryNamespace"),
        Resource::new(
            "AWS::ServiceDiscovery::PrivateDnsNamespace",
            json!({
                "Name": { "Ref": PARAM_SERVICE_DISCOVERY_ENDPOINT },
                "Vpc": vpc_ref(toggles),
            }),
        ),
    );
}

fn security_group_resources(resources: &mut BTreeMap<String, Resource>, toggles: &FeatureToggles) {
    resources.insert(
        String::from("EnvironmentSecurityGroup"),
        Resource::new(
            "AWS::EC2::SecurityGroup",
            json!({
                "GroupDescription": {
                    "Fn::Sub": "${AppName}-${EnvironmentName}EnvironmentSecurityGroup"
                },
                "VpcId": vpc_ref(toggles),
            }),
        ),
    );
    resources.insert(
        String::from("EnvironmentSecurityGroupIngressFromSelf"),
        Resource::new(
            "AWS::EC2::SecurityGroupIngress",
            json!({
                "Description": "Ingress from other containers in the same security group",
                "GroupId": { "Ref": "EnvironmentSecurityGroup" },
                "IpProtocol": -1,
                "SourceSecurityGroupId": { "Ref": "EnvironmentSecurityGroup" },
            }),
        ),
    );
    resources.insert(
        String::from("PublicLoadBalancerSecurityGroup"),
        Resource::new(
            "AWS::EC2::SecurityGroup",
            json!({
                "GroupDescription": "Access to the public facing load balancer",
                "SecurityGroupIngress": [
                    {
                        "CidrIp": "0.0.0.0/0",
                        "Description": "Allow from anyone on port 80",
                        "FromPort": 80,
                        "IpProtocol": "tcp",
                        "ToPort": 80,
                    },
                    {
                        "CidrIp": "0.0.0.0/0",
                        "Description": "Allow from anyone on port 443",
                        "FromPort": 443,
                        "IpProtocol": "tcp",
                        "ToPort": 443,
                    },
                ],
                "VpcId": vpc_ref(toggles),
            }),
        )
        .when(CONDITION_CREATE_ALB),
    );
    resources.insert(
        String::from("EnvironmentSecurityGroupIngressFromPublicALB"),
        Resource::new(
            "AWS::EC2::SecurityGroupIngress",
            json!({
                "Description": "Ingress from the public ALB",
                "GroupId": { "Ref": "EnvironmentSecurityGroup" },
                "IpProtocol": -1,
                "SourceSecurityGroupId": { "Ref": "PublicLoadBalancerSecurityGroup" },
            }),
        )
        .when(CONDITION_CREATE_ALB),
    );
    resources.insert(
        String::from("InternalLoadBalancerSecurityGroup"),
        Resource::new(
            "AWS::EC2::SecurityGroup",
            json!({
                "GroupDescription": "Access to the internal load balancer",
                "VpcId": vpc_ref(toggles),
            }),
        )
        .when(CONDITION_CREATE_INTERNAL_ALB),
    );
    resources.insert(
        String::from("EnvironmentSecurityGroupIngressFromInternalALB"),
        Resource::new(
            "AWS::EC2::SecurityGroupIngress",
            json!({
                "Description": "Ingress from the internal ALB",
                "GroupId": { "Ref": "EnvironmentSecurityGroup" },
                "IpProtocol": -1,
                "SourceSecurityGroupId": { "Ref": "InternalLoadBalancerSecurityGroup" },
            }),
        )
        .when(CONDITION_CREATE_INTERNAL_ALB),
    );
}

fn public_load_balancer_resources(
    resources: &mut BTreeMap<String, Resource>,
    input: &DesiredStackInput,
    toggles: &FeatureToggles,
) {
    resources.insert(
        String::from("PublicLoadBalancer"),
        Resource::new(
            "AWS::ElasticLoadBalancingV2::LoadBalancer",
            json!({
                "Scheme": "internet-facing",
                "SecurityGroups": [{ "Ref": "PublicLoadBalancerSecurityGroup" }],
                "Subnets": public_subnet_values(toggles),
                "Type": "application",
            }),
        )
        .when(CONDITION_CREATE_ALB),
    );
    resources.insert(
        String::from("DefaultHTTPTargetGroup"),
        Resource::new(
            "AWS::ElasticLoadBalancingV2::TargetGroup",
            json!({
                "Port": 80,
                "Protocol": "HTTP",
                "TargetType": "ip",
                "VpcId": vpc_ref(toggles),
            }),
        )
        .when(CONDITION_CREATE_ALB),
    );
    resources.insert(
        String::from("HTTPListener"),
        Resource::new(
            "AWS::ElasticLoadBalancingV2::Listener",
            json!({
                "DefaultActions": [{
                    "TargetGroupArn": { "Ref": "DefaultHTTPTargetGroup" },
                    "Type": "forward",
                }],
                "LoadBalancerArn": { "Ref": "PublicLoadBalancer" },
                "Port": 80,
                "Protocol": "HTTP",
            }),
        )
        .when(CONDITION_CREATE_ALB),
    );

    let primary_certificate = match &toggles.public_certificates {
        CertificateSource::None => return,
        CertificateSource::Managed => json!({ "Ref": "HTTPSCert" }),
        CertificateSource::Imported(certs) => match certs.first() {
            Some(certificate) => json!(certificate),
            None => return,
        },
    };
    let mut listener = json!({
        "Certificates": [{ "CertificateArn": primary_certificate }],
        "DefaultActions": [{
            "TargetGroupArn": { "Ref": "DefaultHTTPTargetGroup" },
            "Type": "forward",
        }],
        "LoadBalancerArn": { "Ref": "PublicLoadBalancer" },
        "Port": 443,
        "Protocol": "HTTPS",
    });
    if let Some(policy) = &input.manifest.http.public.ssl_policy {
        listener["SslPolicy"] = json!(policy);
    }
    // The listener refs resources gated on CreateALB, so it must not
    // instantiate unless the load balancer does.
    resources.insert(
        String::from("HTTPSListener"),
        Resource::new("AWS::ElasticLoadBalancingV2::Listener", listener)
            .when(CONDITION_EXPORT_HTTPS_LISTENER),
    );

    if let CertificateSource::Imported(certs) = &toggles.public_certificates {
        for (index, certificate) in certs.iter().enumerate().skip(1) {
            resources.insert(
                format!("HTTPSImportedCertListenerCertificate{}", index + 1),
                Resource::new(
                    "AWS::ElasticLoadBalancingV2::ListenerCertificate",
                    json!({
                        "Certificates": [{ "CertificateArn": certificate }],
                        "ListenerArn": { "Ref": "HTTPSListener" },
                    }),
                )
                .when(CONDITION_EXPORT_HTTPS_LISTENER),
            );
        }
    }
}

fn internal_load_balancer_resources(
    resources: &mut BTreeMap<String, Resource>,
    input: &DesiredStackInput,
    toggles: &FeatureToggles,
) {
    let subnets = if toggles.internal_alb_subnets.is_empty() {
        Value::Array(private_subnet_values(toggles))
    } else {
        json!({ "Fn::Split": [",", { "Ref": PARAM_INTERNAL_ALB_SUBNETS }] })
    };
    resources.insert(
        String::from("InternalLoadBalancer"),
        Resource::new(
            "AWS::ElasticLoadBalancingV2::LoadBalancer",
            json!({
                "Scheme": "internal",
                "SecurityGroups": [{ "Ref": "InternalLoadBalancerSecurityGroup" }],
                "Subnets": subnets,
                "Type": "application",
            }),
        )
        .when(CONDITION_CREATE_INTERNAL_ALB),
    );
    resources.insert(
        String::from("DefaultInternalHTTPTargetGroup"),
        Resource::new(
            "AWS::ElasticLoadBalancingV2::TargetGroup",
            json!({
                "Port": 80,
                "Protocol": "HTTP",
                "TargetType": "ip",
                "VpcId": vpc_ref(toggles),
            }),
        )
        .when(CONDITION_CREATE_INTERNAL_ALB),
    );
    resources.insert(
        String::from("InternalHTTPListener"),
        Resource::new(
            "AWS::ElasticLoadBalancingV2::Listener",
            json!({
                "DefaultActions": [{
                    "TargetGroupArn": { "Ref": "DefaultInternalHTTPTargetGroup" },
                    "Type": "forward",
                }],
                "LoadBalancerArn": { "Ref": "InternalLoadBalancer" },
                "Port": 80,
                "Protocol": "HTTP",
            }),
        )
        .when(CONDITION_CREATE_INTERNAL_ALB),
    );

    if toggles.private_hosted_zone() {
        resources.insert(
            String::from("InternalHostedZone"),
            Resource::new(
                "AWS::Route53::HostedZone",
                json!({
                    "Name": { "Fn::Sub": "${EnvironmentName}.${AppName}.internal" },
                    "VPCs": [{
                        "VPCId": vpc_ref(toggles),
                        "VPCRegion": { "Ref": "AWS::Region" },
                    }],
                }),
            )
            .when(CONDITION_CREATE_INTERNAL_ALB),
        );
    }

    let CertificateSource::Imported(certs) = &toggles.internal_certificates else {
        return;
    };
    let Some(primary_certificate) = certs.first() else {
        return;
    };
    let mut listener = json!({
        "Certificates": [{ "CertificateArn": primary_certificate }],
        "DefaultActions": [{
            "TargetGroupArn": { "Ref": "DefaultInternalHTTPTargetGroup" },
            "Type": "forward",
        }],
        "LoadBalancerArn": { "Ref": "InternalLoadBalancer" },
        "Port": 443,
        "Protocol": "HTTPS",
    });
    if let Some(policy) = &input.manifest.http.private.ssl_policy {
        listener["SslPolicy"] = json!(policy);
    }
    resources.insert(
        String::from("InternalHTTPSListener"),
        Resource::new("AWS::ElasticLoadBalancingV2::Listener", listener)
            .when(CONDITION_EXPORT_INTERNAL_HTTPS_LISTENER),
    );
    for (index, certificate) in certs.iter().enumerate().skip(1) {
        resources.insert(
            format!("InternalHTTPSImportedCertListenerCertificate{}", index + 1),
            Resource::new(
                "AWS::ElasticLoadBalancingV2::ListenerCertificate",
                json!({
                    "Certificates": [{ "CertificateArn": certificate }],
                    "ListenerArn": { "Ref": "InternalHTTPSListener" },
                }),
            )
            .when(CONDITION_EXPORT_INTERNAL_HTTPS_LISTENER),
        );
    }
}

fn efs_resources(resources: &mut BTreeMap<String, Resource>, toggles: &FeatureToggles) {
    resources.insert(
        String::from("FileSystem"),
        Resource::new(
            "AWS::EFS::FileSystem",
            json!({
                "Encrypted": true,
                "PerformanceMode": "generalPurpose",
                "ThroughputMode": "bursting",
            }),
        )
        .when(CONDITION_CREATE_EFS),
    );
    resources.insert(
        String::from("EFSSecurityGroup"),
        Resource::new(
            "AWS::EC2::SecurityGroup",
            json!({
                "GroupDescription": "Access to the environment file system",
                "SecurityGroupIngress": [{
                    "Description": "NFS from environment containers",
                    "FromPort": 2049,
                    "IpProtocol": "tcp",
                    "SourceSecurityGroupId": { "Ref": "EnvironmentSecurityGroup" },
                    "ToPort": 2049,
                }],
                "VpcId": vpc_ref(toggles),
            }),
        )
        .when(CONDITION_CREATE_EFS),
    );
    for (ordinal, subnet) in private_subnet_values(toggles).into_iter().enumerate() {
        resources.insert(
            format!("MountTarget{}", ordinal + 1),
            Resource::new(
                "AWS::EFS::MountTarget",
                json!({
                    "FileSystemId": { "Ref": "FileSystem" },
                    "SecurityGroups": [{ "Ref": "EFSSecurityGroup" }],
                    "SubnetId": subnet,
                }),
            )
            .when(CONDITION_CREATE_EFS),
        );
    }
}

/// Splits an artifact URL of the form
/// `https://{bucket}.s3[...].amazonaws.com/{key}` into bucket and key.
fn bucket_and_key(url: &str) -> Result<(String, String), TemplateError> {
    let malformed = || TemplateError::MalformedUrl {
        url: String::from(url),
    };
    let rest = url.strip_prefix("https://").ok_or_else(malformed)?;
    let (host, key) = rest.split_once('/').ok_or_else(malformed)?;
    let (bucket, _) = host.split_once(".s3").ok_or_else(malformed)?;
    if bucket.is_empty() || key.is_empty() {
        return Err(malformed());
    }
    Ok((String::from(bucket), String::from(key)))
}

fn custom_resource_code(
    input: &DesiredStackInput,
    function: &str,
) -> Result<Value, TemplateError> {
    let url = input.custom_resources_urls.get(function).ok_or_else(|| {
        TemplateError::MissingCustomResource {
            function: String::from(function),
        }
    })?;
    let (bucket, key) = bucket_and_key(url)?;
    Ok(json!({ "S3Bucket": bucket, "S3Key": key }))
}

fn dns_resources(
    resources: &mut BTreeMap<String, Resource>,
    input: &DesiredStackInput,
    toggles: &FeatureToggles,
) -> Result<(), TemplateError> {
    if !toggles.dns_delegation {
        return Ok(());
    }

    resources.insert(
        String::from("CustomResourceRole"),
        Resource::new(
            "AWS::IAM::Role",
            json!({
                "AssumeRolePolicyDocument": {
                    "Version": "2012-10-17",
                    "Statement": [{
                        "Effect": "Allow",
                        "Principal": { "Service": "lambda.amazonaws.com" },
                        "Action": "sts:AssumeRole",
                    }],
                },
                "Path": "/",
                "Policies": [{
                    "PolicyName": "DNSandACMAccess",
                    "PolicyDocument": {
                        "Version": "2012-10-17",
                        "Statement": [{
                            "Effect": "Allow",
                            "Action": [
                                "acm:AddTagsToCertificate",
                                "acm:DeleteCertificate",
                                "acm:DescribeCertificate",
                                "acm:GetCertificate",
                                "acm:ListCertificates",
                                "acm:RequestCertificate",
                                "logs:CreateLogGroup",
                                "logs:CreateLogStream",
                                "logs:PutLogEvents",
                                "route53:ChangeResourceRecordSets",
                                "route53:Get*",
                                "route53:Describe*",
                                "route53:ListResourceRecordSets",
                                "route53:ListHostedZonesByName",
                                "sts:AssumeRole",
                            ],
                            "Resource": ["*"],
                        }],
                    },
                }],
            }),
        )
        .when(CONDITION_DELEGATE_DNS),
    );

    for function in [
        crate::artifacts::CERTIFICATE_VALIDATION_FUNCTION,
        crate::artifacts::CUSTOM_DOMAIN_FUNCTION,
        crate::artifacts::DNS_DELEGATION_FUNCTION,
    ] {
        resources.insert(
            String::from(function),
            Resource::new(
                "AWS::Lambda::Function",
                json!({
                    "Code": custom_resource_code(input, function)?,
                    "Handler": "index.handler",
                    "MemorySize": 512,
                    "Role": { "Fn::GetAtt": ["CustomResourceRole", "Arn"] },
                    "Runtime": "nodejs20.x",
                    "Timeout": 900,
                }),
            )
            .when(CONDITION_DELEGATE_DNS),
        );
    }

    resources.insert(
        String::from("EnvironmentHostedZone"),
        Resource::new(
            "AWS::Route53::HostedZone",
            json!({
                "HostedZoneConfig": {
                    "Comment": "Hosted zone for the environment subdomain",
                },
                "Name": { "Fn::Sub": "${EnvironmentName}.${AppName}.${AppDNSName}" },
            }),
        )
        .when(CONDITION_DELEGATE_DNS),
    );
    resources.insert(
        String::from("DelegateDNSAction"),
        Resource::new(
            "Custom::DNSDelegationFunction",
            json!({
                "ServiceToken": { "Fn::GetAtt": ["DNSDelegationFunction", "Arn"] },
                "DomainName": { "Fn::Sub": "${AppName}.${AppDNSName}" },
                "SubdomainName": { "Fn::Sub": "${EnvironmentName}.${AppName}.${AppDNSName}" },
                "NameServers": { "Fn::GetAtt": ["EnvironmentHostedZone", "NameServers"] },
                "RootDNSRole": { "Ref": PARAM_APP_DNS_DELEGATION_ROLE },
            }),
        )
        .when(CONDITION_DELEGATE_DNS),
    );

    if toggles.public_certificates == CertificateSource::Managed {
        resources.insert(
            String::from("HTTPSCert"),
            Resource::new(
                "Custom::CertificateValidationFunction",
                json!({
                    "ServiceToken": { "Fn::GetAtt": ["CertificateValidationFunction", "Arn"] },
                    "AppName": { "Ref": PARAM_APP_NAME },
                    "EnvName": { "Ref": PARAM_ENVIRONMENT_NAME },
                    "DomainName": { "Ref": PARAM_APP_DNS_NAME },
                    "Aliases": { "Ref": PARAM_ALIASES },
                    "EnvHostedZoneId": { "Ref": "EnvironmentHostedZone" },
                    "Region": { "Ref": "AWS::Region" },
                    "RootDNSRole": { "Ref": PARAM_APP_DNS_DELEGATION_ROLE },
                }),
            )
            .when(CONDITION_DELEGATE_DNS)
            .depends_on("DelegateDNSAction"),
        );
    }

    Ok(())
}

fn subnet_list(values: Vec<Value>) -> Value {
    json!({ "Fn::Join": [",", values] })
}

/// Builds the `Outputs` section.
pub(super) fn outputs(toggles: &FeatureToggles) -> BTreeMap<String, Output> {
    let mut outputs = BTreeMap::new();
    outputs.insert(
        String::from("VpcId"),
        Output::exported(vpc_ref(toggles), "VpcId"),
    );
    outputs.insert(
        String::from("PublicSubnets"),
        Output::exported(subnet_list(public_subnet_values(toggles)), "PublicSubnets"),
    );
    outputs.insert(
        String::from("PrivateSubnets"),
        Output::exported(
            subnet_list(private_subnet_values(toggles)),
            "PrivateSubnets",
        ),
    );
    outputs.insert(
        String::from("ClusterId"),
        Output::exported(json!({ "Ref": "Cluster" }), "ClusterId"),
    );
    outputs.insert(
        String::from("EnvironmentSecurityGroup"),
        Output::exported(
            json!({ "Ref": "EnvironmentSecurityGroup" }),
            "EnvironmentSecurityGroup",
        ),
    );
    outputs.insert(
        String::from("ServiceDiscoveryNamespaceID"),
        Output::exported(
            json!({ "Fn::GetAtt": ["ServiceDiscoveryNamespace", "Id"] }),
            "ServiceDiscoveryNamespaceID",
        ),
    );
    outputs.insert(
        String::from("PublicLoadBalancerDNSName"),
        Output::exported(
            json!({ "Fn::GetAtt": ["PublicLoadBalancer", "DNSName"] }),
            "PublicLoadBalancerDNS",
        )
        .when(CONDITION_CREATE_ALB),
    );
    if toggles.https_listener() {
        outputs.insert(
            String::from("HTTPSListenerArn"),
            Output::exported(json!({ "Ref": "HTTPSListener" }), "HTTPSListenerArn")
                .when(CONDITION_EXPORT_HTTPS_LISTENER),
        );
    }
    outputs.insert(
        String::from("InternalLoadBalancerDNSName"),
        Output::exported(
            json!({ "Fn::GetAtt": ["InternalLoadBalancer", "DNSName"] }),
            "InternalLoadBalancerDNS",
        )
        .when(CONDITION_CREATE_INTERNAL_ALB),
    );
    if toggles.private_hosted_zone() {
        outputs.insert(
            String::from("InternalHostedZoneID"),
            Output::exported(json!({ "Ref": "InternalHostedZone" }), "InternalHostedZoneID")
                .when(CONDITION_CREATE_INTERNAL_ALB),
        );
    }
    if toggles.dns_delegation {
        outputs.insert(
            String::from("EnvironmentHostedZone"),
            Output::exported(
                json!({ "Ref": "EnvironmentHostedZone" }),
                "EnvironmentHostedZone",
            )
            .when(CONDITION_DELEGATE_DNS),
        );
    }
    outputs
}
