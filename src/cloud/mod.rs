//! Cloud control-plane types, contracts and adapters.
//!
//! The deployer's view of the cloud is the set of traits in
//! [`contracts`]; the concrete CloudFormation and S3 adapters live beside
//! them and are wired in at construction time.

mod cfn;
mod contracts;
mod partition;
mod s3;
mod types;

pub use cfn::CloudFormationStacks;
pub use contracts::{AppResourceLookup, EnvironmentStack, ObjectUploader, StackUpdateOptions};
pub use partition::{bucket_arn, partition_for_region};
pub use s3::S3ArtifactClient;
pub use types::{AppRegionalResources, Application, Environment, StackParameter};
