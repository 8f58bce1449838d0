//! Region to partition resolution.
//!
//! Stack inputs carry a partition-qualified ARN for the artifact bucket, so
//! the deployer must map the environment's region to its cloud partition
//! before building one.

use crate::error::ResolveError;

/// Prefix-based partition table. Checked before the standard-region shape,
/// since gov and iso regions also match it.
const PARTITION_PREFIXES: &[(&str, &str)] = &[
    ("cn-", "aws-cn"),
    ("us-gov-", "aws-us-gov"),
    ("us-isob-", "aws-iso-b"),
    ("us-iso-", "aws-iso"),
];

/// Resolves the partition identifier for a region.
///
/// # Errors
///
/// Returns [`ResolveError::UnknownPartition`] if the region matches no
/// partition.
pub fn partition_for_region(region: &str) -> Result<&'static str, ResolveError> {
    for &(prefix, partition) in PARTITION_PREFIXES {
        if region.starts_with(prefix) {
            return Ok(partition);
        }
    }

    if is_standard_region(region) {
        return Ok("aws");
    }

    Err(ResolveError::UnknownPartition {
        region: region.to_string(),
    })
}

/// Formats the partition-qualified ARN of an S3 bucket.
#[must_use]
pub fn bucket_arn(partition: &str, bucket: &str) -> String {
    format!("arn:{partition}:s3:::{bucket}")
}

/// Checks whether a region has the standard `area-name-N` shape
/// (e.g. `us-west-2`, `ap-southeast-1`).
fn is_standard_region(region: &str) -> bool {
    let parts: Vec<&str> = region.split('-').collect();
    if parts.len() < 3 {
        return false;
    }

    let area = parts[0];
    let number = parts[parts.len() - 1];

    area.len() == 2
        && area.chars().all(|c| c.is_ascii_lowercase())
        && !number.is_empty()
        && number.chars().all(|c| c.is_ascii_digit())
        && parts[1..parts.len() - 1]
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_regions() {
        assert_eq!(partition_for_region("us-west-2").unwrap(), "aws");
        assert_eq!(partition_for_region("eu-central-1").unwrap(), "aws");
        assert_eq!(partition_for_region("ap-southeast-2").unwrap(), "aws");
    }

    #[test]
    fn test_special_partitions() {
        assert_eq!(partition_for_region("cn-north-1").unwrap(), "aws-cn");
        assert_eq!(partition_for_region("us-gov-west-1").unwrap(), "aws-us-gov");
        assert_eq!(partition_for_region("us-iso-east-1").unwrap(), "aws-iso");
        assert_eq!(partition_for_region("us-isob-east-1").unwrap(), "aws-iso-b");
    }

    #[test]
    fn test_unknown_region() {
        let err = partition_for_region("mockEnvRegion").unwrap_err();
        assert_eq!(
            err.to_string(),
            "find the partition for region mockEnvRegion"
        );

        assert!(partition_for_region("").is_err());
        assert!(partition_for_region("us-west").is_err());
    }

    #[test]
    fn test_bucket_arn() {
        assert_eq!(
            bucket_arn("aws", "stackset-bucket"),
            "arn:aws:s3:::stackset-bucket"
        );
        assert_eq!(
            bucket_arn("aws-cn", "stackset-bucket"),
            "arn:aws-cn:s3:::stackset-bucket"
        );
    }
}
