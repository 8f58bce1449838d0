//! Error types for the envforge deployment pipeline.
//!
//! This module provides the error hierarchy for all operations in the
//! environment deployment lifecycle: manifest handling, regional resource
//! resolution, artifact staging, template rendering, and stack deployment.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the envforge deployment pipeline.
#[derive(Debug, Error)]
pub enum EnvForgeError {
    /// Manifest loading or validation errors.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Regional resource resolution errors.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Custom resource staging errors.
    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    /// Deployed parameter describe errors.
    #[error(transparent)]
    Describe(#[from] ParameterDescribeError),

    /// Template or parameter rendering errors.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Control-plane errors, surfaced verbatim.
    #[error(transparent)]
    Cloud(#[from] CloudError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Manifest loading and validation errors.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest file was not found.
    #[error("Manifest file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The manifest file could not be parsed.
    #[error("Failed to parse manifest: {message}")]
    Parse {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Manifest validation failed: {message}")]
    Validation {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// A required CLI flag or environment variable is missing.
    #[error("Missing required setting: {name}")]
    MissingSetting {
        /// Name of the missing flag or variable.
        name: String,
    },
}

/// Regional resource resolution errors.
///
/// Both lookup variants are terminal for the calling operation; staging and
/// deployment cannot proceed without a resolvable artifact location.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The regional resource lookup itself failed.
    #[error("get app resources in region {region}: {source}")]
    ResourceLookup {
        /// Region the lookup targeted.
        region: String,
        /// Underlying control-plane failure.
        source: CloudError,
    },

    /// The lookup succeeded but reported no artifact bucket.
    #[error("cannot find the S3 artifact bucket in region {region}")]
    MissingBucket {
        /// Region whose resources lack a bucket.
        region: String,
    },

    /// The region does not belong to any known partition.
    #[error("find the partition for region {region}")]
    UnknownPartition {
        /// The unrecognized region.
        region: String,
    },
}

/// Custom resource staging errors.
///
/// Staging is idempotent, so a failed stage is safely re-runnable; partial
/// uploads already committed are repaired by the next run.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// One of the bundle uploads failed.
    #[error("upload custom resources to bucket {bucket}: {source}")]
    Upload {
        /// Destination bucket.
        bucket: String,
        /// First upload failure observed.
        source: CloudError,
    },
}

/// Failure to read the previously deployed stack parameters.
///
/// Without the prior parameter set, reconciliation cannot run safely.
#[derive(Debug, Error)]
#[error("describe environment stack parameters: {source}")]
pub struct ParameterDescribeError {
    /// Underlying control-plane failure.
    pub source: CloudError,
}

/// Template or parameter rendering errors.
///
/// These indicate an invariant violation in toggle evaluation or
/// serialization, not a transient condition.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The template body could not be produced.
    #[error("generate stack template: {source}")]
    Template {
        /// The synthesis failure.
        source: TemplateError,
    },

    /// The reconciled parameter set could not be serialized.
    #[error("generate stack template parameters: {source}")]
    Parameters {
        /// The serialization failure.
        source: ParameterError,
    },
}

/// Template synthesis errors.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Feature toggle evaluation produced an inconsistent state.
    #[error("inconsistent feature toggles: {reason}")]
    ToggleState {
        /// Description of the violated invariant.
        reason: String,
    },

    /// A custom resource function required by the template has no staged URL.
    #[error("no staged URL for custom resource function {function}")]
    MissingCustomResource {
        /// Name of the missing function.
        function: String,
    },

    /// A staged custom resource URL could not be split into bucket and key.
    #[error("malformed custom resource URL: {url}")]
    MalformedUrl {
        /// The unparseable URL.
        url: String,
    },

    /// The template document failed to serialize.
    #[error("serialize template: {0}")]
    Serialize(#[from] serde_yaml::Error),
}

/// Parameter serialization errors.
#[derive(Debug, Error)]
pub enum ParameterError {
    /// The parameter list failed to serialize.
    #[error("serialize parameters: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors reported by cloud collaborators (S3, CloudFormation).
///
/// `Service` carries the provider's own message with no added prefix so
/// deployment failures reach the operator verbatim.
#[derive(Debug, Error)]
pub enum CloudError {
    /// A service call failed; the message is the provider's own diagnostic.
    #[error("{message}")]
    Service {
        /// The provider's error message.
        message: String,
    },

    /// A service call returned a response missing expected fields.
    #[error("invalid response from control plane: {message}")]
    InvalidResponse {
        /// Description of the malformed response.
        message: String,
    },
}

/// Result type alias for envforge operations.
pub type Result<T> = std::result::Result<T, EnvForgeError>;

impl EnvForgeError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

impl ManifestError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates a validation error without a specific field.
    #[must_use]
    pub fn validation_general(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: None,
        }
    }
}

impl CloudError {
    /// Creates a service error with the given message.
    #[must_use]
    pub fn service(message: impl Into<String>) -> Self {
        Self::Service {
            message: message.into(),
        }
    }

    /// Creates an invalid-response error with the given message.
    #[must_use]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_error_messages() {
        let err = ResolveError::ResourceLookup {
            region: String::from("us-west-2"),
            source: CloudError::service("boom"),
        };
        assert_eq!(err.to_string(), "get app resources in region us-west-2: boom");

        let err = ResolveError::MissingBucket {
            region: String::from("us-west-2"),
        };
        assert_eq!(
            err.to_string(),
            "cannot find the S3 artifact bucket in region us-west-2"
        );
    }

    #[test]
    fn test_artifact_error_message() {
        let err = ArtifactError::Upload {
            bucket: String::from("mockS3Bucket"),
            source: CloudError::service("access denied"),
        };
        assert_eq!(
            err.to_string(),
            "upload custom resources to bucket mockS3Bucket: access denied"
        );
    }

    #[test]
    fn test_cloud_error_passes_message_through() {
        let err = EnvForgeError::from(CloudError::service("some error"));
        assert_eq!(err.to_string(), "some error");
    }

    #[test]
    fn test_render_error_prefixes() {
        let err = RenderError::Template {
            source: TemplateError::ToggleState {
                reason: String::from("broken"),
            },
        };
        assert!(err.to_string().starts_with("generate stack template: "));

        let err = ParameterDescribeError {
            source: CloudError::service("nope"),
        };
        assert_eq!(
            err.to_string(),
            "describe environment stack parameters: nope"
        );
    }
}
