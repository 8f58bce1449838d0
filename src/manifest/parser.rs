//! Manifest parser for loading environment manifests.
//!
//! This module handles loading the manifest from YAML files and applying
//! environment variable overrides, with proper precedence and error
//! handling.

use crate::error::{EnvForgeError, ManifestError, Result};
use std::path::Path;
use tracing::{debug, info};

use super::spec::EnvironmentManifest;

/// Manifest parser for loading environment manifests.
#[derive(Debug, Default)]
pub struct ManifestParser {
    /// Base path for resolving relative paths.
    base_path: Option<std::path::PathBuf>,
}

impl ManifestParser {
    /// Creates a new manifest parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving relative paths.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads a manifest from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<EnvironmentManifest> {
        let path = path.as_ref();
        info!("Loading manifest from: {}", path.display());

        if !path.exists() {
            return Err(EnvForgeError::Manifest(ManifestError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            EnvForgeError::Manifest(ManifestError::Parse {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses a manifest from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<EnvironmentManifest> {
        debug!("Parsing YAML manifest");

        let manifest: EnvironmentManifest = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            EnvForgeError::Manifest(ManifestError::Parse {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })?;

        debug!("Successfully parsed manifest for environment: {}", manifest.name);
        Ok(manifest)
    }

    /// Loads a manifest with environment variable overrides applied.
    ///
    /// Overrides are checked in the format `ENVFORGE_<KEY>`
    /// (e.g. `ENVFORGE_ENVIRONMENT_NAME`).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_with_env(&self, path: impl AsRef<Path>) -> Result<EnvironmentManifest> {
        let mut manifest = self.load_file(path)?;

        Self::apply_env_overrides(&mut manifest);

        Ok(manifest)
    }

    /// Applies environment variable overrides to the manifest.
    fn apply_env_overrides(manifest: &mut EnvironmentManifest) {
        if let Ok(name) = std::env::var("ENVFORGE_ENVIRONMENT_NAME") {
            debug!("Overriding name from environment");
            manifest.name = name;
        }

        if let Ok(insights) = std::env::var("ENVFORGE_CONTAINER_INSIGHTS") {
            debug!("Overriding observability.container_insights from environment");
            manifest.observability.container_insights =
                matches!(insights.to_lowercase().as_str(), "1" | "true" | "yes");
        }
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| std::path::PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                EnvForgeError::Manifest(ManifestError::Parse {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }
}

/// Default manifest file names to search for.
pub const DEFAULT_MANIFEST_FILES: &[&str] = &[
    "envforge.env.yaml",
    "envforge.env.yml",
    "environment.yaml",
    "environment.yml",
];

/// Finds the manifest file in the given directory or its parents.
///
/// # Errors
///
/// Returns an error if no manifest file is found.
pub fn find_manifest_file(start_dir: impl AsRef<Path>) -> Result<std::path::PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_MANIFEST_FILES {
            let manifest_path = current.join(filename);
            if manifest_path.exists() {
                info!("Found manifest file: {}", manifest_path.display());
                return Ok(manifest_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    Err(EnvForgeError::Manifest(ManifestError::FileNotFound {
        path: start.join(DEFAULT_MANIFEST_FILES[0]),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_manifest() {
        let yaml = r"
name: test
type: Environment
";
        let parser = ManifestParser::new();
        let result = parser.parse_yaml(yaml, None);
        assert!(result.is_ok());

        let manifest = result.unwrap();
        assert_eq!(manifest.name, "test");
        assert_eq!(manifest.manifest_type, "Environment");
        assert!(!manifest.observability.container_insights);
    }

    #[test]
    fn test_parse_full_manifest() {
        let yaml = r#"
name: prod
type: Environment

network:
  vpc:
    id: "vpc-012345"
    subnets:
      public:
        - id: "subnet-011"
        - id: "subnet-022"
      private:
        - id: "subnet-033"
        - id: "subnet-044"

http:
  public:
    certificates:
      - arn:aws:acm:us-west-2:1111:certificate/look-like-a-good-arn
    ssl_policy: ELBSecurityPolicy-TLS13-1-2-2021-06
  private:
    certificates:
      - arn:aws:acm:us-west-2:1111:certificate/look-like-a-good-arn-2
    subnets: ["subnet-055"]

observability:
  container_insights: true
"#;
        let parser = ManifestParser::new();
        let manifest = parser.parse_yaml(yaml, None).unwrap();

        assert_eq!(manifest.name, "prod");
        assert!(manifest.is_imported_vpc());
        assert_eq!(manifest.imported_public_subnet_ids().len(), 2);
        assert_eq!(manifest.http.public.certificates.len(), 1);
        assert_eq!(manifest.http.private.subnets, vec!["subnet-055"]);
        assert!(manifest.observability.container_insights);
    }

    #[test]
    fn test_load_missing_file() {
        let parser = ManifestParser::new();
        let result = parser.load_file("/does/not/exist.yaml");
        assert!(matches!(
            result,
            Err(EnvForgeError::Manifest(ManifestError::FileNotFound { .. }))
        ));
    }

    #[test]
    fn test_load_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("envforge.env.yaml");
        std::fs::write(&path, "name: staging\ntype: Environment\n").unwrap();

        let parser = ManifestParser::new().with_base_path(dir.path());
        let manifest = parser.load_file(&path).unwrap();
        assert_eq!(manifest.name, "staging");

        let found = find_manifest_file(dir.path()).unwrap();
        assert_eq!(found, path);
    }
}
