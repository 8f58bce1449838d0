//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Envforge - shared environment infrastructure deployment for AWS.
#[derive(Parser, Debug)]
#[command(name = "envforge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the environment manifest file.
    #[arg(short, long, global = true, env = "ENVFORGE_MANIFEST")]
    pub manifest: Option<PathBuf>,

    /// Name of the application the environment belongs to.
    #[arg(long, global = true, env = "ENVFORGE_APP")]
    pub app: Option<String>,

    /// Root domain owned by the application.
    #[arg(long, global = true, env = "ENVFORGE_APP_DOMAIN")]
    pub domain: Option<String>,

    /// Region the environment is deployed in.
    #[arg(long, global = true, env = "ENVFORGE_REGION")]
    pub region: Option<String>,

    /// ARN of the account principal allowed to manage the application's DNS.
    #[arg(long, global = true, env = "ENVFORGE_PRINCIPAL_ARN")]
    pub principal_arn: Option<String>,

    /// ARN of the role assumed to read and stage the environment's resources.
    #[arg(long, global = true, env = "ENVFORGE_MANAGER_ROLE_ARN")]
    pub manager_role_arn: Option<String>,

    /// ARN of the role the control plane assumes for stack actions.
    #[arg(long, global = true, env = "ENVFORGE_EXECUTION_ROLE_ARN")]
    pub execution_role_arn: Option<String>,

    /// Tag applied to the environment's resources, as KEY=VALUE.
    #[arg(long = "tag", global = true, value_parser = parse_tag)]
    pub tags: Vec<(String, String)>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new environment manifest.
    Init {
        /// Directory to initialize (defaults to current directory).
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Force overwrite existing files.
        #[arg(short, long)]
        force: bool,
    },

    /// Validate the environment manifest.
    Validate {
        /// Show all warnings, not just errors.
        #[arg(short, long)]
        warnings: bool,
    },

    /// Stage the environment's custom resource bundles in the artifact bucket.
    Upload,

    /// Render the environment's stack template and parameters.
    Package {
        /// Directory to write the rendered documents to (stdout if omitted).
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Deploy the environment's infrastructure stack.
    Deploy {
        /// Skip confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Parses a `KEY=VALUE` tag argument.
fn parse_tag(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("invalid tag '{raw}': expected KEY=VALUE"))
}
