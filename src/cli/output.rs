//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use std::collections::HashMap;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::manifest::{EnvironmentManifest, ValidationReport};
use crate::stack::DeploymentOutput;

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Staged custom resource row for table display.
#[derive(Tabled)]
struct ArtifactRow {
    #[tabled(rename = "Function")]
    function: String,
    #[tabled(rename = "URL")]
    url: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats the staged custom resource URLs for display.
    #[must_use]
    pub fn format_artifacts(&self, urls: &HashMap<String, String>) -> String {
        match self.format {
            OutputFormat::Json => {
                let mut entries: Vec<ArtifactJson> = urls
                    .iter()
                    .map(|(function, url)| ArtifactJson {
                        function: function.clone(),
                        url: url.clone(),
                    })
                    .collect();
                entries.sort_by(|a, b| a.function.cmp(&b.function));
                serde_json::to_string_pretty(&entries).unwrap_or_default()
            }
            OutputFormat::Text => Self::format_artifacts_text(urls),
        }
    }

    /// Formats staged artifacts as a table.
    fn format_artifacts_text(urls: &HashMap<String, String>) -> String {
        let mut rows: Vec<ArtifactRow> = urls
            .iter()
            .map(|(function, url)| ArtifactRow {
                function: function.clone(),
                url: Self::truncate(url, 76),
            })
            .collect();
        rows.sort_by(|a, b| a.function.cmp(&b.function));

        let mut output = String::new();
        if !rows.is_empty() {
            let table = Table::new(rows).to_string();
            output.push_str(&table);
            output.push('\n');
        }

        let _ = write!(
            output,
            "\n{} {} custom resources staged.\n",
            "\u{2713}".green(),
            urls.len()
        );
        output
    }

    /// Formats a rendered stack for display.
    ///
    /// Text output is the template body itself so it can be piped into a
    /// file; JSON output carries both rendered documents.
    #[must_use]
    pub fn format_package(&self, output: &DeploymentOutput) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&PackageJson {
                template: output.template.clone(),
                parameters: output.parameters.clone(),
            })
            .unwrap_or_default(),
            OutputFormat::Text => output.template.clone(),
        }
    }

    /// Formats a manifest validation report.
    #[must_use]
    pub fn format_validation(
        &self,
        manifest: &EnvironmentManifest,
        report: &ValidationReport,
        show_warnings: bool,
    ) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&ValidationJson {
                environment: manifest.name.clone(),
                valid: report.is_valid(),
                warnings: report.warnings.clone(),
            })
            .unwrap_or_default(),
            OutputFormat::Text => Self::format_validation_text(manifest, report, show_warnings),
        }
    }

    /// Formats a validation report as text.
    fn format_validation_text(
        manifest: &EnvironmentManifest,
        report: &ValidationReport,
        show_warnings: bool,
    ) -> String {
        let mut output = String::new();

        let _ = writeln!(
            output,
            "{} Manifest for environment '{}' is valid.",
            "\u{2713}".green(),
            manifest.name
        );

        output.push_str("\nEnvironment summary:\n");
        if manifest.is_imported_vpc() {
            let _ = writeln!(
                output,
                "  VPC: imported ({})",
                manifest.network.vpc.id.as_deref().unwrap_or("unknown")
            );
            let _ = writeln!(
                output,
                "  Public subnets: {}",
                manifest.imported_public_subnet_ids().len()
            );
            let _ = writeln!(
                output,
                "  Private subnets: {}",
                manifest.imported_private_subnet_ids().len()
            );
        } else {
            let _ = writeln!(output, "  VPC: managed ({})", manifest.vpc_cidr());
            let _ = writeln!(
                output,
                "  Public subnets: {}",
                manifest.public_managed_subnets().len()
            );
            let _ = writeln!(
                output,
                "  Private subnets: {}",
                manifest.private_managed_subnets().len()
            );
        }
        let _ = writeln!(
            output,
            "  Public certificates: {}",
            manifest.http.public.certificates.len()
        );
        let _ = writeln!(
            output,
            "  Internal certificates: {}",
            manifest.http.private.certificates.len()
        );
        let _ = writeln!(
            output,
            "  Container insights: {}",
            if manifest.observability.container_insights {
                "enabled"
            } else {
                "disabled"
            }
        );

        if show_warnings && !report.warnings.is_empty() {
            let _ = write!(output, "\n{} Warnings:\n", "\u{26a0}".yellow());
            for warning in &report.warnings {
                let _ = writeln!(output, "   - {warning}");
            }
        }

        output
    }

    /// Truncates a string to a maximum length.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.len() <= max_len {
            s.to_string()
        } else {
            format!("{}...", &s[..max_len - 3])
        }
    }
}

// JSON serialization helpers

#[derive(serde::Serialize)]
struct ArtifactJson {
    function: String,
    url: String,
}

#[derive(serde::Serialize)]
struct PackageJson {
    template: String,
    parameters: String,
}

#[derive(serde::Serialize)]
struct ValidationJson {
    environment: String,
    valid: bool,
    warnings: Vec<String>,
}
