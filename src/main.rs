//! Envforge CLI entrypoint.
//!
//! This is the main entrypoint for the envforge command-line tool.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use envforge::cli::{Cli, Commands, OutputFormatter};
use envforge::cloud::{Application, Environment};
use envforge::deployer::EnvDeployer;
use envforge::error::{EnvForgeError, ManifestError, Result};
use envforge::manifest::{
    EnvironmentManifest, ManifestParser, ManifestValidator, find_manifest_file,
};
use envforge::stack::DeployEnvironmentInput;

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);

    match &cli.command {
        Commands::Init { path, force } => cmd_init(path, *force),
        Commands::Validate { warnings } => cmd_validate(&cli, *warnings, &formatter),
        Commands::Upload => cmd_upload(&cli, &formatter).await,
        Commands::Package { output_dir } => {
            cmd_package(&cli, output_dir.as_deref(), &formatter).await
        }
        Commands::Deploy { yes } => cmd_deploy(&cli, *yes).await,
    }
}

/// Initialize a new environment manifest.
fn cmd_init(path: &Path, force: bool) -> Result<()> {
    info!("Initializing environment manifest in: {}", path.display());

    let manifest_path = path.join("envforge.env.yaml");
    let env_path = path.join(".env.example");
    let gitignore_path = path.join(".gitignore");

    // Check if files exist
    if !force && manifest_path.exists() {
        eprintln!("Manifest file already exists: {}", manifest_path.display());
        eprintln!("Use --force to overwrite.");
        return Ok(());
    }

    // Create directory if needed
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }

    // Write manifest template
    let manifest_template = include_str!("../templates/environment.manifest.yaml");
    std::fs::write(&manifest_path, manifest_template)?;
    eprintln!("Created: {}", manifest_path.display());

    // Write .env.example
    let env_template = include_str!("../templates/.env.example");
    std::fs::write(&env_path, env_template)?;
    eprintln!("Created: {}", env_path.display());

    // Write/update .gitignore
    if gitignore_path.exists() {
        let existing = std::fs::read_to_string(&gitignore_path)?;
        if !existing.contains(".env") {
            let mut file = std::fs::OpenOptions::new()
                .append(true)
                .open(&gitignore_path)?;
            writeln!(file, "\n.env")?;
            eprintln!("Updated: {}", gitignore_path.display());
        }
    } else {
        std::fs::write(&gitignore_path, ".env\n")?;
        eprintln!("Created: {}", gitignore_path.display());
    }

    eprintln!("\nEnvironment initialized successfully!");
    eprintln!("Next steps:");
    eprintln!("  1. Copy .env.example to .env and fill in your deployment settings");
    eprintln!("  2. Edit envforge.env.yaml with your environment configuration");
    eprintln!("  3. Run 'envforge validate' to check the manifest");
    eprintln!("  4. Run 'envforge package' to preview the rendered stack");
    eprintln!("  5. Run 'envforge deploy' to deploy the environment");

    Ok(())
}

/// Validate the environment manifest.
fn cmd_validate(cli: &Cli, show_warnings: bool, formatter: &OutputFormatter) -> Result<()> {
    let (manifest, _raw) = load_manifest(cli)?;
    let report = ManifestValidator::new().validate(&manifest)?;

    eprintln!(
        "{}",
        formatter.format_validation(&manifest, &report, show_warnings)
    );
    Ok(())
}

/// Stage the custom resource bundles in the artifact bucket.
async fn cmd_upload(cli: &Cli, formatter: &OutputFormatter) -> Result<()> {
    let (manifest, _raw) = load_manifest(cli)?;
    ManifestValidator::new().validate(&manifest)?;
    let (app, env) = deployment_context(cli, &manifest)?;

    let deployer = EnvDeployer::new(app, env).await;
    let urls = deployer.upload_artifacts().await?;

    eprintln!("{}", formatter.format_artifacts(&urls));
    Ok(())
}

/// Render the stack template and parameters.
async fn cmd_package(
    cli: &Cli,
    output_dir: Option<&Path>,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (manifest, raw) = load_manifest(cli)?;
    ManifestValidator::new().validate(&manifest)?;
    let (app, env) = deployment_context(cli, &manifest)?;
    let env_name = env.name.clone();

    let deployer = EnvDeployer::new(app, env).await;
    let urls = deployer.upload_artifacts().await?;
    let input = DeployEnvironmentInput {
        root_user_arn: optional_setting(cli.principal_arn.as_ref(), "ENVFORGE_PRINCIPAL_ARN")
            .unwrap_or_default(),
        custom_resources_urls: urls,
        manifest,
        raw_manifest: raw,
    };
    let output = deployer.generate_cloudformation_template(&input).await?;

    if let Some(dir) = output_dir {
        std::fs::create_dir_all(dir)?;
        let template_path = dir.join(format!("{env_name}.stack.yml"));
        let params_path = dir.join(format!("{env_name}.params.json"));
        std::fs::write(&template_path, &output.template)?;
        std::fs::write(&params_path, &output.parameters)?;
        eprintln!("Created: {}", template_path.display());
        eprintln!("Created: {}", params_path.display());
    } else {
        println!("{}", formatter.format_package(&output));
    }

    Ok(())
}

/// Deploy the environment's infrastructure stack.
async fn cmd_deploy(cli: &Cli, auto_approve: bool) -> Result<()> {
    let (manifest, raw) = load_manifest(cli)?;
    ManifestValidator::new().validate(&manifest)?;
    let (app, env) = deployment_context(cli, &manifest)?;
    let stack_name = env.stack_name(&app.name);

    // Confirm
    if !auto_approve {
        eprint!("Deploy stack {stack_name} to {}? [y/N]: ", env.region);
        std::io::stderr().flush()?;

        let mut answer = String::new();
        std::io::stdin().read_line(&mut answer)?;

        if !answer.trim().eq_ignore_ascii_case("y") {
            eprintln!("Deployment cancelled.");
            return Ok(());
        }
    }

    let deployer = EnvDeployer::new(app, env).await;
    let urls = deployer.upload_artifacts().await?;
    let input = DeployEnvironmentInput {
        root_user_arn: optional_setting(cli.principal_arn.as_ref(), "ENVFORGE_PRINCIPAL_ARN")
            .unwrap_or_default(),
        custom_resources_urls: urls,
        manifest,
        raw_manifest: raw,
    };

    let mut progress = std::io::stderr();
    deployer.deploy_environment(&mut progress, &input).await?;

    eprintln!("\nStack {stack_name} deployed successfully.");
    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Resolves the manifest file path.
fn resolve_manifest_path(manifest_path: Option<&PathBuf>) -> Result<PathBuf> {
    manifest_path.map_or_else(|| find_manifest_file("."), |path| Ok(path.clone()))
}

/// Loads the manifest and its raw text, applying .env and environment
/// variable overrides.
fn load_manifest(cli: &Cli) -> Result<(EnvironmentManifest, String)> {
    let manifest_file = resolve_manifest_path(cli.manifest.as_ref())?;
    debug!("Loading manifest from: {}", manifest_file.display());

    let parser = ManifestParser::new()
        .with_base_path(manifest_file.parent().unwrap_or_else(|| Path::new(".")));
    parser.load_dotenv()?;

    let manifest = parser.load_with_env(&manifest_file)?;
    let raw = std::fs::read_to_string(&manifest_file)?;
    Ok((manifest, raw))
}

/// Builds the application and environment the commands operate on.
fn deployment_context(
    cli: &Cli,
    manifest: &EnvironmentManifest,
) -> Result<(Application, Environment)> {
    let app = Application {
        name: setting(cli.app.as_ref(), "ENVFORGE_APP", "--app (or ENVFORGE_APP)")?,
        domain: optional_setting(cli.domain.as_ref(), "ENVFORGE_APP_DOMAIN"),
        tags: cli.tags.iter().cloned().collect(),
    };
    let env = Environment {
        name: manifest.name.clone(),
        region: setting(
            cli.region.as_ref(),
            "ENVFORGE_REGION",
            "--region (or ENVFORGE_REGION)",
        )?,
        manager_role_arn: optional_setting(cli.manager_role_arn.as_ref(), "ENVFORGE_MANAGER_ROLE_ARN")
            .unwrap_or_default(),
        execution_role_arn: optional_setting(
            cli.execution_role_arn.as_ref(),
            "ENVFORGE_EXECUTION_ROLE_ARN",
        )
        .unwrap_or_default(),
    };
    Ok((app, env))
}

/// Returns a required setting from a flag or its environment variable.
fn setting(flag: Option<&String>, env_key: &str, name: &str) -> Result<String> {
    optional_setting(flag, env_key).ok_or_else(|| {
        EnvForgeError::Manifest(ManifestError::MissingSetting {
            name: name.to_string(),
        })
    })
}

/// Returns an optional setting from a flag or its environment variable.
fn optional_setting(flag: Option<&String>, env_key: &str) -> Option<String> {
    flag.cloned()
        .or_else(|| std::env::var(env_key).ok().filter(|value| !value.is_empty()))
}
