// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Envforge
//!
//! A deployment pipeline for shared application environments on AWS.
//!
//! ## Overview
//!
//! Envforge turns a small environment manifest into a fully provisioned
//! CloudFormation stack, allowing you to:
//!
//! - Describe an environment's network, listeners, and observability in YAML
//! - Stage the custom resource functions the stack depends on
//! - Render the stack template and its reconciled parameters for review
//! - Deploy the stack with live progress, under a scoped execution role
//!
//! ## Architecture
//!
//! A deployment flows through four stages:
//!
//! 1. **Resolve**: Locate the application's regional artifact bucket and key
//! 2. **Stage**: Upload custom resource bundles under content-digest keys
//! 3. **Synthesize**: Build the desired stack from the manifest and the
//!    previously deployed parameters
//! 4. **Deploy**: Create or update the stack and stream its events
//!
//! ## Modules
//!
//! - [`manifest`]: Environment manifest parsing and validation
//! - [`artifacts`]: Custom resource bundles and staging
//! - [`stack`]: Stack template and parameter synthesis
//! - [`cloud`]: AWS collaborators (S3, CloudFormation)
//! - [`deployer`]: The deployment pipeline
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! name: test
//! type: Environment
//!
//! network:
//!   vpc:
//!     cidr: "10.0.0.0/16"
//!
//! observability:
//!   container_insights: true
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod artifacts;
pub mod cli;
pub mod cloud;
pub mod deployer;
pub mod error;
pub mod manifest;
pub mod stack;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use cloud::{AppRegionalResources, Application, Environment, StackParameter};
pub use deployer::{Collaborators, EnvDeployer, SerializerFactory};
pub use error::{EnvForgeError, Result};
pub use manifest::{EnvironmentManifest, ManifestParser, ManifestValidator};
pub use stack::{
    DeployEnvironmentInput, DeploymentOutput, DesiredStackInput, EnvStackSynthesizer,
    StackSerializer,
};
