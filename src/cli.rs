// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Args, Parser, Subcommand};
use cutover::types::{Environment, ReleaseVersion, ResourceName};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cutover")]
#[command(about = "Blue/green releases for Kubernetes deployments")]
#[command(version)]
pub struct Cli {
    /// Path to the configuration file (default: discover cutover.yml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Minimal output for CI
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Output JSON lines for scripting
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Selects the app and namespace a command operates on.
#[derive(Args, Debug, Clone)]
pub struct Target {
    /// Target environment
    #[arg(short, long)]
    pub environment: Environment,

    /// Kubernetes namespace (default: from config)
    #[arg(short, long)]
    pub namespace: Option<ResourceName>,

    /// Application name (default: from config)
    #[arg(short, long)]
    pub app: Option<ResourceName>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new cutover.yml configuration file
    Init {
        /// Application name
        #[arg(short, long)]
        app: Option<String>,

        /// Overwrite existing config file
        #[arg(short, long)]
        force: bool,
    },

    /// Release a new version into the inactive color and switch traffic to it
    Deploy {
        /// Image tag or digest to release
        #[arg(long = "version")]
        version: ReleaseVersion,

        #[command(flatten)]
        target: Target,

        /// Readiness budget for the new color, in seconds
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Show what would happen without changing the cluster
        #[arg(long)]
        dry_run: bool,

        /// Skip smoke tests (recorded in the audit record)
        #[arg(long)]
        skip_tests: bool,
    },

    /// Switch traffic back to the inactive color
    Rollback {
        #[command(flatten)]
        target: Target,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        force: bool,

        /// Show what would happen without changing the cluster
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the active color and replica counts of both colors
    Status {
        #[command(flatten)]
        target: Target,
    },
}
