//! Command line argument definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Jetstream Automation - bulk-toggle Salesforce declarative automation
#[derive(Parser, Debug)]
#[command(name = "jetstream-automation")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Skip preflight checks
    #[arg(long, global = true)]
    pub skip_preflight: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List automation items for one or more objects
    List {
        /// Object API names, e.g. Account Contact
        #[arg(value_name = "SOBJECTS", required = true)]
        sobjects: Vec<String>,

        /// Only show items of one type (validation-rule, workflow-rule,
        /// flow, apex-trigger, assignment-rule)
        #[arg(short = 't', long)]
        automation_type: Option<String>,
    },

    /// Build a deployment plan from a changes file
    Plan {
        /// Path to the TOML changes file
        #[arg(short, long, value_name = "CHANGES")]
        changes: PathBuf,

        /// Output path for the plan file
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,
    },

    /// Deploy a previously built plan
    Deploy {
        /// Path to the plan file
        #[arg(value_name = "PLAN_FILE")]
        plan_file: PathBuf,

        /// Output path for the post-deploy snapshot
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,
    },

    /// Roll back a previous deployment from its snapshot
    Rollback {
        /// Path to the snapshot file
        #[arg(value_name = "SNAPSHOT_FILE")]
        snapshot_file: PathBuf,
    },

    /// Verify org configuration and connectivity
    Verify,
}
