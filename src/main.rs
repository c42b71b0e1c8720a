//! Jetstream Automation CLI
//!
//! A command-line tool for bulk-enabling/disabling declarative Salesforce
//! automation with staged deploy and rollback.

use clap::Parser;
use jetstream_automation::cli::{
    args::{Cli, Commands},
    commands::{deploy, list, plan, rollback, verify},
};
use jetstream_automation::preflight;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    // Run the appropriate command
    match cli.command {
        Commands::List {
            sobjects,
            automation_type,
        } => {
            if !cli.skip_preflight {
                run_preflight_checks().await?;
            }
            list::list(&sobjects, automation_type.as_deref()).await?;
        }

        Commands::Plan { changes, output } => {
            if !cli.skip_preflight {
                run_preflight_checks().await?;
            }
            plan::plan(&changes, output.as_deref()).await?;
        }

        Commands::Deploy { plan_file, output } => {
            if !cli.skip_preflight {
                run_preflight_checks().await?;
            }
            deploy::deploy(&plan_file, output.as_deref()).await?;
        }

        Commands::Rollback { snapshot_file } => {
            if !cli.skip_preflight {
                run_preflight_checks().await?;
            }
            rollback::rollback(&snapshot_file).await?;
        }

        Commands::Verify => {
            verify::verify().await?;
        }
    }

    Ok(())
}

/// Initialize the logging system.
fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("jetstream_automation=debug")
    } else {
        EnvFilter::new("jetstream_automation=info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}

/// Run preflight checks and exit if any fail.
async fn run_preflight_checks() -> anyhow::Result<()> {
    use colored::Colorize;

    println!("{}", "Running preflight checks...".bold());
    println!();

    let results = preflight::run_preflight_checks().await?;
    preflight::print_results(&results);

    println!();

    if !preflight::all_passed(&results) {
        anyhow::bail!("Preflight checks failed. Fix the issues above and try again.");
    }

    Ok(())
}
