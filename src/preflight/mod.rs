//! Preflight checks run before any command touches the org.

mod org;

use crate::Result;
use colored::Colorize;

/// Outcome of one preflight check.
#[derive(Debug)]
pub enum CheckOutcome {
    Passed(String),
    Failed { message: String, hint: String },
}

/// A named preflight check and its outcome.
#[derive(Debug)]
pub struct CheckResult {
    pub name: &'static str,
    pub outcome: CheckOutcome,
}

impl CheckResult {
    pub fn passed(name: &'static str, message: impl Into<String>) -> Self {
        Self {
            name,
            outcome: CheckOutcome::Passed(message.into()),
        }
    }

    pub fn failed(name: &'static str, message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            name,
            outcome: CheckOutcome::Failed {
                message: message.into(),
                hint: hint.into(),
            },
        }
    }

    pub fn is_passed(&self) -> bool {
        matches!(self.outcome, CheckOutcome::Passed(_))
    }
}

/// Run all preflight checks.
pub async fn run_preflight_checks() -> Result<Vec<CheckResult>> {
    let mut results = Vec::new();

    // Connectivity is only worth checking with a configured org
    if let Some(config) = org::check_config(&mut results) {
        results.push(org::check_connection(config).await);
    }

    Ok(results)
}

/// Print preflight check results.
pub fn print_results(results: &[CheckResult]) {
    for result in results {
        match &result.outcome {
            CheckOutcome::Passed(message) => {
                println!("{} {}: {}", "[OK]".green(), result.name.bold(), message);
            }
            CheckOutcome::Failed { message, hint } => {
                println!("{} {}: {}", "[FAIL]".red(), result.name.bold(), message);
                println!("  {} {}", "->".yellow(), hint);
            }
        }
    }
}

/// Check if all preflight checks passed.
pub fn all_passed(results: &[CheckResult]) -> bool {
    results.iter().all(CheckResult::is_passed)
}
