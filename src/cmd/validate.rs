//! Validate command - surface data quality issues without generating the full summary

use super::{run_analysis, EntityArgs, InputArgs};
use crate::core::{CgtEvent, Warning};
use clap::Args;
use serde::Serialize;

#[derive(Args, Debug)]
pub struct ValidateCommand {
    #[command(flatten)]
    input: InputArgs,

    #[command(flatten)]
    entity: EntityArgs,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

/// A validation issue for output
#[derive(Debug, Clone, Serialize)]
struct ValidationIssue {
    #[serde(rename = "type")]
    issue_type: &'static str,
    transaction_id: Option<String>,
    message: String,
}

#[derive(Debug, Serialize)]
struct ValidationOutput {
    financial_year: String,
    issue_count: usize,
    issues: Vec<ValidationIssue>,
}

impl ValidateCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let summary = run_analysis(&self.input, &self.entity)?;

        let mut issues: Vec<ValidationIssue> = summary.warnings.iter().map(warning_issue).collect();
        issues.extend(summary.events.iter().flat_map(event_issues));

        if self.json {
            let output = ValidationOutput {
                financial_year: summary.period.display(),
                issue_count: issues.len(),
                issues: issues.clone(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            print_text(&issues, &summary.period.display());
        }

        // Exit with code 1 if issues found
        if !issues.is_empty() {
            std::process::exit(1);
        }
        Ok(())
    }
}

fn warning_issue(warning: &Warning) -> ValidationIssue {
    let (issue_type, transaction_id) = match warning {
        Warning::ExcludedTransaction { transaction_id, .. } => {
            ("ExcludedTransaction", Some(transaction_id.clone()))
        }
        Warning::RateFallback { .. } => ("RateFallback", None),
    };
    ValidationIssue {
        issue_type,
        transaction_id,
        message: warning.to_string(),
    }
}

fn event_issues(event: &CgtEvent) -> Vec<ValidationIssue> {
    let issue = |issue_type, message: String| ValidationIssue {
        issue_type,
        transaction_id: Some(event.source_transaction_id.clone()),
        message,
    };
    let mut issues = Vec::new();
    if let Some(warning) = &event.cost_base_warning {
        issues.push(issue("CostBaseInteraction", warning.clone()));
    }
    if let Some(warning) = &event.statute_warning {
        issues.push(issue("AmendmentPeriod", warning.clone()));
    }
    if event.is_low_confidence() {
        issues.push(issue(
            "LowConfidence",
            format!(
                "Classified as {} with confidence {}; review the classification",
                event.kind.display(),
                event.confidence
            ),
        ));
    }
    issues
}

fn print_text(issues: &[ValidationIssue], year: &str) {
    println!();
    println!("VALIDATION RESULTS ({})", year);
    println!();

    if issues.is_empty() {
        println!("\u{2713} No issues found.");
        return;
    }

    println!("\u{26A0} {} issue(s) found:", issues.len());
    println!();
    for (i, issue) in issues.iter().enumerate() {
        match &issue.transaction_id {
            Some(id) => println!("  {}. [{}] {}", i + 1, issue.issue_type, id),
            None => println!("  {}. [{}]", i + 1, issue.issue_type),
        }
        println!("     {}", issue.message);
        println!();
    }
}
