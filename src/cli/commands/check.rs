//! Check command: validate the edited templates without creating anything.

use super::{connect, print_json};
use crate::config::{CliOverrides, load_config};
use crate::error::Result;
use crate::sync::prepare_plans;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Serialize)]
struct CheckedKind {
    kind: String,
    issue_type: String,
    fields: usize,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    valid: bool,
    kinds: Vec<CheckedKind>,
}

/// Execute the check command.
///
/// # Errors
///
/// Returns the batch of template problems, or the first load error.
pub fn execute(config_path: Option<&Path>, overrides: &CliOverrides, json: bool) -> Result<()> {
    let config = load_config(config_path, overrides)?;
    let workspace = config.workspace();
    let mut client = connect(&config)?;
    let plans = prepare_plans(&config, &workspace, &mut client)?;

    let result = CheckResult {
        valid: true,
        kinds: plans
            .iter()
            .map(|(kind, plan)| CheckedKind {
                kind: kind.to_string(),
                issue_type: plan.target.issue_type.clone(),
                fields: plan.template.len(),
            })
            .collect(),
    };

    if json {
        return print_json(&result);
    }
    println!("Templates are valid");
    for kind in &result.kinds {
        println!("  {:<9}{} ({} fields)", kind.kind, kind.issue_type, kind.fields);
    }
    Ok(())
}
