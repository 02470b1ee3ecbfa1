//! Run command: create every outline node that has no tracker record yet.

use super::{connect, print_json, sync_options};
use crate::checkpoint::FileCheckpointStore;
use crate::cli::OutlineArgs;
use crate::config::{CliOverrides, load_config};
use crate::error::Result;
use crate::outline::{OutlineTree, parse_outline_file};
use crate::sync::{SyncEngine, SyncReport, prepare_plans};
use std::path::Path;
use tracing::info;

/// Execute the run command.
///
/// # Errors
///
/// Returns the first configuration, validation, remote or checkpoint error.
pub fn execute(
    args: &OutlineArgs,
    config_path: Option<&Path>,
    overrides: &CliOverrides,
    json: bool,
) -> Result<()> {
    let config = load_config(config_path, overrides)?;
    let workspace = config.workspace();

    let tree = OutlineTree::build(&parse_outline_file(&args.outline)?)?;
    info!(path = %args.outline.display(), nodes = tree.len(), "Outline loaded");

    let mut client = connect(&config)?;
    let plans = prepare_plans(&config, &workspace, &mut client)?;
    workspace.ensure_dirs()?;

    let store = FileCheckpointStore::new(workspace.data_dir());
    let options = sync_options(&config);
    let report = SyncEngine::new(&tree, &plans, &store, &mut client, &options).run()?;

    if json {
        print_json(&report)
    } else {
        print_report(&report);
        Ok(())
    }
}

fn print_report(report: &SyncReport) {
    println!(
        "Created {}, linked {}, skipped {}",
        report.created.len(),
        report.linked.len(),
        report.skipped
    );
    for entry in &report.summary {
        match &entry.url {
            Some(url) => println!("  {:<9}{url} -> {}", entry.kind, entry.title),
            None => println!("  {:<9}(not created) -> {}", entry.kind, entry.title),
        }
    }
}
