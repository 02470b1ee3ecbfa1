//! Summary command: report tracker keys from local checkpoints only.

use super::{print_json, sync_options};
use crate::checkpoint::FileCheckpointStore;
use crate::cli::OutlineArgs;
use crate::config::{CliOverrides, load_config};
use crate::error::Result;
use crate::outline::{OutlineTree, parse_outline_file};
use crate::sync::summarize;
use std::path::Path;

/// Execute the summary command.
///
/// # Errors
///
/// Returns an error if the config, outline or a checkpoint cannot be read.
pub fn execute(
    args: &OutlineArgs,
    config_path: Option<&Path>,
    overrides: &CliOverrides,
    json: bool,
) -> Result<()> {
    let config = load_config(config_path, overrides)?;
    let workspace = config.workspace();
    let tree = OutlineTree::build(&parse_outline_file(&args.outline)?)?;
    let store = FileCheckpointStore::new(workspace.data_dir());

    let entries = summarize(&tree, &store, &sync_options(&config))?;
    if json {
        return print_json(&entries);
    }

    let created = entries.iter().filter(|e| e.key.is_some()).count();
    println!("{created} of {} nodes created", entries.len());
    for entry in &entries {
        let key = entry.key.as_deref().unwrap_or("-");
        println!("  {:<9}{key:<12}{}", entry.kind, entry.title);
    }
    Ok(())
}
