//! Init command: create the workspace and the files the operator edits.

use super::{connect, print_json};
use crate::cli::prompt::confirm;
use crate::config::{CliOverrides, ProjectConfig, load_config, load_settings, settings_template};
use crate::error::Result;
use crate::schema::{FieldMap, SchemaCache, SchemaCatalog};
use crate::sync::target_for;
use crate::template::render_template;
use crate::util::write_atomic;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Serialize)]
struct InitResult {
    workspace: PathBuf,
    created: Vec<PathBuf>,
}

fn approve(config: &ProjectConfig, path: &Path) -> Result<bool> {
    if config.no_prompt {
        return Ok(true);
    }
    confirm(&format!("{} does not exist. Create it?", path.display()))
}

/// Execute the init command.
///
/// Existing files are never overwritten.
///
/// # Errors
///
/// Returns an error if a directory or file cannot be written, or the
/// catalog for a missing template cannot be loaded.
pub fn execute(config_path: Option<&Path>, overrides: &CliOverrides, json: bool) -> Result<()> {
    let config = load_config(config_path, overrides)?;
    let workspace = config.workspace();
    if !workspace.root().is_dir() && !approve(&config, workspace.root())? {
        info!(path = %workspace.root().display(), "Workspace creation declined");
        if json {
            return print_json(&InitResult {
                workspace: workspace.root().to_path_buf(),
                created: Vec::new(),
            });
        }
        println!("Workspace {} was not created", workspace.root().display());
        return Ok(());
    }
    workspace.ensure_dirs()?;

    let mut created = Vec::new();

    let settings_path = workspace.settings_path();
    if !settings_path.is_file() && approve(&config, &settings_path)? {
        write_atomic(
            &settings_path,
            settings_template(config.reporter.as_deref()).as_bytes(),
        )?;
        info!(path = %settings_path.display(), "Created settings file");
        created.push(settings_path.clone());
    }

    let missing = workspace.missing_templates();
    if !missing.is_empty() {
        let settings = if settings_path.is_file() {
            load_settings(&workspace)?
        } else {
            FieldMap::new()
        };
        let mut client = connect(&config)?;
        let mut catalog = SchemaCatalog::new(SchemaCache::new(workspace.cache_dir()));

        for kind in missing {
            let path = workspace.template_path(kind);
            if !approve(&config, &path)? {
                continue;
            }
            let target = target_for(&config, kind)?;
            let fields = catalog.load(&mut client, &target, &settings)?;
            write_atomic(&path, render_template(&target, fields, &settings)?.as_bytes())?;
            info!(path = %path.display(), "Created template");
            created.push(path);
        }
    }

    if json {
        return print_json(&InitResult {
            workspace: workspace.root().to_path_buf(),
            created,
        });
    }

    if created.is_empty() {
        println!("Workspace {} is ready", workspace.root().display());
    } else {
        for path in &created {
            println!("Created {}", path.display());
        }
        println!("Edit the files above and remove the marker lines, then run `mmj run <outline>`");
    }
    Ok(())
}
