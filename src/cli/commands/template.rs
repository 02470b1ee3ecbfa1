//! Template command: print a generated template for one issue type.

use super::connect;
use crate::cli::TemplateArgs;
use crate::config::{CliOverrides, load_config, load_settings};
use crate::error::Result;
use crate::outline::IssueKind;
use crate::schema::{FieldMap, SchemaCache, SchemaCatalog};
use crate::sync::target_for;
use crate::template::render_template;
use std::path::Path;

/// Execute the template command.
///
/// Settings values, when the settings file exists, are shown as the
/// chosen values.
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded or a settings value is
/// not allowed.
pub fn execute(args: &TemplateArgs, config_path: Option<&Path>, overrides: &CliOverrides) -> Result<()> {
    let config = load_config(config_path, overrides)?;
    let workspace = config.workspace();
    let settings = if workspace.settings_path().is_file() {
        load_settings(&workspace)?
    } else {
        FieldMap::new()
    };

    let kind = IssueKind::from(args.kind);
    let target = target_for(&config, kind)?;
    let mut client = connect(&config)?;
    let mut catalog = SchemaCatalog::new(SchemaCache::new(workspace.cache_dir()));
    let fields = catalog.load(&mut client, &target, &settings)?;

    print!("{}", render_template(&target, fields, &settings)?);
    Ok(())
}
