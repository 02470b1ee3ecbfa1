//! Per-kind payload plans: catalog, merged template and target.
//!
//! Loading a plan is the last step before the passes start. Settings are
//! merged into every template whose catalog knows the field, then every
//! template is validated so a bad value stops the run before the first
//! tracker write.

use super::{KindPlan, KindPlans};
use crate::config::{ProjectConfig, Templates, Workspace, load_settings};
use crate::error::{MmjError, Result};
use crate::outline::IssueKind;
use crate::schema::{FieldMap, IssueTarget, SchemaCache, SchemaCatalog};
use crate::tracker::TrackerClient;
use crate::validation::{TemplateCheck, validate_templates};
use indexmap::IndexMap;

/// Tracker target for a tracked kind.
///
/// # Errors
///
/// Returns a config error for kinds that never become tracker records.
pub fn target_for(config: &ProjectConfig, kind: IssueKind) -> Result<IssueTarget> {
    let issue_type = config
        .issue_types
        .name_for(kind)
        .ok_or_else(|| MmjError::Config(format!("{kind} nodes are not tracker records")))?;
    Ok(IssueTarget::new(&config.project_key, issue_type))
}

/// Load every tracked kind's catalog, ordered against `settings`.
///
/// # Errors
///
/// Returns the first cache, fetch or schema error.
pub fn load_catalog(
    config: &ProjectConfig,
    workspace: &Workspace,
    tracker: &mut dyn TrackerClient,
    settings: &FieldMap,
) -> Result<(SchemaCatalog, IndexMap<IssueKind, IssueTarget>)> {
    let mut catalog = SchemaCatalog::new(SchemaCache::new(workspace.cache_dir()));
    let mut targets = IndexMap::new();
    for kind in IssueKind::TRACKED {
        let target = target_for(config, kind)?;
        catalog.load(tracker, &target, settings)?;
        targets.insert(kind, target);
    }
    Ok((catalog, targets))
}

/// Build validated plans for all tracked kinds.
///
/// # Errors
///
/// Returns an error for missing or unedited templates, a missing settings
/// file, catalog failures, or the batch of template problems.
pub fn prepare_plans(
    config: &ProjectConfig,
    workspace: &Workspace,
    tracker: &mut dyn TrackerClient,
) -> Result<KindPlans> {
    let mut templates = Templates::load(workspace)?;
    let settings = load_settings(workspace)?;
    let (catalog, targets) = load_catalog(config, workspace, tracker, &settings)?;

    templates.merge_settings(&settings, |kind, name| {
        targets
            .get(&kind)
            .and_then(|target| catalog.get(target))
            .is_some_and(|fields| fields.iter().any(|f| f.name == name))
    });

    let mut checks = Vec::new();
    for (kind, target) in &targets {
        let (Some(values), Some(source), Some(fields)) = (
            templates.get(*kind),
            templates.path(*kind),
            catalog.get(target),
        ) else {
            return Err(MmjError::Config(format!("no template loaded for {kind}")));
        };
        checks.push(TemplateCheck {
            kind: *kind,
            source,
            target,
            fields,
            values,
        });
    }
    validate_templates(&checks)?;

    let mut plans = KindPlans::new();
    for check in &checks {
        plans.insert(
            check.kind,
            KindPlan {
                target: check.target.clone(),
                fields: check.fields.to_vec(),
                template: check.values.clone(),
            },
        );
    }
    Ok(plans)
}
