//! Outline to tracker synchronization.
//!
//! The engine walks the outline in passes, each over the whole tree before
//! the next starts:
//!
//! 1. epics: create every epic without a checkpoint
//! 2. links: attach every created, unlinked epic to the top-level parent
//! 3. tasks: create every task under its epic
//! 4. sub-tasks: create every sub-task under its task
//! 5. summary: report every tracked node and its key
//!
//! A node is skipped iff its checkpoint records a tracker key, so re-running
//! after a failure only does the work that is left. A checkpoint is written
//! only after the tracker returned a key.

pub mod plan;

pub use plan::{load_catalog, prepare_plans, target_for};

use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::error::{MmjError, OptionExt, Result};
use crate::outline::{IssueKind, OutlineNode, OutlineTree};
use crate::payload::PayloadBuilder;
use crate::schema::{FieldMap, FieldSchema, FieldValue, IssueTarget, Reference};
use crate::tracker::TrackerClient;
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Description sent when a node has no body of its own.
pub const DESCRIPTION_PLACEHOLDER: &str = "---";
/// Separator between a sub-task's rendered children and its note.
pub const NOTE_SEPARATOR: &str = "-----------------------------\n\n\n";

pub const SUMMARY_FIELD: &str = "Summary";
pub const DESCRIPTION_FIELD: &str = "Description";
pub const EPIC_NAME_FIELD: &str = "Epic Name";
pub const EPIC_LINK_FIELD: &str = "Epic Link";
pub const PARENT_FIELD: &str = "Parent";

/// Everything needed to build payloads for one issue kind.
#[derive(Debug, Clone)]
pub struct KindPlan {
    pub target: IssueTarget,
    /// Catalog fields, in priority order.
    pub fields: Vec<FieldSchema>,
    /// Template merged with settings.
    pub template: FieldMap,
}

pub type KindPlans = IndexMap<IssueKind, KindPlan>;

/// Run-wide settings for the engine.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Key of the existing issue every epic is linked under.
    pub epic_parent: String,
    /// Tracker base URL used for browse links in logs.
    pub base_url: String,
}

impl SyncOptions {
    #[must_use]
    pub fn browse_url(&self, key: &str) -> String {
        format!("{}/browse/{key}", self.base_url.trim_end_matches('/'))
    }
}

/// One record created during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedIssue {
    pub kind: String,
    pub node_id: String,
    pub key: String,
    pub title: String,
}

/// One line of the summary pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryEntry {
    pub kind: String,
    pub node_id: String,
    pub title: String,
    pub key: Option<String>,
    pub url: Option<String>,
}

/// What a run did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub created: Vec<CreatedIssue>,
    /// Epic keys linked to the top-level parent.
    pub linked: Vec<String>,
    /// Nodes skipped because their checkpoint already had a key.
    pub skipped: usize,
    pub summary: Vec<SummaryEntry>,
}

/// Description body of a sub-task: its link, the rendered text of every
/// descendant, then its note after a separator.
#[must_use]
pub fn subtask_body(tree: &OutlineTree, node: &OutlineNode) -> String {
    let mut body = String::new();
    if let Some(link) = &node.link {
        body.push_str("\n\n");
        body.push_str(link);
    }
    body.push_str(&tree.descendant_text(&node.id));
    if let Some(note) = &node.note {
        body.push_str(NOTE_SEPARATOR);
        body.push_str(note);
    }
    body
}

fn description(text: Option<&str>) -> FieldValue {
    match text {
        Some(text) if !text.is_empty() => FieldValue::text(text),
        _ => FieldValue::text(DESCRIPTION_PLACEHOLDER),
    }
}

/// Read-only summary of every tracked node.
///
/// # Errors
///
/// Returns an error if a checkpoint cannot be read.
pub fn summarize(
    tree: &OutlineTree,
    store: &dyn CheckpointStore,
    options: &SyncOptions,
) -> Result<Vec<SummaryEntry>> {
    let mut entries = Vec::new();
    for node in tree.walk().filter(|n| n.kind.is_tracked()) {
        let key = store
            .load(&node.id)?
            .and_then(|c| c.tracker_key().map(str::to_string));
        let url = key.as_deref().map(|k| options.browse_url(k));
        match &url {
            Some(url) => info!("{url} -> {}", node.title),
            None => warn!(node = %node.id, "{} has not been created -> {}", node.kind, node.title),
        }
        entries.push(SummaryEntry {
            kind: node.kind.to_string(),
            node_id: node.id.clone(),
            title: node.title.clone(),
            key,
            url,
        });
    }
    Ok(entries)
}

/// Drives the passes for one outline.
pub struct SyncEngine<'a> {
    tree: &'a OutlineTree,
    plans: &'a KindPlans,
    store: &'a dyn CheckpointStore,
    tracker: &'a mut dyn TrackerClient,
    options: &'a SyncOptions,
}

impl<'a> SyncEngine<'a> {
    #[must_use]
    pub fn new(
        tree: &'a OutlineTree,
        plans: &'a KindPlans,
        store: &'a dyn CheckpointStore,
        tracker: &'a mut dyn TrackerClient,
        options: &'a SyncOptions,
    ) -> Self {
        Self {
            tree,
            plans,
            store,
            tracker,
            options,
        }
    }

    /// Run every pass in order.
    ///
    /// # Errors
    ///
    /// Stops at the first error; checkpoints written so far are kept.
    pub fn run(&mut self) -> Result<SyncReport> {
        for node in self.tree.walk() {
            debug!(kind = %node.kind, depth = node.depth, id = %node.id, "Node: {}", node.title);
        }

        let mut report = SyncReport::default();
        info!("Creating Epics...");
        self.epic_pass(&mut report)?;
        info!("Linking Epics...");
        self.link_pass(&mut report)?;
        info!("Creating Tasks...");
        self.task_pass(&mut report)?;
        info!("Creating Subtasks...");
        self.subtask_pass(&mut report)?;
        info!("Done!");
        report.summary = summarize(self.tree, self.store, self.options)?;
        Ok(report)
    }

    fn plan(&self, kind: IssueKind) -> Result<&'a KindPlan> {
        self.plans
            .get(&kind)
            .ok_or_config(format!("no template loaded for {kind}"))
    }

    /// True when `node` already has a key; corrupt records are fatal.
    fn already_created(&self, node: &OutlineNode, report: &mut SyncReport) -> Result<bool> {
        match self.store.load_valid(&node.id)? {
            Some(checkpoint) => {
                info!(
                    "{} / {} exists, skipping",
                    self.store.location(&node.id).display(),
                    checkpoint.tracker_key().unwrap_or_default()
                );
                report.skipped += 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Tracker key of `node`'s parent, which an earlier pass created.
    fn parent_key(&self, node: &OutlineNode) -> Result<String> {
        let missing = || MmjError::MissingParentKey {
            node_id: node.id.clone(),
            parent_id: node.parent_id.clone().unwrap_or_default(),
        };
        let parent_id = node.parent_id.as_deref().ok_or_else(missing)?;
        let checkpoint = self.store.load_valid(parent_id)?.ok_or_else(missing)?;
        checkpoint
            .tracker_key()
            .map(str::to_string)
            .ok_or_else(missing)
    }

    fn create(
        &mut self,
        node: &OutlineNode,
        extras: Vec<(&str, FieldValue)>,
        report: &mut SyncReport,
    ) -> Result<String> {
        let plan = self.plan(node.kind)?;
        let mut working = plan.template.clone();
        for (name, value) in extras {
            working.insert(name.to_string(), value);
        }

        let payload = PayloadBuilder::new(&plan.target, &plan.fields).build(&working)?;
        let snapshot = serde_json::to_string(&working)?;

        info!("Creating {} {}, {}", node.kind, node.id, node.title);
        let key = self.tracker.create_issue(&payload)?;
        info!("Created Issue -> {}", self.options.browse_url(&key));

        self.store
            .save(&node.id, &Checkpoint::created(&key, snapshot))?;
        info!(
            "writing {} -> {}",
            node.title,
            self.store.location(&node.id).display()
        );

        report.created.push(CreatedIssue {
            kind: node.kind.to_string(),
            node_id: node.id.clone(),
            key: key.clone(),
            title: node.title.clone(),
        });
        Ok(key)
    }

    /// Create every epic that has no key yet.
    ///
    /// # Errors
    ///
    /// Returns the first payload, remote or checkpoint error.
    pub fn epic_pass(&mut self, report: &mut SyncReport) -> Result<()> {
        let tree = self.tree;
        for node in tree.nodes_of_kind(IssueKind::Epic) {
            if self.already_created(node, report)? {
                continue;
            }
            let extras = vec![
                (SUMMARY_FIELD, FieldValue::text(&node.title)),
                (EPIC_NAME_FIELD, FieldValue::text(&node.title)),
                (DESCRIPTION_FIELD, description(node.note.as_deref())),
            ];
            self.create(node, extras, report)?;
        }
        Ok(())
    }

    /// Link every created epic to the top-level parent, once.
    ///
    /// # Errors
    ///
    /// Returns `CorruptCheckpoint` for an epic without a usable key, or the
    /// first remote or checkpoint error.
    pub fn link_pass(&mut self, report: &mut SyncReport) -> Result<()> {
        let tree = self.tree;
        for node in tree.nodes_of_kind(IssueKind::Epic) {
            let mut checkpoint =
                self.store
                    .load_valid(&node.id)?
                    .ok_or_else(|| MmjError::CorruptCheckpoint {
                        path: self.store.location(&node.id),
                    })?;
            let key = checkpoint
                .tracker_key()
                .map(str::to_string)
                .unwrap_or_default();
            if checkpoint.is_linked {
                info!(
                    "{} is linked, skipping",
                    self.store.location(&node.id).display()
                );
                continue;
            }

            self.tracker
                .link_as_parent(&self.options.epic_parent, &key)?;
            checkpoint.is_linked = true;
            self.store.save(&node.id, &checkpoint)?;
            info!(
                "updating with linked {} -> {}",
                node.title,
                self.store.location(&node.id).display()
            );
            report.linked.push(key);
        }
        Ok(())
    }

    /// Create every task that has no key yet, under its epic.
    ///
    /// # Errors
    ///
    /// Returns `MissingParentKey` if the epic was never created, or the
    /// first payload, remote or checkpoint error.
    pub fn task_pass(&mut self, report: &mut SyncReport) -> Result<()> {
        let tree = self.tree;
        for node in tree.nodes_of_kind(IssueKind::Task) {
            if self.already_created(node, report)? {
                continue;
            }
            let parent_key = self.parent_key(node)?;
            let extras = vec![
                (SUMMARY_FIELD, FieldValue::text(&node.title)),
                (EPIC_LINK_FIELD, FieldValue::text(parent_key)),
                (DESCRIPTION_FIELD, description(node.note.as_deref())),
            ];
            self.create(node, extras, report)?;
        }
        Ok(())
    }

    /// Create every sub-task that has no key yet, under its task.
    ///
    /// # Errors
    ///
    /// Returns `MissingParentKey` if the task was never created, or the
    /// first payload, remote or checkpoint error.
    pub fn subtask_pass(&mut self, report: &mut SyncReport) -> Result<()> {
        let tree = self.tree;
        for node in tree.nodes_of_kind(IssueKind::SubTask) {
            if self.already_created(node, report)? {
                continue;
            }
            let parent_key = self.parent_key(node)?;
            info!("running \"{}\" / linking to \"{parent_key}\"", node.title);
            let body = subtask_body(tree, node);
            let extras = vec![
                (SUMMARY_FIELD, FieldValue::text(&node.title)),
                (PARENT_FIELD, FieldValue::Reference(Reference::Key(parent_key))),
                (DESCRIPTION_FIELD, description(Some(body.as_str()))),
            ];
            self.create(node, extras, report)?;
        }
        Ok(())
    }
}
