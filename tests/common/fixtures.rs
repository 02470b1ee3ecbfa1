//! A complete workspace on disk plus a recording tracker.

use mindmap_jira::config::{ProjectConfig, Workspace};
use mindmap_jira::error::{MmjError, Result};
use mindmap_jira::outline::IssueKind;
use mindmap_jira::payload::IssuePayload;
use mindmap_jira::schema::SchemaCache;
use mindmap_jira::sync::target_for;
use mindmap_jira::tracker::TrackerClient;
use serde_json::{Value, json};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub const BASE_URL: &str = "https://jira.example.com";
pub const PROJECT: &str = "PRJ";
pub const EPIC_PARENT: &str = "PRJ-100";

pub const CONFIG: &str = "url: https://jira.example.com\n\
project_key: PRJ\n\
epic_parent: PRJ-100\n\
working_dir: .\n";

pub const SETTINGS: &str = "Reporter: jdoe\n";

/// One epic, one task, one sub-task with a link, a note and a detail child.
pub const OUTLINE: &str = r#"<map version="freeplane 1.9.0">
<node TEXT="Project Plan" ID="ID_root">
<node TEXT="Epic A" ID="ID_e1">
<richcontent TYPE="NOTE"><html><head></head><body><p>Epic note</p></body></html></richcontent>
<node TEXT="Task A1" ID="ID_t1">
<node TEXT="Sub A1a" ID="ID_s1" LINK="https://example.com/design">
<richcontent TYPE="NOTE">
<html>
  <body>
    <p>First line</p>
    <p>Second &amp; last</p>
  </body>
</html>
</richcontent>
<node TEXT="Detail" ID="ID_d1"/>
</node>
</node>
</node>
</node>
</map>"#;

pub fn issue_type_name(kind: IssueKind) -> &'static str {
    match kind {
        IssueKind::Epic => "Epic",
        IssueKind::Task => "Task",
        _ => "Sub-task",
    }
}

/// Create metadata for one kind, shaped like the tracker's createmeta.
pub fn createmeta(kind: IssueKind) -> Value {
    let mut fields = json!({
        "project": {"name": "Project", "required": true, "schema": {"type": "project"},
            "operations": ["set"], "allowedValues": [{"name": "Project X", "id": "1"}]},
        "issuetype": {"name": "Issue Type", "required": true, "schema": {"type": "issuetype"},
            "operations": [], "allowedValues": [{"name": issue_type_name(kind), "id": "3"}]},
        "summary": {"name": "Summary", "required": true, "schema": {"type": "string"},
            "operations": ["set"]},
        "description": {"name": "Description", "required": false, "schema": {"type": "string"},
            "operations": ["set"]},
        "priority": {"name": "Priority", "required": true, "schema": {"type": "priority"},
            "operations": ["set"],
            "allowedValues": [{"name": "High", "id": "2"}, {"name": "Low", "id": "4"}]},
        "labels": {"name": "Labels", "required": false, "schema": {"type": "array", "items": "string"},
            "operations": ["add", "set", "remove"]},
        "reporter": {"name": "Reporter", "required": false, "schema": {"type": "user"},
            "operations": ["set"]},
        "attachment": {"name": "Attachment", "required": false,
            "schema": {"type": "array", "items": "attachment"}, "operations": []}
    });
    let extra = match kind {
        IssueKind::Epic => ("customfield_10011", json!({"name": "Epic Name", "required": true,
            "schema": {"type": "string"}, "operations": ["set"]})),
        IssueKind::Task => ("customfield_10014", json!({"name": "Epic Link", "required": false,
            "schema": {"type": "any"}, "operations": ["set"]})),
        _ => ("parent", json!({"name": "Parent", "required": true,
            "schema": {"type": "issuelink"}, "operations": ["set"]})),
    };
    fields[extra.0] = extra.1;
    json!({"projects": [{"key": PROJECT, "issuetypes": [{"name": issue_type_name(kind), "fields": fields}]}]})
}

pub fn template_yaml(kind: IssueKind) -> String {
    format!(
        "Project: {PROJECT}\nIssue Type: {}\nPriority: High\nLabels:\n   - mindmap\n",
        issue_type_name(kind)
    )
}

/// A workspace with config, settings, edited templates, cached metadata and
/// the outline, all under one temp dir.
pub struct Fixture {
    pub temp: TempDir,
    pub config_path: PathBuf,
    pub outline_path: PathBuf,
    pub config: ProjectConfig,
    pub workspace: Workspace,
}

impl Fixture {
    pub fn root(&self) -> &std::path::Path {
        self.temp.path()
    }

    pub fn write_template(&self, kind: IssueKind, contents: &str) {
        fs::write(self.workspace.template_path(kind), contents).expect("write template");
    }

    pub fn write_settings(&self, contents: &str) {
        fs::write(self.workspace.settings_path(), contents).expect("write settings");
    }
}

/// Config and outline only; no workspace files.
pub fn bare_fixture() -> Fixture {
    let temp = TempDir::new().expect("temp dir");
    let config_path = temp.path().join("mmj.yaml");
    fs::write(&config_path, CONFIG).expect("write config");
    let outline_path = temp.path().join("plan.mm");
    fs::write(&outline_path, OUTLINE).expect("write outline");

    let config = ProjectConfig::load(&config_path).expect("load config");
    let workspace = config.workspace();
    Fixture {
        temp,
        config_path,
        outline_path,
        config,
        workspace,
    }
}

/// Bare fixture plus metadata cache, without settings or templates.
pub fn cached_fixture() -> Fixture {
    let fixture = bare_fixture();
    fixture.workspace.ensure_dirs().expect("dirs");
    let cache = SchemaCache::new(fixture.workspace.cache_dir());
    for kind in IssueKind::TRACKED {
        let target = target_for(&fixture.config, kind).expect("target");
        cache.store(&target, &createmeta(kind)).expect("cache");
    }
    fixture
}

/// Everything needed for a run.
pub fn fixture() -> Fixture {
    let fixture = cached_fixture();
    fixture.write_settings(SETTINGS);
    for kind in IssueKind::TRACKED {
        fixture.write_template(kind, &template_yaml(kind));
    }
    fixture
}

/// Tracker double that records every call.
#[derive(Debug, Default)]
pub struct StubTracker {
    pub fetches: Vec<(String, String)>,
    pub created: Vec<IssuePayload>,
    pub links: Vec<(String, String)>,
    /// Fail the create call with this zero-based index.
    pub fail_create_at: Option<usize>,
    pub next_key: usize,
}

impl StubTracker {
    pub fn created_json(&self) -> Vec<Value> {
        self.created
            .iter()
            .map(|p| serde_json::to_value(p).expect("payload json"))
            .collect()
    }
}

impl TrackerClient for StubTracker {
    fn fetch_field_schema(&mut self, project: &str, issue_type: &str) -> Result<Value> {
        self.fetches.push((project.to_string(), issue_type.to_string()));
        let kind = IssueKind::TRACKED
            .into_iter()
            .find(|k| issue_type_name(*k) == issue_type)
            .ok_or_else(|| MmjError::remote("fetch field schema", "HTTP 404"))?;
        Ok(createmeta(kind))
    }

    fn create_issue(&mut self, payload: &IssuePayload) -> Result<String> {
        if self.fail_create_at == Some(self.created.len()) {
            return Err(MmjError::remote("create issue", "HTTP 503"));
        }
        self.created.push(payload.clone());
        self.next_key += 1;
        Ok(format!("{PROJECT}-{}", self.next_key))
    }

    fn link_as_parent(&mut self, parent_key: &str, child_key: &str) -> Result<()> {
        self.links.push((parent_key.to_string(), child_key.to_string()));
        Ok(())
    }
}
