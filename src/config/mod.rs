//! Configuration management for `mindmap_jira`.
//!
//! Configuration sources and precedence (highest wins):
//! 1. CLI overrides
//! 2. Project config (`mmj.yaml`, or the file given with `--config`)
//! 3. Defaults
//!
//! Credentials never live in files; they come from the environment (see
//! [`crate::tracker::Credentials`]).
//!
//! Everything a run reads or writes lives in the workspace,
//! `<working_dir>/<epic_parent>/`:
//!
//! ```text
//! template/settings.yaml     overrides applied to every issue type
//! template/epic.yaml         per-kind field templates
//! template/task.yaml
//! template/sub-task.yaml
//! cache/                     create-metadata documents
//! data/                      one checkpoint per outline node
//! ```

use crate::error::{MmjError, Result, ResultExt, ValidationError};
use crate::outline::IssueKind;
use crate::schema::{FieldMap, FieldValue};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Config file looked up in the current directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "mmj.yaml";
/// Link type used to attach epics to the top-level parent.
pub const DEFAULT_LINK_TYPE: &str = "is parent task of";
/// Marker line written into generated templates until the operator edits them.
pub const UNEDITED_MARKER: &str = "REMOVE THESE LINES AFTER EDIT";

const SETTINGS_FILE: &str = "settings.yaml";
const TEMPLATE_DIR: &str = "template";
const CACHE_DIR: &str = "cache";
const DATA_DIR: &str = "data";

/// Tracker issue type names for the three tracked kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct IssueTypeNames {
    pub epic: String,
    pub task: String,
    pub sub_task: String,
}

impl Default for IssueTypeNames {
    fn default() -> Self {
        Self {
            epic: "Epic".to_string(),
            task: "Task".to_string(),
            sub_task: "Sub-task".to_string(),
        }
    }
}

impl IssueTypeNames {
    /// Tracker issue type for `kind`; `None` for untracked kinds.
    #[must_use]
    pub fn name_for(&self, kind: IssueKind) -> Option<&str> {
        match kind {
            IssueKind::Epic => Some(&self.epic),
            IssueKind::Task => Some(&self.task),
            IssueKind::SubTask => Some(&self.sub_task),
            IssueKind::Root | IssueKind::Overflow(_) => None,
        }
    }
}

fn default_working_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_link_type() -> String {
    DEFAULT_LINK_TYPE.to_string()
}

/// Project configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Tracker base URL, e.g. `https://jira.example.com`.
    pub url: String,
    pub project_key: String,
    /// Key of the existing issue every epic is linked under.
    pub epic_parent: String,
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,
    #[serde(default)]
    pub reporter: Option<String>,
    #[serde(default)]
    pub no_prompt: bool,
    #[serde(default)]
    pub debug: bool,
    #[serde(default = "default_link_type")]
    pub link_type: String,
    #[serde(default)]
    pub issue_types: IssueTypeNames,
}

impl ProjectConfig {
    /// Parse and validate YAML text.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed YAML, unknown keys or invalid values.
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the config file at `path`.
    ///
    /// A relative `working_dir` is resolved against the file's directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unreadable or invalid.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(MmjError::Config(format!(
                "config file not found: {} (pass --config or create {DEFAULT_CONFIG_FILE})",
                path.display()
            )));
        }
        let contents = fs::read_to_string(path)?;
        let mut config: Self = serde_yaml::from_str(&contents)
            .with_context(|| format!("loading {}", path.display()))?;
        config.validate()?;
        if config.working_dir.is_relative() {
            let base = path.parent().unwrap_or_else(|| Path::new("."));
            config.working_dir = base.join(&config.working_dir);
        }
        Ok(config)
    }

    /// Check required values once, reporting every problem together.
    ///
    /// # Errors
    ///
    /// Returns a validation error listing each blank or malformed value.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();
        for (field, value) in [
            ("url", &self.url),
            ("project_key", &self.project_key),
            ("epic_parent", &self.epic_parent),
            ("link_type", &self.link_type),
        ] {
            if value.trim().is_empty() {
                errors.push(ValidationError::new(field, "must not be empty"));
            }
        }
        if !self.url.trim().is_empty()
            && !(self.url.starts_with("http://") || self.url.starts_with("https://"))
        {
            errors.push(ValidationError::new(
                "url",
                "must start with http:// or https://",
            ));
        }
        if self.epic_parent.contains(['/', '\\']) || self.epic_parent.contains("..") {
            errors.push(ValidationError::new(
                "epic_parent",
                "must be an issue key, not a path",
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(MmjError::from_validation_errors(errors))
        }
    }

    /// Layer CLI flags over the file values.
    pub fn apply(&mut self, overrides: &CliOverrides) {
        if let Some(dir) = &overrides.working_dir {
            self.working_dir.clone_from(dir);
        }
        if let Some(url) = &overrides.url {
            self.url.clone_from(url);
        }
        if let Some(no_prompt) = overrides.no_prompt {
            self.no_prompt = no_prompt;
        }
        if let Some(debug) = overrides.debug {
            self.debug = debug;
        }
    }

    #[must_use]
    pub fn workspace(&self) -> Workspace {
        Workspace::new(self.working_dir.join(&self.epic_parent))
    }

    /// Browse URL for an issue key.
    #[must_use]
    pub fn browse_url(&self, key: &str) -> String {
        format!("{}/browse/{key}", self.url.trim_end_matches('/'))
    }
}

/// CLI overrides for config loading (optional).
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub working_dir: Option<PathBuf>,
    pub url: Option<String>,
    pub no_prompt: Option<bool>,
    pub debug: Option<bool>,
}

/// Load the config file (default `mmj.yaml`) and apply CLI overrides.
///
/// # Errors
///
/// Returns an error if the file cannot be loaded or the result is invalid.
pub fn load_config(path: Option<&Path>, overrides: &CliOverrides) -> Result<ProjectConfig> {
    let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
    let mut config = ProjectConfig::load(path)?;
    config.apply(overrides);
    config.validate()?;
    Ok(config)
}

/// Paths of one workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn template_dir(&self) -> PathBuf {
        self.root.join(TEMPLATE_DIR)
    }

    #[must_use]
    pub fn settings_path(&self) -> PathBuf {
        self.template_dir().join(SETTINGS_FILE)
    }

    /// `template/<kind>.yaml`.
    #[must_use]
    pub fn template_path(&self, kind: IssueKind) -> PathBuf {
        self.template_dir().join(format!("{kind}.yaml"))
    }

    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.root.join(CACHE_DIR)
    }

    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.root.join(DATA_DIR)
    }

    /// Create the workspace directories that do not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be created.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [self.template_dir(), self.cache_dir(), self.data_dir()] {
            if !dir.is_dir() {
                info!(path = %dir.display(), "Creating missing directory");
                fs::create_dir_all(&dir)?;
            }
        }
        Ok(())
    }

    /// Tracked kinds whose template file is missing.
    #[must_use]
    pub fn missing_templates(&self) -> Vec<IssueKind> {
        IssueKind::TRACKED
            .into_iter()
            .filter(|kind| !self.template_path(*kind).is_file())
            .collect()
    }

    /// Template files still carrying the unedited marker.
    ///
    /// # Errors
    ///
    /// Returns an error if a template cannot be read.
    pub fn unedited_templates(&self) -> Result<Vec<PathBuf>> {
        let mut unedited = Vec::new();
        for kind in IssueKind::TRACKED {
            let path = self.template_path(kind);
            if fs::read_to_string(&path)?.contains(UNEDITED_MARKER) {
                unedited.push(path);
            }
        }
        Ok(unedited)
    }
}

/// Starter contents for `template/settings.yaml`.
#[must_use]
pub fn settings_template(reporter: Option<&str>) -> String {
    let mut out = String::from(
        "# Field values applied to every issue type that has the field.\n\
         # Keys are field names as shown in the per-type templates.\n",
    );
    match reporter {
        Some(reporter) => out.push_str(&format!("Reporter: {reporter}\n")),
        None => out.push_str("# Reporter: jdoe\n"),
    }
    out
}

/// Parse a YAML field map. An empty document is an empty map; a key with
/// no value is kept as a blank text value.
///
/// # Errors
///
/// Returns a YAML error if the document is not a mapping of field values.
pub fn parse_field_map(contents: &str) -> Result<FieldMap> {
    let value: serde_yaml::Value = serde_yaml::from_str(contents)?;
    if value.is_null() {
        return Ok(FieldMap::new());
    }
    let raw: IndexMap<String, Option<FieldValue>> = serde_yaml::from_value(value)?;
    Ok(raw
        .into_iter()
        .map(|(name, value)| (name, value.unwrap_or_else(|| FieldValue::text(""))))
        .collect())
}

/// Read the cross-type settings file.
///
/// # Errors
///
/// Returns an error if the file is missing or malformed.
pub fn load_settings(workspace: &Workspace) -> Result<FieldMap> {
    let path = workspace.settings_path();
    if !path.is_file() {
        return Err(MmjError::Config(format!(
            "settings file does not exist: {} (run `mmj init`)",
            path.display()
        )));
    }
    let contents = fs::read_to_string(&path)?;
    parse_field_map(&contents).with_context(|| format!("reading {}", path.display()))
}

/// Per-kind field templates.
#[derive(Debug, Clone, Default)]
pub struct Templates {
    maps: IndexMap<IssueKind, FieldMap>,
    paths: IndexMap<IssueKind, PathBuf>,
}

impl Templates {
    /// Load all three templates, refusing any that still carry the marker.
    ///
    /// # Errors
    ///
    /// Returns `UneditedTemplates` naming every unedited file, a config error
    /// for missing files, or a parse error.
    pub fn load(workspace: &Workspace) -> Result<Self> {
        let missing = workspace.missing_templates();
        if !missing.is_empty() {
            let names: Vec<String> = missing
                .iter()
                .map(|k| workspace.template_path(*k).display().to_string())
                .collect();
            return Err(MmjError::Config(format!(
                "missing template files: {} (run `mmj init`)",
                names.join(", ")
            )));
        }

        let unedited = workspace.unedited_templates()?;
        if !unedited.is_empty() {
            return Err(MmjError::UneditedTemplates { files: unedited });
        }

        let mut templates = Self::default();
        for kind in IssueKind::TRACKED {
            let path = workspace.template_path(kind);
            let contents = fs::read_to_string(&path)?;
            let map = parse_field_map(&contents)
                .with_context(|| format!("reading {}", path.display()))?;
            templates.insert(kind, map, path);
        }
        Ok(templates)
    }

    pub fn insert(&mut self, kind: IssueKind, map: FieldMap, path: PathBuf) {
        self.maps.insert(kind, map);
        self.paths.insert(kind, path);
    }

    #[must_use]
    pub fn get(&self, kind: IssueKind) -> Option<&FieldMap> {
        self.maps.get(&kind)
    }

    #[must_use]
    pub fn path(&self, kind: IssueKind) -> Option<&Path> {
        self.paths.get(&kind).map(PathBuf::as_path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (IssueKind, &FieldMap)> {
        self.maps.iter().map(|(k, v)| (*k, v))
    }

    /// Copy each settings entry into every kind for which `has_field`
    /// reports the field name as known. Settings win over template values.
    pub fn merge_settings(&mut self, settings: &FieldMap, has_field: impl Fn(IssueKind, &str) -> bool) {
        for (name, value) in settings {
            for (kind, map) in &mut self.maps {
                if has_field(*kind, name) {
                    info!(kind = %kind, field = %name, value = %value, "Merging main settings");
                    map.insert(name.clone(), value.clone());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MINIMAL: &str = "url: https://jira.example.com\nproject_key: PRJ\nepic_parent: PRJ-1\n";

    #[test]
    fn test_defaults_applied() {
        let config = ProjectConfig::from_yaml_str(MINIMAL).unwrap();
        assert_eq!(config.link_type, DEFAULT_LINK_TYPE);
        assert_eq!(config.issue_types.sub_task, "Sub-task");
        assert_eq!(config.working_dir, PathBuf::from("."));
        assert!(!config.no_prompt);
        assert_eq!(config.browse_url("PRJ-2"), "https://jira.example.com/browse/PRJ-2");
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = ProjectConfig::from_yaml_str(&format!("{MINIMAL}colour: blue\n")).unwrap_err();
        assert!(err.to_string().contains("colour"));
    }

    #[test]
    fn test_blank_values_reported_together() {
        let err = ProjectConfig::from_yaml_str("url: ''\nproject_key: ''\nepic_parent: PRJ-1\n")
            .unwrap_err();
        let MmjError::ValidationErrors { errors } = err else {
            panic!("expected batched errors, got {err:?}");
        };
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_cli_overrides_win() {
        let mut config = ProjectConfig::from_yaml_str(MINIMAL).unwrap();
        config.apply(&CliOverrides {
            working_dir: Some(PathBuf::from("/tmp/ws")),
            no_prompt: Some(true),
            ..Default::default()
        });
        assert!(config.no_prompt);
        assert_eq!(config.workspace().root(), Path::new("/tmp/ws/PRJ-1"));
    }

    #[test]
    fn test_relative_working_dir_resolved_against_file() {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join("mmj.yaml");
        fs::write(&path, format!("{MINIMAL}working_dir: work\n")).unwrap();
        let config = ProjectConfig::load(&path).unwrap();
        assert_eq!(config.working_dir, temp.path().join("work"));
    }

    #[test]
    fn test_workspace_layout() {
        let ws = Workspace::new("/w/PRJ-1");
        assert_eq!(ws.settings_path(), PathBuf::from("/w/PRJ-1/template/settings.yaml"));
        assert_eq!(
            ws.template_path(IssueKind::SubTask),
            PathBuf::from("/w/PRJ-1/template/sub-task.yaml")
        );
        assert_eq!(ws.data_dir(), PathBuf::from("/w/PRJ-1/data"));
    }

    #[test]
    fn test_parse_field_map_handles_empty_and_null() {
        assert!(parse_field_map("# only comments\n").unwrap().is_empty());
        let map = parse_field_map("Component/s:\n- api\nAssignee:\nStory Points: 3\n").unwrap();
        assert_eq!(map["Component/s"], FieldValue::List(vec!["api".into()]));
        assert!(map["Assignee"].is_blank());
        assert!(!map["Story Points"].is_blank());
    }

    #[test]
    fn test_unedited_templates_reported() {
        let temp = TempDir::new().expect("temp dir");
        let ws = Workspace::new(temp.path());
        ws.ensure_dirs().unwrap();
        fs::write(ws.template_path(IssueKind::Epic), "Project: PRJ\n").unwrap();
        fs::write(ws.template_path(IssueKind::Task), format!("# {UNEDITED_MARKER}\n")).unwrap();
        fs::write(ws.template_path(IssueKind::SubTask), format!("# {UNEDITED_MARKER}\n")).unwrap();

        let err = Templates::load(&ws).unwrap_err();
        let MmjError::UneditedTemplates { files } = err else {
            panic!("expected unedited templates, got {err:?}");
        };
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_merge_settings_only_where_known() {
        let mut templates = Templates::default();
        templates.insert(IssueKind::Epic, FieldMap::new(), PathBuf::from("epic.yaml"));
        templates.insert(IssueKind::Task, FieldMap::new(), PathBuf::from("task.yaml"));
        let mut settings = FieldMap::new();
        settings.insert("Reporter".into(), FieldValue::text("bob"));

        templates.merge_settings(&settings, |kind, name| kind == IssueKind::Task && name == "Reporter");

        assert!(templates.get(IssueKind::Epic).unwrap().is_empty());
        assert_eq!(
            templates.get(IssueKind::Task).unwrap()["Reporter"],
            FieldValue::text("bob")
        );
    }

    #[test]
    fn test_settings_template_mentions_reporter() {
        assert!(settings_template(Some("jdoe")).contains("Reporter: jdoe"));
        assert!(parse_field_map(&settings_template(None)).unwrap().is_empty());
    }
}
