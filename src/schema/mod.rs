//! Tracker field metadata and default-value resolution.
//!
//! A [`FieldSchema`] is built from one entry of the tracker's create
//! metadata. Given the operator's overrides it resolves the value a payload
//! should carry for that field, validating overrides against the field's
//! enumerated allowed values.

pub mod catalog;

pub use catalog::{SchemaCache, SchemaCatalog};

use crate::error::{MmjError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::error;

/// Display name of the synthetic project field.
pub const PROJECT_FIELD: &str = "Project";
/// Display name of the synthetic issue type field.
pub const ISSUE_TYPE_FIELD: &str = "Issue Type";

/// Fields filled in by the sync engine, never by templates.
pub const AUTO_FIELDS: &[&str] = &["Summary", "Description", "Epic Link", "Epic Name", "Parent"];

/// Schema types and item types that cannot be set through this pipeline.
const IGNORED_TYPES: &[&str] = &["attachment", "issuelinks"];
/// Field names that cannot be set through this pipeline.
const IGNORED_NAMES: &[&str] = &["Sprint"];

/// Field name to value map, in template order.
pub type FieldMap = IndexMap<String, FieldValue>;

/// A reference to another tracker object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reference {
    /// Reference by opaque id (`{"id": "10001"}`).
    Id(String),
    /// Reference by name (`{"name": "alice"}`).
    Name(String),
    /// Reference by issue key (`{"key": "PRJ-12"}`).
    Key(String),
}

/// A user-facing field value as written in templates and settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(serde_json::Number),
    Text(String),
    List(Vec<String>),
    Reference(Reference),
}

impl FieldValue {
    /// Convenience constructor for text values.
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// True when the value carries nothing a tracker would accept.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Number(_) => false,
            Self::Text(text) => text.trim().is_empty(),
            Self::List(items) => items.is_empty(),
            Self::Reference(Reference::Id(v) | Reference::Name(v) | Reference::Key(v)) => {
                v.trim().is_empty()
            }
        }
    }

    /// The labels this value selects, when it is a text or list value.
    #[must_use]
    pub fn labels(&self) -> Option<Vec<String>> {
        match self {
            Self::Text(text) => Some(vec![text.clone()]),
            Self::List(items) => Some(items.clone()),
            Self::Number(n) => Some(vec![n.to_string()]),
            Self::Reference(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(text) => write!(f, "{text}"),
            Self::List(items) => write!(f, "{items:?}"),
            Self::Reference(Reference::Id(v)) => write!(f, "{{id: {v}}}"),
            Self::Reference(Reference::Name(v)) => write!(f, "{{name: {v}}}"),
            Self::Reference(Reference::Key(v)) => write!(f, "{{key: {v}}}"),
        }
    }
}

/// The (project, issue type) pair a catalog entry describes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IssueTarget {
    pub project: String,
    pub issue_type: String,
}

impl IssueTarget {
    #[must_use]
    pub fn new(project: impl Into<String>, issue_type: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            issue_type: issue_type.into(),
        }
    }
}

impl fmt::Display for IssueTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.project, self.issue_type)
    }
}

#[derive(Debug, Deserialize)]
struct RawSchema {
    #[serde(rename = "type", default)]
    schema_type: String,
    #[serde(default)]
    items: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawField {
    name: String,
    #[serde(default)]
    field_id: Option<String>,
    schema: RawSchema,
    #[serde(default)]
    operations: Vec<String>,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    allowed_values: Vec<serde_json::Value>,
}

/// Metadata for one tracker field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    /// Human label, used as the template key.
    pub name: String,
    /// Wire identifier, used as the payload key.
    pub id: String,
    pub schema_type: String,
    /// Element type when `schema_type` is `array`.
    pub item_type: Option<String>,
    pub required: bool,
    /// Allowed values, label to id, in tracker order.
    pub allowed_values: IndexMap<String, String>,
    /// Permitted write verbs (`set`, `add`, ...).
    pub operations: Vec<String>,
}

impl FieldSchema {
    /// Build a field from its raw create-metadata entry.
    ///
    /// `fallback_id` is the key the entry was found under; it is used when
    /// the entry itself carries no `fieldId`.
    ///
    /// # Errors
    ///
    /// Returns a schema error if the entry does not have the expected shape
    /// or an allowed value has neither a `name` nor a `value`, or no `id`.
    pub fn from_raw(fallback_id: &str, raw: &serde_json::Value) -> Result<Self> {
        let parsed: RawField = serde_json::from_value(raw.clone())
            .map_err(|e| MmjError::schema(format!("field {fallback_id}: {e}"), raw))?;

        let mut allowed_values = IndexMap::new();
        for value in &parsed.allowed_values {
            let label = value
                .get("name")
                .or_else(|| value.get("value"))
                .and_then(serde_json::Value::as_str)
                .ok_or_else(|| {
                    error!(field = %parsed.name, raw = %value, "allowed value without name or value");
                    MmjError::schema(
                        format!("{}: allowed value has no name or value", parsed.name),
                        value,
                    )
                })?;
            let id = value
                .get("id")
                .and_then(serde_json::Value::as_str)
                .ok_or_else(|| {
                    error!(field = %parsed.name, raw = %value, "allowed value without id");
                    MmjError::schema(format!("{}: allowed value has no id", parsed.name), value)
                })?;
            allowed_values.insert(label.to_string(), id.to_string());
        }

        Ok(Self {
            name: parsed.name,
            id: parsed.field_id.unwrap_or_else(|| fallback_id.to_string()),
            schema_type: parsed.schema.schema_type,
            item_type: parsed.schema.items,
            required: parsed.required,
            allowed_values,
            operations: parsed.operations,
        })
    }

    /// Whether the field takes a list of values.
    ///
    /// The schema type decides when it says `array`; otherwise a field that
    /// only supports `set` is scalar and one that supports `add` is a list.
    #[must_use]
    pub fn is_array(&self) -> bool {
        if self.schema_type == "array" {
            return true;
        }
        if self.operations.len() == 1 && self.operations[0] == "set" {
            return false;
        }
        self.operations.iter().any(|op| op == "add")
    }

    /// Whether the field (or its elements) refer to tracker users.
    #[must_use]
    pub fn is_user_type(&self) -> bool {
        self.schema_type == "user" || self.item_type.as_deref() == Some("user")
    }

    #[must_use]
    pub fn is_numeric(&self) -> bool {
        self.schema_type == "number"
    }

    /// Structural fields that must never be surfaced or set.
    #[must_use]
    pub fn is_ignored(&self) -> bool {
        if IGNORED_NAMES.contains(&self.name.as_str()) {
            return true;
        }
        IGNORED_TYPES.contains(&self.schema_type.as_str())
            || self
                .item_type
                .as_deref()
                .is_some_and(|items| IGNORED_TYPES.contains(&items))
    }

    #[must_use]
    pub fn is_project(&self) -> bool {
        self.id == "project" || self.name == PROJECT_FIELD
    }

    #[must_use]
    pub fn is_issue_type(&self) -> bool {
        self.id == "issuetype" || self.name == ISSUE_TYPE_FIELD
    }

    /// Whether the engine fills this field itself.
    #[must_use]
    pub fn is_auto(&self) -> bool {
        AUTO_FIELDS.contains(&self.name.as_str())
    }

    fn allowed_labels(&self) -> Vec<String> {
        self.allowed_values.keys().cloned().collect()
    }

    /// Check an override against the allowed values.
    ///
    /// # Errors
    ///
    /// Returns `DisallowedValue` when any selected label is not allowed.
    pub fn validate(&self, value: &FieldValue) -> Result<()> {
        if self.allowed_values.is_empty() {
            return Ok(());
        }
        let valid = value
            .labels()
            .is_some_and(|labels| labels.iter().all(|l| self.allowed_values.contains_key(l)));
        if valid {
            Ok(())
        } else {
            Err(MmjError::DisallowedValue {
                field: self.name.clone(),
                value: value.to_string(),
                allowed: self.allowed_labels(),
            })
        }
    }

    /// Resolve the value this field should carry.
    ///
    /// First match wins: the synthetic issue type and project fields take
    /// the target; a validated override; `0` for numbers; the only allowed
    /// value; an empty list for free-form arrays; every allowed label for
    /// enumerated fields; otherwise an empty string.
    ///
    /// # Errors
    ///
    /// Returns `DisallowedValue` if the override is not an allowed value.
    pub fn default_value(&self, target: &IssueTarget, overrides: &FieldMap) -> Result<FieldValue> {
        if self.is_issue_type() {
            return Ok(FieldValue::text(&target.issue_type));
        }
        if self.is_project() {
            return Ok(FieldValue::text(&target.project));
        }
        if let Some(value) = overrides.get(&self.name) {
            self.validate(value)?;
            return Ok(value.clone());
        }
        if self.is_numeric() {
            return Ok(FieldValue::Number(serde_json::Number::from(0_i64)));
        }
        if self.allowed_values.len() == 1 {
            return Ok(FieldValue::text(self.allowed_values.keys().next().cloned().unwrap_or_default()));
        }
        if self.is_array() && self.allowed_values.is_empty() {
            return Ok(FieldValue::List(Vec::new()));
        }
        if !self.allowed_values.is_empty() {
            return Ok(FieldValue::List(self.allowed_labels()));
        }
        Ok(FieldValue::text(""))
    }

    /// Every choice for array fields, an empty string otherwise.
    #[must_use]
    pub fn all_value(&self) -> FieldValue {
        if self.is_array() {
            FieldValue::List(self.allowed_labels())
        } else {
            FieldValue::text("")
        }
    }

    /// Sort key: lower sorts first.
    #[must_use]
    pub fn priority_score(&self, overrides: &FieldMap) -> i32 {
        let mut score = 1000;
        if self.required {
            score -= 500;
        }
        if self.allowed_values.len() == 1 {
            score -= 200;
        }
        if self.is_user_type() {
            score -= 150;
        }
        if overrides.contains_key(&self.name) {
            score -= 100;
        }
        score
    }
}
