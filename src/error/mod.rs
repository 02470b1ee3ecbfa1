//! Error types and handling for `mindmap_jira`.
//!
//! Every failure in the pipeline is fatal: the run stops at the first
//! error and the operator re-runs once the cause is fixed. Checkpoints
//! are only written after the tracker confirmed a key, so a re-run picks
//! up exactly where the failed one stopped.
//!
//! # Design
//!
//! - Uses `thiserror` for derive-based error types
//! - Groups variants by class: configuration, schema, state, remote
//! - Provides recovery hints for user-facing errors
//! - Provides structured JSON output for scripted callers

mod context;
mod structured;

pub use context::{OptionExt, ResultExt};
pub use structured::{ErrorCode, StructuredError};

use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for `mindmap_jira` operations.
#[derive(Error, Debug)]
pub enum MmjError {
    // === Configuration Errors ===
    /// Configuration file or value error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A template or settings key names a field the tracker does not know.
    #[error("{field} is not a valid field for {issue_kind} in {source_file}")]
    UnknownField {
        field: String,
        issue_kind: String,
        source_file: String,
    },

    /// A required field was left blank.
    #[error("{field} is required for {issue_kind} in {source_file}")]
    RequiredField {
        field: String,
        issue_kind: String,
        source_file: String,
    },

    /// An override is not one of the field's allowed values.
    #[error("{field} value: \"{value}\" is not in allowed values: {allowed:?}")]
    DisallowedValue {
        field: String,
        value: String,
        allowed: Vec<String>,
    },

    /// Field validation failed.
    #[error("Validation failed: {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Multiple validation errors occurred.
    #[error("Validation errors:\n{}", format_errors(.errors))]
    ValidationErrors { errors: Vec<ValidationError> },

    /// Generated templates still carry the edit marker.
    #[error("The following files have not been edited: {files:?}")]
    UneditedTemplates { files: Vec<PathBuf> },

    // === Schema Errors ===
    /// Field metadata from the tracker could not be interpreted.
    #[error("Schema error: {context}: {raw}")]
    Schema { context: String, raw: String },

    // === State Errors ===
    /// A parent checkpoint has no tracker key yet.
    #[error("Parent {parent_id} of node {node_id} has no tracker key")]
    MissingParentKey { node_id: String, parent_id: String },

    /// A checkpoint exists but holds the unset key sentinel.
    #[error("Corrupt checkpoint {}: no key", path.display())]
    CorruptCheckpoint { path: PathBuf },

    // === Remote Errors ===
    /// A tracker call failed.
    #[error("Tracker {operation} failed: {message}")]
    Remote { operation: String, message: String },

    // === I/O Errors ===
    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Checkpoint decode error.
    #[error("TOML error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// Checkpoint encode error.
    #[error("TOML error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// Outline document parse error.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    // === Wrapped errors ===
    /// Error with additional context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Wrapped anyhow error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A single field validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The field that failed validation.
    pub field: String,
    /// The reason for the validation failure.
    pub message: String,
}

impl ValidationError {
    /// Create a new validation error.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

impl MmjError {
    /// Human-friendly suggestion for fixing this error.
    #[must_use]
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::UneditedTemplates { .. } => {
                Some("Edit the templates, delete the marker lines and re-run")
            }
            Self::DisallowedValue { .. } => Some("Pick one of the listed allowed values"),
            Self::UnknownField { .. } => {
                Some("Remove the key or check its spelling against `mmj template`")
            }
            Self::RequiredField { .. } => Some("Fill in the required field in the template"),
            Self::MissingParentKey { .. } => {
                Some("Re-run so the parent is created first, or inspect its checkpoint")
            }
            Self::CorruptCheckpoint { .. } => {
                Some("Fix or delete the checkpoint file by hand before re-running")
            }
            Self::Remote { .. } => {
                Some("Re-run when the tracker is reachable; finished nodes are skipped")
            }
            Self::Schema { .. } => Some("Delete the cached schema file to refetch it"),
            _ => None,
        }
    }

    /// The field a configuration error is about, if any.
    #[must_use]
    pub fn field_name(&self) -> Option<&str> {
        match self {
            Self::UnknownField { field, .. }
            | Self::RequiredField { field, .. }
            | Self::DisallowedValue { field, .. }
            | Self::Validation { field, .. } => Some(field),
            _ => None,
        }
    }

    /// Create a validation error for a specific field.
    #[must_use]
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a remote failure for the named operation.
    #[must_use]
    pub fn remote(operation: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Remote {
            operation: operation.into(),
            message: message.to_string(),
        }
    }

    /// Create a schema error carrying the offending raw value.
    #[must_use]
    pub fn schema(context: impl Into<String>, raw: impl std::fmt::Display) -> Self {
        Self::Schema {
            context: context.into(),
            raw: raw.to_string(),
        }
    }

    /// Create from multiple validation errors.
    #[must_use]
    pub fn from_validation_errors(errors: Vec<ValidationError>) -> Self {
        if errors.len() == 1 {
            let err = &errors[0];
            Self::Validation {
                field: err.field.clone(),
                reason: err.message.clone(),
            }
        } else {
            Self::ValidationErrors { errors }
        }
    }
}

/// Result type using `MmjError`.
pub type Result<T> = std::result::Result<T, MmjError>;
