//! Structured error output for scripted callers.
//!
//! Provides machine-parseable error information with:
//! - Error codes for categorization
//! - Hints for self-correction
//! - Retryability flags
//! - Context for debugging

use crate::error::MmjError;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Machine-readable error codes.
///
/// These codes are stable and can be used for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // === Remote Errors (exit code 4) ===
    /// Tracker call failed
    RemoteError,

    // === State Errors (exit code 5) ===
    /// Parent checkpoint has no tracker key
    MissingParentKey,
    /// Checkpoint holds the unset key sentinel
    CorruptCheckpoint,

    // === Schema Errors (exit code 6) ===
    /// Tracker field metadata malformed
    SchemaError,

    // === Config Errors (exit code 7) ===
    /// Configuration error
    ConfigError,
    /// Field not known to the tracker schema
    UnknownField,
    /// Required field left blank
    RequiredField,
    /// Value outside the allowed set
    DisallowedValue,
    /// Field validation failed
    ValidationFailed,
    /// Templates still carry the edit marker
    UneditedTemplates,

    // === I/O Errors (exit code 8) ===
    /// File I/O error
    IoError,
    /// JSON serialization error
    JsonError,
    /// YAML parsing error
    YamlError,
    /// Checkpoint encoding error
    TomlError,
    /// Outline document parse error
    XmlError,

    // === Internal Errors (exit code 1) ===
    /// Unexpected internal error
    InternalError,
}

impl ErrorCode {
    /// Get the string representation for JSON output.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RemoteError => "REMOTE_ERROR",
            Self::MissingParentKey => "MISSING_PARENT_KEY",
            Self::CorruptCheckpoint => "CORRUPT_CHECKPOINT",
            Self::SchemaError => "SCHEMA_ERROR",
            Self::ConfigError => "CONFIG_ERROR",
            Self::UnknownField => "UNKNOWN_FIELD",
            Self::RequiredField => "REQUIRED_FIELD",
            Self::DisallowedValue => "DISALLOWED_VALUE",
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::UneditedTemplates => "UNEDITED_TEMPLATES",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::YamlError => "YAML_ERROR",
            Self::TomlError => "TOML_ERROR",
            Self::XmlError => "XML_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Whether re-running unchanged can succeed.
    ///
    /// Only remote failures qualify: checkpoints make the re-run safe.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::RemoteError)
    }

    /// Get the exit code for this error category.
    ///
    /// - 1: Internal/unknown errors
    /// - 4: Remote errors
    /// - 5: State errors
    /// - 6: Schema errors
    /// - 7: Config errors
    /// - 8: I/O errors
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::RemoteError => 4,
            Self::MissingParentKey | Self::CorruptCheckpoint => 5,
            Self::SchemaError => 6,
            Self::ConfigError
            | Self::UnknownField
            | Self::RequiredField
            | Self::DisallowedValue
            | Self::ValidationFailed
            | Self::UneditedTemplates => 7,
            Self::IoError
            | Self::JsonError
            | Self::YamlError
            | Self::TomlError
            | Self::XmlError => 8,
            Self::InternalError => 1,
        }
    }
}

/// Structured error for machine-parseable output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Machine-readable error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional hint for fixing the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether the operation can be retried
    pub retryable: bool,
    /// Additional context data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl StructuredError {
    /// Create a new structured error from a `MmjError`.
    #[must_use]
    pub fn from_error(err: &MmjError) -> Self {
        let (code, context) = Self::extract_code_and_context(err);
        let hint = Self::generate_hint(err);

        Self {
            code,
            message: err.to_string(),
            hint,
            retryable: code.is_retryable(),
            context,
        }
    }

    /// Serialize to JSON value.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "error": {
                "code": self.code.as_str(),
                "message": self.message,
                "hint": self.hint,
                "retryable": self.retryable,
                "context": self.context,
            }
        })
    }

    /// Format for human-readable output.
    #[must_use]
    pub fn to_human(&self, color: bool) -> String {
        let mut output = String::new();

        if color {
            output.push_str("\x1b[31mError:\x1b[0m ");
        } else {
            output.push_str("Error: ");
        }

        output.push_str(&self.message);

        if let Some(hint) = &self.hint {
            output.push('\n');
            if color {
                output.push_str("\x1b[33mHint:\x1b[0m ");
            } else {
                output.push_str("Hint: ");
            }
            output.push_str(hint);
        }

        output
    }

    fn extract_code_and_context(err: &MmjError) -> (ErrorCode, Option<Value>) {
        match err {
            MmjError::Config(_) => (ErrorCode::ConfigError, None),
            MmjError::UnknownField {
                field,
                issue_kind,
                source_file,
            } => (
                ErrorCode::UnknownField,
                Some(json!({"field": field, "issue_kind": issue_kind, "source": source_file})),
            ),
            MmjError::RequiredField {
                field,
                issue_kind,
                source_file,
            } => (
                ErrorCode::RequiredField,
                Some(json!({"field": field, "issue_kind": issue_kind, "source": source_file})),
            ),
            MmjError::DisallowedValue {
                field,
                value,
                allowed,
            } => (
                ErrorCode::DisallowedValue,
                Some(json!({"field": field, "value": value, "allowed": allowed})),
            ),
            MmjError::Validation { field, reason } => (
                ErrorCode::ValidationFailed,
                Some(json!({"field": field, "reason": reason})),
            ),
            MmjError::ValidationErrors { errors } => (
                ErrorCode::ValidationFailed,
                Some(json!({
                    "errors": errors.iter()
                        .map(|e| json!({"field": e.field, "message": e.message}))
                        .collect::<Vec<_>>()
                })),
            ),
            MmjError::UneditedTemplates { files } => (
                ErrorCode::UneditedTemplates,
                Some(json!({
                    "files": files.iter().map(|p| p.display().to_string()).collect::<Vec<_>>()
                })),
            ),
            MmjError::Schema { context, raw } => (
                ErrorCode::SchemaError,
                Some(json!({"context": context, "raw": raw})),
            ),
            MmjError::MissingParentKey { node_id, parent_id } => (
                ErrorCode::MissingParentKey,
                Some(json!({"node_id": node_id, "parent_id": parent_id})),
            ),
            MmjError::CorruptCheckpoint { path } => (
                ErrorCode::CorruptCheckpoint,
                Some(json!({"path": path.display().to_string()})),
            ),
            MmjError::Remote { operation, .. } => (
                ErrorCode::RemoteError,
                Some(json!({"operation": operation})),
            ),
            MmjError::Io(_) => (ErrorCode::IoError, None),
            MmjError::Json(_) => (ErrorCode::JsonError, None),
            MmjError::Yaml(_) => (ErrorCode::YamlError, None),
            MmjError::TomlDe(_) | MmjError::TomlSer(_) => (ErrorCode::TomlError, None),
            MmjError::Xml(_) => (ErrorCode::XmlError, None),
            MmjError::WithContext { source, .. } => {
                if let Some(inner) = source.downcast_ref::<MmjError>() {
                    return Self::extract_code_and_context(inner);
                }
                let code = if source.is::<std::io::Error>() {
                    ErrorCode::IoError
                } else if source.is::<serde_yaml::Error>() {
                    ErrorCode::YamlError
                } else if source.is::<toml::de::Error>() {
                    ErrorCode::TomlError
                } else if source.is::<serde_json::Error>() {
                    ErrorCode::JsonError
                } else {
                    ErrorCode::InternalError
                };
                (code, None)
            }
            MmjError::Other(_) => (ErrorCode::InternalError, None),
        }
    }

    fn generate_hint(err: &MmjError) -> Option<String> {
        if let MmjError::DisallowedValue { value, allowed, .. } = err {
            if let Some(closest) = closest_match(value, allowed) {
                return Some(format!("Did you mean '{closest}'?"));
            }
        }
        err.suggestion().map(str::to_string)
    }
}

/// Pick the allowed value closest to `input`, if any is reasonably close.
fn closest_match<'a>(input: &str, candidates: &'a [String]) -> Option<&'a str> {
    let needle = input.to_lowercase();
    let max_distance = (needle.len() / 3).max(2);
    candidates
        .iter()
        .map(|c| (levenshtein_distance(&needle, &c.to_lowercase()), c))
        .filter(|(d, _)| *d <= max_distance)
        .min_by_key(|(d, _)| *d)
        .map(|(_, c)| c.as_str())
}

/// Calculate Levenshtein edit distance between two strings.
fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let n = b_chars.len();

    let mut prev: Vec<usize> = (0..=n).collect();
    let mut curr = vec![0; n + 1];

    for (i, ca) in a_chars.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}
