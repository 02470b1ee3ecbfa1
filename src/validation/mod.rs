//! Template sanity checks.
//!
//! Runs after settings are merged into the per-kind templates and before
//! anything is written to the tracker. Every problem across every kind is
//! collected so the operator can fix them in one pass.

use crate::error::{MmjError, Result, ValidationError};
use crate::outline::IssueKind;
use crate::schema::{FieldMap, FieldSchema, FieldValue, IssueTarget};
use std::path::Path;

/// One merged template and the catalog it must satisfy.
#[derive(Debug, Clone, Copy)]
pub struct TemplateCheck<'a> {
    pub kind: IssueKind,
    pub source: &'a Path,
    pub target: &'a IssueTarget,
    pub fields: &'a [FieldSchema],
    pub values: &'a FieldMap,
}

/// Validates templates against field catalogs.
pub struct TemplateValidator;

impl TemplateValidator {
    /// Check one template and return every problem found.
    ///
    /// - every key must name a field of the target
    /// - required fields must not be blank
    /// - enumerated fields must hold allowed values
    /// - `Project` and `Issue Type`, when present, must match the target
    ///
    /// # Errors
    ///
    /// Returns every violated rule, in template order.
    pub fn validate(check: &TemplateCheck<'_>) -> std::result::Result<(), Vec<MmjError>> {
        let mut problems = Vec::new();
        let source_file = check.source.display().to_string();

        for (name, value) in check.values {
            let Some(field) = check.fields.iter().find(|f| &f.name == name) else {
                problems.push(MmjError::UnknownField {
                    field: name.clone(),
                    issue_kind: check.kind.to_string(),
                    source_file: source_file.clone(),
                });
                continue;
            };

            if field.required && value.is_blank() {
                problems.push(MmjError::RequiredField {
                    field: name.clone(),
                    issue_kind: check.kind.to_string(),
                    source_file: source_file.clone(),
                });
                continue;
            }

            if field.is_project() || field.is_issue_type() {
                let expected = if field.is_project() {
                    &check.target.project
                } else {
                    &check.target.issue_type
                };
                if value != &FieldValue::text(expected.as_str()) {
                    problems.push(MmjError::validation(
                        name.as_str(),
                        format!("{value} does not match {expected} in {source_file}"),
                    ));
                }
                continue;
            }

            if !value.is_blank() {
                if let Err(err) = field.validate(value) {
                    problems.push(err);
                }
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems)
        }
    }
}

/// Check every template, batching all problems into one error.
///
/// A single problem is returned as is; several become one
/// `ValidationErrors` listing each of them.
///
/// # Errors
///
/// Returns the problem, or the batch, found across all templates.
pub fn validate_templates(checks: &[TemplateCheck<'_>]) -> Result<()> {
    let mut problems: Vec<MmjError> = checks
        .iter()
        .filter_map(|check| TemplateValidator::validate(check).err())
        .flatten()
        .collect();

    match problems.len() {
        0 => Ok(()),
        1 => Err(problems.remove(0)),
        _ => Err(MmjError::ValidationErrors {
            errors: problems
                .iter()
                .map(|p| ValidationError::new(p.field_name().unwrap_or("template"), p.to_string()))
                .collect(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields() -> Vec<FieldSchema> {
        vec![
            FieldSchema::from_raw(
                "project",
                &json!({"name": "Project", "required": true, "schema": {"type": "project"}, "operations": ["set"]}),
            )
            .unwrap(),
            FieldSchema::from_raw(
                "assignee",
                &json!({"name": "Assignee", "required": true, "schema": {"type": "user"}, "operations": ["set"]}),
            )
            .unwrap(),
            FieldSchema::from_raw(
                "priority",
                &json!({"name": "Priority", "required": false, "schema": {"type": "priority"},
                    "operations": ["set"], "allowedValues": [{"name": "High", "id": "2"}, {"name": "Low", "id": "4"}]}),
            )
            .unwrap(),
        ]
    }

    #[test]
    fn test_valid_template_passes() {
        let fields = fields();
        let target = IssueTarget::new("PRJ", "Task");
        let mut values = FieldMap::new();
        values.insert("Project".into(), FieldValue::text("PRJ"));
        values.insert("Assignee".into(), FieldValue::text("alice"));
        values.insert("Priority".into(), FieldValue::text("Low"));
        let check = TemplateCheck {
            kind: IssueKind::Task,
            source: Path::new("task.yaml"),
            target: &target,
            fields: &fields,
            values: &values,
        };
        assert!(validate_templates(&[check]).is_ok());
    }

    #[test]
    fn test_single_problem_keeps_its_kind() {
        let fields = fields();
        let target = IssueTarget::new("PRJ", "Task");
        let mut values = FieldMap::new();
        values.insert("Flavour".into(), FieldValue::text("x"));
        let check = TemplateCheck {
            kind: IssueKind::SubTask,
            source: Path::new("sub-task.yaml"),
            target: &target,
            fields: &fields,
            values: &values,
        };
        let err = validate_templates(&[check]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Flavour is not a valid field for sub-task in sub-task.yaml"
        );
    }

    #[test]
    fn test_problems_batched_across_templates() {
        let fields = fields();
        let target = IssueTarget::new("PRJ", "Task");
        let mut task = FieldMap::new();
        task.insert("Flavour".into(), FieldValue::text("x"));
        task.insert("Assignee".into(), FieldValue::text(" "));
        let mut epic = FieldMap::new();
        epic.insert("Priority".into(), FieldValue::text("Urgent"));
        epic.insert("Project".into(), FieldValue::text("OTHER"));

        let checks = [
            TemplateCheck {
                kind: IssueKind::Task,
                source: Path::new("task.yaml"),
                target: &target,
                fields: &fields,
                values: &task,
            },
            TemplateCheck {
                kind: IssueKind::Epic,
                source: Path::new("epic.yaml"),
                target: &target,
                fields: &fields,
                values: &epic,
            },
        ];

        let err = validate_templates(&checks).unwrap_err();
        let MmjError::ValidationErrors { errors } = err else {
            panic!("expected batched errors, got {err:?}");
        };
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["Flavour", "Assignee", "Priority", "Project"]);
        assert_eq!(errors[0].message, "Flavour is not a valid field for task in task.yaml");
        assert_eq!(errors[1].message, "Assignee is required for task in task.yaml");
        assert!(errors[2].message.contains("not in allowed values"));
        assert!(errors[3].message.contains("does not match PRJ"));
    }
}
