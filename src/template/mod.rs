//! Starter templates for the per-kind field files.
//!
//! A generated template lists every settable field for one issue type with
//! its resolved default. Required fields come first and are active; optional
//! fields are commented out. The banner keeps a fresh template from being
//! used until the operator has edited it and removed the marker lines.

use crate::config::UNEDITED_MARKER;
use crate::error::Result;
use crate::schema::{FieldMap, FieldSchema, FieldValue, IssueTarget};
use indexmap::IndexMap;

const RULE: &str = "# ---------------------------";

fn banner() -> Vec<String> {
    let bang = "# !!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!";
    vec![
        bang.to_string(),
        format!("# !!!!!!!!!!!!!!!!! {UNEDITED_MARKER} !!!!!!!!!!!!!!!!!!!!!"),
        "# !!!!!!!! THIS IS TO PREVENT INSERTING UNNEEDED VALID VALUES !!!!!!!!!".to_string(),
        bang.to_string(),
    ]
}

/// Indent list items so they read as belonging to the key above.
fn put_spaces(text: &str) -> String {
    text.lines()
        .map(|line| {
            if line.starts_with('-') {
                format!("   {line}")
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// The value shown for a field: the target for the structural fields,
/// otherwise the resolved default, or every choice when that is blank text.
fn shown_value(field: &FieldSchema, target: &IssueTarget, overrides: &FieldMap) -> Result<FieldValue> {
    let value = field.default_value(target, overrides)?;
    if value == FieldValue::text("") {
        Ok(field.all_value())
    } else {
        Ok(value)
    }
}

/// YAML lines for one field, or `None` for engine-managed fields.
///
/// # Errors
///
/// Returns `DisallowedValue` if an override is not allowed, or a YAML error.
pub fn yaml_section(
    field: &FieldSchema,
    target: &IssueTarget,
    overrides: &FieldMap,
) -> Result<Option<String>> {
    if field.is_auto() {
        return Ok(None);
    }
    let mut entry = IndexMap::new();
    entry.insert(field.name.clone(), shown_value(field, target, overrides)?);
    let dumped = serde_yaml::to_string(&entry)?;
    let mut lines: Vec<String> = dumped.trim_end().lines().map(str::to_string).collect();

    if field.is_array() {
        if let Some(first) = lines.first_mut() {
            first.push_str(" # Select Multiple");
        }
    } else if field.allowed_values.len() > 1 && !field.is_project() && !field.is_issue_type() {
        // A chosen value stays active; the choices become comments.
        let (head, choice_prefix) = match overrides.get(&field.name) {
            Some(value) => {
                let mut chosen = IndexMap::new();
                chosen.insert(field.name.clone(), value.clone());
                let mut head: Vec<String> = serde_yaml::to_string(&chosen)?
                    .trim_end()
                    .lines()
                    .map(str::to_string)
                    .collect();
                if let Some(first) = head.first_mut() {
                    first.push_str(" # Select One");
                }
                (head, "   # ")
            }
            None => {
                let key = serde_yaml::to_string(&field.name)?;
                (vec![format!("{}: # Select One", key.trim_end())], "   ")
            }
        };
        lines = head
            .into_iter()
            .chain(
                field
                    .allowed_values
                    .keys()
                    .map(|label| format!("{choice_prefix}{label}")),
            )
            .collect();
    }
    Ok(Some(lines.join("\n")))
}

/// Render the starter template for `target` from its ordered field list.
///
/// # Errors
///
/// Returns `DisallowedValue` if an override is not allowed, or a YAML error.
pub fn render_template(
    target: &IssueTarget,
    fields: &[FieldSchema],
    overrides: &FieldMap,
) -> Result<String> {
    let mut output = banner();

    output.push(RULE.to_string());
    output.push("# Required Fields:".to_string());
    output.push(RULE.to_string());
    for field in fields.iter().filter(|f| f.required) {
        if let Some(section) = yaml_section(field, target, overrides)? {
            output.push(put_spaces(&section));
        }
    }

    output.push(RULE.to_string());
    output.push("# Optional Fields:".to_string());
    output.push(RULE.to_string());
    for field in fields.iter().filter(|f| !f.required) {
        if let Some(section) = yaml_section(field, target, overrides)? {
            for line in section.lines() {
                output.push(format!("# {}", put_spaces(line.trim_end())));
            }
        }
    }

    let mut text = output.join("\n");
    text.push('\n');
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_field_map;
    use serde_json::json;

    fn field(id: &str, raw: serde_json::Value) -> FieldSchema {
        FieldSchema::from_raw(id, &raw).expect("field")
    }

    fn fields() -> Vec<FieldSchema> {
        vec![
            field("project", json!({"name": "Project", "required": true, "schema": {"type": "project"},
                "operations": ["set"], "allowedValues": [{"name": "Project X", "id": "1"}]})),
            field("issuetype", json!({"name": "Issue Type", "required": true, "schema": {"type": "issuetype"},
                "operations": [], "allowedValues": [{"name": "Task", "id": "3"}]})),
            field("summary", json!({"name": "Summary", "required": true, "schema": {"type": "string"},
                "operations": ["set"]})),
            field("priority", json!({"name": "Priority", "required": true, "schema": {"type": "priority"},
                "operations": ["set"], "allowedValues": [{"name": "High", "id": "2"}, {"name": "Low", "id": "4"}]})),
            field("labels", json!({"name": "Labels", "required": false, "schema": {"type": "array", "items": "string"},
                "operations": ["add", "set", "remove"]})),
            field("components", json!({"name": "Component/s", "required": false,
                "schema": {"type": "array", "items": "component"}, "operations": ["add", "set", "remove"],
                "allowedValues": [{"name": "api", "id": "c1"}, {"name": "ui", "id": "c2"}]})),
            field("environment", json!({"name": "Environment", "required": false, "schema": {"type": "string"},
                "operations": ["set"]})),
        ]
    }

    #[test]
    fn test_template_layout() {
        let target = IssueTarget::new("PRJ", "Task");
        let text = render_template(&target, &fields(), &FieldMap::new()).unwrap();

        assert!(text.contains(UNEDITED_MARKER));
        assert!(text.contains("Project: PRJ\n"));
        assert!(text.contains("Issue Type: Task\n"));
        assert!(text.contains("Priority: # Select One\n   High\n   Low\n"));
        assert!(!text.contains("Summary"));
        assert!(text.contains("# Labels: [] # Select Multiple\n"));
        assert!(text.contains("# Component/s: # Select Multiple\n#    - api\n#    - ui\n"));
        assert!(text.contains("# Environment: ''\n"));

        let required = text.find("# Required Fields:").unwrap();
        let optional = text.find("# Optional Fields:").unwrap();
        assert!(text.find("Priority:").unwrap() > required);
        assert!(text.find("Priority:").unwrap() < optional);
    }

    #[test]
    fn test_override_shown_as_chosen_value() {
        let target = IssueTarget::new("PRJ", "Task");
        let mut overrides = FieldMap::new();
        overrides.insert("Priority".into(), FieldValue::text("Low"));
        let text = render_template(&target, &fields(), &overrides).unwrap();
        assert!(text.contains("Priority: Low # Select One\n"));
    }

    #[test]
    fn test_edited_template_parses_back() {
        let target = IssueTarget::new("PRJ", "Task");
        let mut overrides = FieldMap::new();
        overrides.insert("Priority".into(), FieldValue::text("High"));
        let text = render_template(&target, &fields(), &overrides).unwrap();
        let map = parse_field_map(&text).unwrap();
        assert_eq!(map["Project"], FieldValue::text("PRJ"));
        assert_eq!(map["Priority"], FieldValue::text("High"));
        assert!(!map.contains_key("Labels"));
    }

    #[test]
    fn test_chosen_value_keeps_its_type() {
        let target = IssueTarget::new("PRJ", "Task");
        let flag = field("customfield_7", json!({"name": "Flag", "required": true,
            "schema": {"type": "option"}, "operations": ["set"],
            "allowedValues": [{"value": "true", "id": "1"}, {"value": "1.0", "id": "2"},
                {"value": "a: b", "id": "3"}]}));

        for label in ["true", "1.0", "a: b"] {
            let mut overrides = FieldMap::new();
            overrides.insert("Flag".into(), FieldValue::text(label));
            let section = yaml_section(&flag, &target, &overrides).unwrap().unwrap();
            let first = section.lines().next().unwrap();
            assert!(first.starts_with("Flag: "), "{first}");
            assert!(first.ends_with(" # Select One"), "{first}");

            let map = parse_field_map(&section).unwrap();
            assert_eq!(map["Flag"], FieldValue::text(label));
        }
    }

    #[test]
    fn test_disallowed_override_fails() {
        let target = IssueTarget::new("PRJ", "Task");
        let mut overrides = FieldMap::new();
        overrides.insert("Priority".into(), FieldValue::text("Urgent"));
        assert!(render_template(&target, &fields(), &overrides).is_err());
    }
}
