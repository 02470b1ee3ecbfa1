//! Conversion of a user field map into the tracker's wire payload.
//!
//! Keys of the user map are field *names*; keys of the payload are field
//! *ids*. Values are encoded per field:
//!
//! | field                         | encoding                         |
//! |-------------------------------|----------------------------------|
//! | array, enumerated, user items | list of `{"name": label}`        |
//! | array, enumerated             | list of `{"id": allowed id}`     |
//! | array, free-form              | raw list                         |
//! | scalar, enumerated            | `{"id": allowed id}`             |
//! | scalar user, free-form        | `{"name": value}`                |
//! | anything else                 | raw value                        |

use crate::error::{MmjError, Result, ValidationError};
use crate::schema::{FieldMap, FieldSchema, FieldValue, IssueTarget, Reference};
use indexmap::IndexMap;
use serde::Serialize;

/// A single encoded payload value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum WireValue {
    Scalar(String),
    Number(serde_json::Number),
    List(Vec<String>),
    Reference(Reference),
    References(Vec<Reference>),
}

/// The `fields` object of an issue creation request, keyed by field id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct IssuePayload {
    fields: IndexMap<String, WireValue>,
}

impl IssuePayload {
    #[must_use]
    pub fn get(&self, field_id: &str) -> Option<&WireValue> {
        self.fields.get(field_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &WireValue)> {
        self.fields.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn insert(&mut self, field_id: impl Into<String>, value: WireValue) {
        self.fields.insert(field_id.into(), value);
    }
}

/// Builds payloads for one target from its ordered field list.
#[derive(Debug, Clone, Copy)]
pub struct PayloadBuilder<'a> {
    target: &'a IssueTarget,
    fields: &'a [FieldSchema],
}

impl<'a> PayloadBuilder<'a> {
    #[must_use]
    pub const fn new(target: &'a IssueTarget, fields: &'a [FieldSchema]) -> Self {
        Self { target, fields }
    }

    fn field(&self, name: &str) -> Option<&'a FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Encode `overrides` into a payload.
    ///
    /// Problems are collected across every key and reported together.
    ///
    /// # Errors
    ///
    /// Returns a validation error listing every unknown, blank or
    /// unencodable entry.
    pub fn build(&self, overrides: &FieldMap) -> Result<IssuePayload> {
        let mut errors = Vec::new();
        let mut payload = IssuePayload::default();
        payload.insert("project", WireValue::Reference(Reference::Key(self.target.project.clone())));
        payload.insert(
            "issuetype",
            WireValue::Reference(Reference::Name(self.target.issue_type.clone())),
        );

        for (name, value) in overrides {
            if value.is_blank() {
                errors.push(ValidationError::new(
                    name.as_str(),
                    format!("{} {} {name} is empty", self.target.project, self.target.issue_type),
                ));
                continue;
            }
            let Some(field) = self.field(name) else {
                errors.push(ValidationError::new(
                    name.as_str(),
                    format!("is not a field of {}", self.target),
                ));
                continue;
            };
            if field.is_project() || field.is_issue_type() {
                let expected = if field.is_project() {
                    &self.target.project
                } else {
                    &self.target.issue_type
                };
                if value != &FieldValue::text(expected.as_str()) {
                    errors.push(ValidationError::new(
                        name.as_str(),
                        format!("{value} does not match {expected}"),
                    ));
                }
                continue;
            }
            match encode(field, value) {
                Ok(wire) => payload.insert(field.id.as_str(), wire),
                Err(err) => errors.push(err),
            }
        }

        if errors.is_empty() {
            Ok(payload)
        } else {
            Err(MmjError::from_validation_errors(errors))
        }
    }
}

fn lookup_id(field: &FieldSchema, label: &str) -> std::result::Result<Reference, ValidationError> {
    field
        .allowed_values
        .get(label)
        .map(|id| Reference::Id(id.clone()))
        .ok_or_else(|| {
            ValidationError::new(
                field.name.as_str(),
                format!(
                    "value \"{label}\" is not in allowed values: {:?}",
                    field.allowed_values.keys().collect::<Vec<_>>()
                ),
            )
        })
}

fn encode(field: &FieldSchema, value: &FieldValue) -> std::result::Result<WireValue, ValidationError> {
    let enumerated = !field.allowed_values.is_empty();

    if field.is_array() {
        let labels = match value {
            FieldValue::List(items) => items.clone(),
            FieldValue::Text(text) => vec![text.clone()],
            FieldValue::Number(n) => vec![n.to_string()],
            FieldValue::Reference(r) => return Ok(WireValue::References(vec![r.clone()])),
        };
        if !enumerated {
            return Ok(WireValue::List(labels));
        }
        if field.is_user_type() {
            return Ok(WireValue::References(
                labels.into_iter().map(Reference::Name).collect(),
            ));
        }
        let refs = labels
            .iter()
            .map(|label| lookup_id(field, label))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        return Ok(WireValue::References(refs));
    }

    let scalar = match value {
        FieldValue::List(items) => {
            return Err(ValidationError::new(
                field.name.as_str(),
                format!("is not an array, but {items:?}"),
            ));
        }
        FieldValue::Reference(r) => return Ok(WireValue::Reference(r.clone())),
        FieldValue::Number(n) if !enumerated && !field.is_user_type() => {
            return Ok(WireValue::Number(n.clone()));
        }
        FieldValue::Number(n) => n.to_string(),
        FieldValue::Text(text) => text.clone(),
    };

    if enumerated {
        lookup_id(field, &scalar).map(WireValue::Reference)
    } else if field.is_user_type() {
        Ok(WireValue::Reference(Reference::Name(scalar)))
    } else {
        Ok(WireValue::Scalar(scalar))
    }
}
