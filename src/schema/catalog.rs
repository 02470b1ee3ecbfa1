//! Per (project, issue type) field catalogs with a read-through disk cache.
//!
//! The cache is trusted as-is: a cached document is never refetched. Delete
//! the cache file to pick up schema changes made on the tracker.

use super::{FieldMap, FieldSchema, IssueTarget};
use crate::error::{MmjError, Result};
use crate::tracker::TrackerClient;
use crate::util::write_atomic;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Directory of cached create-metadata documents, one JSON file per target.
#[derive(Debug, Clone)]
pub struct SchemaCache {
    dir: PathBuf,
}

impl SchemaCache {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Cache file for `target`: `<dir>/<project>_<issue type>.json`.
    #[must_use]
    pub fn path_for(&self, target: &IssueTarget) -> PathBuf {
        self.dir
            .join(format!("{}_{}.json", target.project, target.issue_type))
    }

    /// Read the cached document for `target`, if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(&self, target: &IssueTarget) -> Result<Option<serde_json::Value>> {
        let path = self.path_for(target);
        if !path.is_file() {
            return Ok(None);
        }
        info!(path = %path.display(), "Loading fields from cache");
        let contents = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    /// Persist the document for `target`.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache directory or file cannot be written.
    pub fn store(&self, target: &IssueTarget, document: &serde_json::Value) -> Result<()> {
        let path = self.path_for(target);
        let body = serde_json::to_string_pretty(document)?;
        write_atomic(&path, body.as_bytes())?;
        debug!(path = %path.display(), "Cached field metadata");
        Ok(())
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Ordered field lists keyed by target, loaded on demand.
#[derive(Debug)]
pub struct SchemaCatalog {
    cache: SchemaCache,
    entries: HashMap<IssueTarget, Vec<FieldSchema>>,
}

impl SchemaCatalog {
    #[must_use]
    pub fn new(cache: SchemaCache) -> Self {
        Self {
            cache,
            entries: HashMap::new(),
        }
    }

    /// Load the fields for `target`, fetching from the tracker only when the
    /// disk cache has no document for it.
    ///
    /// Fields are sorted by [`FieldSchema::priority_score`] against
    /// `overrides`; ties keep document order.
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch fails, the cache cannot be used, or the
    /// document is malformed.
    pub fn load(
        &mut self,
        tracker: &mut dyn TrackerClient,
        target: &IssueTarget,
        overrides: &FieldMap,
    ) -> Result<&[FieldSchema]> {
        let document = if let Some(document) = self.cache.load(target)? {
            document
        } else {
            info!(issue_type = %target.issue_type, project = %target.project, "Fetching fields");
            let document = tracker.fetch_field_schema(&target.project, &target.issue_type)?;
            self.cache.store(target, &document)?;
            document
        };

        let fields = fields_from_document(&document, overrides)?;
        self.entries.insert(target.clone(), fields);
        Ok(self.get(target).unwrap_or_default())
    }

    /// Fields previously loaded for `target`.
    #[must_use]
    pub fn get(&self, target: &IssueTarget) -> Option<&[FieldSchema]> {
        self.entries.get(target).map(Vec::as_slice)
    }

    #[must_use]
    pub const fn cache(&self) -> &SchemaCache {
        &self.cache
    }
}

/// Extract, filter and sort the fields of a create-metadata document.
///
/// The document lists projects, each with issue types, each with a field
/// map keyed by field id; only the first project and issue type are used.
///
/// # Errors
///
/// Returns a schema error if the document does not have that shape or a
/// field entry is malformed.
pub fn fields_from_document(
    document: &serde_json::Value,
    overrides: &FieldMap,
) -> Result<Vec<FieldSchema>> {
    let fields = document
        .get("projects")
        .and_then(|p| p.get(0))
        .and_then(|p| p.get("issuetypes"))
        .and_then(|t| t.get(0))
        .and_then(|t| t.get("fields"))
        .and_then(serde_json::Value::as_object)
        .ok_or_else(|| {
            MmjError::schema(
                "create metadata has no projects[0].issuetypes[0].fields",
                truncate(&document.to_string(), 200),
            )
        })?;

    let mut parsed = Vec::with_capacity(fields.len());
    for (id, raw) in fields {
        let field = FieldSchema::from_raw(id, raw)?;
        if field.is_ignored() {
            debug!(field = %field.name, "Ignoring field");
            continue;
        }
        parsed.push(field);
    }
    parsed.sort_by_key(|f| f.priority_score(overrides));
    Ok(parsed)
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max).collect();
    format!("{cut}...")
}
