//! Remote issue tracker interface.

pub mod jira;

pub use jira::{Credentials, JiraClient};

use crate::error::Result;
use crate::payload::IssuePayload;

/// Blocking calls the sync pipeline makes against the tracker.
///
/// Every failure is fatal to the run; implementations do not retry.
pub trait TrackerClient {
    /// Fetch the create-metadata document for one (project, issue type).
    ///
    /// # Errors
    ///
    /// Returns a remote error if the request fails.
    fn fetch_field_schema(&mut self, project: &str, issue_type: &str) -> Result<serde_json::Value>;

    /// Create an issue and return its key.
    ///
    /// # Errors
    ///
    /// Returns a remote error if the tracker rejects the payload.
    fn create_issue(&mut self, payload: &IssuePayload) -> Result<String>;

    /// Record `child_key` as a child of `parent_key`.
    ///
    /// # Errors
    ///
    /// Returns a remote error if the link cannot be created.
    fn link_as_parent(&mut self, parent_key: &str, child_key: &str) -> Result<()>;
}
