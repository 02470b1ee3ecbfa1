//! Jira REST (v2) client over blocking `ureq`.

use super::TrackerClient;
use crate::error::{MmjError, Result};
use crate::payload::IssuePayload;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, info};

pub const ENV_TOKEN: &str = "JIRA_TOKEN";
pub const ENV_USER: &str = "JIRA_USER";
pub const ENV_PASS: &str = "JIRA_PASS";

const TIMEOUT: Duration = Duration::from_secs(60);

/// Authentication for the tracker.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Token(String),
    Basic { user: String, password: String },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Token(_) => f.write_str("Credentials::Token(***)"),
            Self::Basic { user, .. } => write!(f, "Credentials::Basic({user}, ***)"),
        }
    }
}

impl Credentials {
    /// Read credentials from the process environment.
    ///
    /// # Errors
    ///
    /// Returns a config error if neither a token nor a user/password pair is set.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read credentials through `lookup`. A token wins over user/password.
    ///
    /// # Errors
    ///
    /// Returns a config error if neither a token nor a user/password pair is set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());
        if let Some(token) = non_empty(ENV_TOKEN) {
            return Ok(Self::Token(token));
        }
        match (non_empty(ENV_USER), non_empty(ENV_PASS)) {
            (Some(user), Some(password)) => Ok(Self::Basic { user, password }),
            _ => Err(MmjError::Config(format!(
                "{ENV_USER} and {ENV_PASS}, or {ENV_TOKEN}, must be set"
            ))),
        }
    }

    /// Value of the `Authorization` header.
    #[must_use]
    pub fn header_value(&self) -> String {
        match self {
            Self::Token(token) => format!("Bearer {token}"),
            Self::Basic { user, password } => {
                format!("Basic {}", STANDARD.encode(format!("{user}:{password}")))
            }
        }
    }
}

/// One entry of `GET /rest/api/2/issueLinkType`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LinkType {
    pub name: String,
    #[serde(default)]
    pub inward: String,
    #[serde(default)]
    pub outward: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LinkTypeList {
    issue_link_types: Vec<LinkType>,
}

/// A link request after its type has been resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLink {
    pub type_name: String,
    pub inward_key: String,
    pub outward_key: String,
}

/// Resolve `requested` against the server's link types.
///
/// A type name is used as-is. An outward description maps to its type name.
/// An inward description maps to its type name with the issues swapped.
/// Unmatched text is sent as a name and left for the server to reject.
#[must_use]
pub fn resolve_link(
    types: &[LinkType],
    requested: &str,
    inward_key: &str,
    outward_key: &str,
) -> ResolvedLink {
    let straight = |name: &str| ResolvedLink {
        type_name: name.to_string(),
        inward_key: inward_key.to_string(),
        outward_key: outward_key.to_string(),
    };

    if types.iter().any(|t| t.name == requested) {
        return straight(requested);
    }
    if let Some(t) = types.iter().find(|t| t.outward == requested) {
        return straight(&t.name);
    }
    if let Some(t) = types.iter().find(|t| t.inward == requested) {
        return ResolvedLink {
            type_name: t.name.clone(),
            inward_key: outward_key.to_string(),
            outward_key: inward_key.to_string(),
        };
    }
    straight(requested)
}

/// Client for a Jira server.
#[derive(Debug)]
pub struct JiraClient {
    base_url: String,
    agent: ureq::Agent,
    auth: String,
    link_type: String,
    debug: bool,
    link_types: Option<Vec<LinkType>>,
}

impl JiraClient {
    #[must_use]
    pub fn new(
        base_url: &str,
        credentials: &Credentials,
        link_type: impl Into<String>,
        debug: bool,
    ) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(TIMEOUT).build();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent,
            auth: credentials.header_value(),
            link_type: link_type.into(),
            debug,
            link_types: None,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/rest/api/2/{path}", self.base_url)
    }

    fn send(&self, request: ureq::Request, body: Option<&Value>, operation: &str) -> Result<Value> {
        let request = request
            .set("Authorization", &self.auth)
            .set("Accept", "application/json");
        let result = match body {
            Some(body) => request
                .set("Content-Type", "application/json")
                .send_string(&body.to_string()),
            None => request.call(),
        };

        match result {
            Ok(response) => {
                let text = response
                    .into_string()
                    .map_err(|e| MmjError::remote(operation, e))?;
                if text.trim().is_empty() {
                    Ok(Value::Null)
                } else {
                    Ok(serde_json::from_str(&text)?)
                }
            }
            Err(ureq::Error::Status(code, response)) => {
                let body = response.into_string().unwrap_or_default();
                Err(MmjError::remote(operation, format!("HTTP {code}: {body}")))
            }
            Err(ureq::Error::Transport(transport)) => Err(MmjError::remote(
                operation,
                format!("transport error: {transport}"),
            )),
        }
    }

    fn link_types(&mut self) -> Result<&[LinkType]> {
        if self.link_types.is_none() {
            let request = self.agent.get(&self.url("issueLinkType"));
            let value = self.send(request, None, "list link types")?;
            let list: LinkTypeList = serde_json::from_value(value)?;
            self.link_types = Some(list.issue_link_types);
        }
        Ok(self.link_types.as_deref().unwrap_or_default())
    }
}

impl TrackerClient for JiraClient {
    fn fetch_field_schema(&mut self, project: &str, issue_type: &str) -> Result<Value> {
        let request = self
            .agent
            .get(&self.url("issue/createmeta"))
            .query("projectKeys", project)
            .query("issuetypeNames", issue_type)
            .query("expand", "projects.issuetypes.fields");
        self.send(request, None, "fetch field schema")
    }

    fn create_issue(&mut self, payload: &IssuePayload) -> Result<String> {
        if self.debug {
            info!(
                "JSON Dump:\n{}",
                serde_json::to_string_pretty(payload).unwrap_or_default()
            );
        }
        let body = json!({ "fields": payload });
        let request = self.agent.post(&self.url("issue"));
        let response = self.send(request, Some(&body), "create issue")?;
        let key = response
            .get("key")
            .and_then(Value::as_str)
            .ok_or_else(|| MmjError::remote("create issue", format!("response has no key: {response}")))?;
        debug!(key, "Issue created");
        Ok(key.to_string())
    }

    fn link_as_parent(&mut self, parent_key: &str, child_key: &str) -> Result<()> {
        let requested = self.link_type.clone();
        let link = resolve_link(self.link_types()?, &requested, parent_key, child_key);
        let body = json!({
            "type": { "name": link.type_name },
            "inwardIssue": { "key": link.inward_key },
            "outwardIssue": { "key": link.outward_key },
        });
        let request = self.agent.post(&self.url("issueLink"));
        self.send(request, Some(&body), "link issues")?;
        debug!(parent = parent_key, child = child_key, link_type = %link.type_name, "Issues linked");
        Ok(())
    }
}
