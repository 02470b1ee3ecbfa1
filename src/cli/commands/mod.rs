//! Subcommand implementations.

pub mod check;
pub mod completions;
pub mod init;
pub mod run;
pub mod summary;
pub mod template;

use crate::config::ProjectConfig;
use crate::error::Result;
use crate::sync::SyncOptions;
use crate::tracker::{Credentials, JiraClient};

/// Build a tracker client from the config and the environment credentials.
///
/// # Errors
///
/// Returns a config error when no credentials are set.
pub fn connect(config: &ProjectConfig) -> Result<JiraClient> {
    let credentials = Credentials::from_env()?;
    Ok(JiraClient::new(
        &config.url,
        &credentials,
        config.link_type.as_str(),
        config.debug,
    ))
}

#[must_use]
pub fn sync_options(config: &ProjectConfig) -> SyncOptions {
    SyncOptions {
        epic_parent: config.epic_parent.clone(),
        base_url: config.url.clone(),
    }
}

/// Print `value` as pretty JSON on stdout.
///
/// # Errors
///
/// Returns an error if `value` cannot be serialized.
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
