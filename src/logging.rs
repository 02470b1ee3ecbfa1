//! Logging setup built on `tracing-subscriber`.
//!
//! Verbosity precedence: `RUST_LOG` > `-q` > `-v/-vv` > default (`info`
//! for this crate, `warn` for dependencies). Human output goes to stderr so
//! stdout stays clean for `template` and `completions`.

use anyhow::Context;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Once;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Build the filter directive for the given verbosity flags.
#[must_use]
pub fn filter_directive(verbose: u8, quiet: bool) -> String {
    if quiet {
        return "error".to_string();
    }
    match verbose {
        0 => "warn,mindmap_jira=info".to_string(),
        1 => "warn,mindmap_jira=debug".to_string(),
        _ => "debug,mindmap_jira=trace".to_string(),
    }
}

/// Initialize the global subscriber.
///
/// When `log_file` is given, a JSON layer mirrors every event into that file.
///
/// # Errors
///
/// Returns an error if the log file cannot be opened or a subscriber is
/// already installed.
pub fn init_logging(verbose: u8, quiet: bool, log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter_directive(verbose, quiet)))
        .context("invalid log filter")?;

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time();

    let json_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            Some(fmt::layer().json().with_writer(std::sync::Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(json_layer)
        .try_init()
        .context("logging is already initialized")?;

    Ok(())
}

static TEST_INIT: Once = Once::new();

/// Install a test-friendly subscriber once per process.
pub fn init_test_logging() {
    TEST_INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("mindmap_jira=debug"));
        let _ = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
