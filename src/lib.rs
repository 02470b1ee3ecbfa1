//! Turn a mind-map outline into linked Jira epics, tasks and sub-tasks.
//!
//! The outline's first three levels below the root become epics, tasks and
//! sub-tasks; deeper levels are folded into their sub-task's description.
//! Every created node gets a checkpoint file, so a run can be repeated
//! until everything exists without creating duplicates.

pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod outline;
pub mod payload;
pub mod schema;
pub mod sync;
pub mod template;
pub mod tracker;
pub mod util;
pub mod validation;

pub use error::{ErrorCode, MmjError, Result, StructuredError};
