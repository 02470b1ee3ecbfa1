//! Context helpers for attaching a human-readable location to errors.

use super::{MmjError, Result};

/// Extension trait adding context to any fallible result.
pub trait ResultExt<T> {
    /// Wrap the error with a static context message.
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Wrap the error with a lazily built context message.
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|source| MmjError::WithContext {
            context: context.into(),
            source: Box::new(source),
        })
    }

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|source| MmjError::WithContext {
            context: f().into(),
            source: Box::new(source),
        })
    }
}

/// Extension trait turning a missing value into a configuration error.
pub trait OptionExt<T> {
    /// Return a `Config` error with `message` when the value is `None`.
    fn ok_or_config(self, message: impl Into<String>) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_config(self, message: impl Into<String>) -> Result<T> {
        self.ok_or_else(|| MmjError::Config(message.into()))
    }
}
