//! The migration engine's error taxonomy (§7). Each variant names the
//! class of failure an operator needs to distinguish when deciding
//! whether to retry, fix configuration, or accept partial progress.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrateError {
    /// The migration itself (or the environment it targets) is set up
    /// wrong: a missing content type, an unresolvable workflow step, an
    /// invalid migration snapshot.
    #[error("configuration error: {0}")]
    Config(String),

    /// A reference inside the migration data (item, asset, taxonomy
    /// term, workflow step) could not be resolved against the target
    /// environment's definitions.
    #[error("lookup error: {0}")]
    Lookup(String),

    /// An element or rich-text value could not be translated between
    /// wire format and migration-data format.
    #[error("transform error: {0}")]
    Transform(String),

    /// The management API rejected or failed a request in a way that is
    /// not a simple not-found (auth, validation, rate limit exhaustion,
    /// network failure after retries).
    #[error("remote API error: {0}")]
    Remote(#[from] migrate_api::Error),

    /// The harness or a processing step failed for an item in a way
    /// that's specific to that item rather than the whole run.
    #[error("processing error for item {codename}: {message}")]
    Processing { codename: String, message: String },

    /// An invariant the engine relies on internally was violated (e.g. a
    /// poisoned lock after a panic elsewhere) rather than a bad input or a
    /// remote failure.
    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, MigrateError>;

impl MigrateError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn lookup(message: impl Into<String>) -> Self {
        Self::Lookup(message.into())
    }

    pub fn transform(message: impl Into<String>) -> Self {
        Self::Transform(message.into())
    }

    pub fn processing(codename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Processing {
            codename: codename.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// True for the subset of remote errors that a retrying caller
    /// should not treat as fatal to the whole run (§5, §9): rate limits
    /// and not-found lookups that a harness may choose to skip.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Remote(err) if err.is_not_found())
    }
}
