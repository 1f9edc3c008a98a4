//! Error types for the experiment catalog
//!
//! "Not found" is never an error: lookups return `Ok(None)`. Everything
//! here is either a store failure (propagated unchanged) or a problem with
//! the data or arguments handed to the catalog.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Experiment catalog error types
#[derive(Error, Debug)]
pub enum Error {
    /// Store communication failed (connectivity, protocol)
    #[error("Store error: {0}")]
    Store(String),

    /// Key holds a value of another type
    #[error("Wrong type for key '{key}': expected {expected}")]
    WrongType {
        /// Offending key
        key: String,
        /// Type the operation required
        expected: &'static str,
    },

    /// Registry entry exists but its config cannot be hydrated
    #[error("Experiment '{name}' cannot be loaded: {reason}")]
    CorruptExperiment {
        /// Experiment name
        name: String,
        /// What was wrong with the stored config
        reason: String,
    },

    /// Experiment descriptor cannot be normalized
    #[error("Invalid experiment descriptor: {0}")]
    InvalidDescriptor(String),

    /// Experiment precondition failed (e.g. saving with no alternatives)
    #[error("Invalid experiment: {0}")]
    InvalidExperiment(String),

    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error means "the registry entry did not resolve to a
    /// usable experiment", as opposed to a store failure.
    ///
    /// `Catalog::all` skips entries failing this way.
    #[must_use]
    pub const fn is_resolution_failure(&self) -> bool {
        matches!(self, Self::CorruptExperiment { .. } | Self::WrongType { .. })
    }
}
