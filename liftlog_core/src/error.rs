//! Error types for the liftlog_core library.

use crate::WorkoutId;
use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for liftlog_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Parallel request arrays disagree in length, or hold fewer entries than `sets`
    #[error("Shape error: {0}")]
    Shape(String),

    /// A request value is out of its allowed range
    #[error("Validation error: {0}")]
    Validation(String),

    /// The resource exists but is not owned by the requester / target workout
    #[error("Ownership error: {0}")]
    Ownership(String),

    /// The requested id does not resolve
    #[error("Not found: {0}")]
    NotFound(String),

    /// One or more planned writes failed mid-batch
    #[error(
        "Incomplete reconciliation of workout {workout}: {applied} of {planned} writes applied \
         (rolled back: {rolled_back}): {reason}"
    )]
    IncompleteReconciliation {
        workout: WorkoutId,
        applied: usize,
        planned: usize,
        rolled_back: bool,
        reason: String,
    },

    /// An internal consistency rule would be broken
    #[error("Invariant violated: {0}")]
    Invariant(String),

    /// A record changed since it was read
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Store or lock failure
    #[error("State error: {0}")]
    State(String),
}

impl Error {
    /// True for errors that outer surfaces report as "not found".
    ///
    /// Ownership failures count too, so callers cannot discover the
    /// existence of other users' workouts.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_) | Error::Ownership(_))
    }

    /// Rewrite ownership failures as plain not-found errors.
    pub fn into_public(self) -> Self {
        match self {
            Error::Ownership(_) => Error::NotFound("the requested resource was not found".into()),
            other => other,
        }
    }
}
