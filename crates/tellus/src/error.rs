//! Error types for the terrain core.

use std::fmt;

/// Result type for terrain-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in terrain-core operations.
///
/// Scheduling anomalies (a delete task with no preceding build, a result for
/// a chunk that no longer exists) are not errors: they are contained where
/// they occur, logged, and degrade to stale terrain rather than propagate.
#[derive(Debug)]
pub enum Error {
    /// A settings value failed validation.
    InvalidSettings {
        /// The offending field.
        field: &'static str,
        /// Description of what was invalid.
        detail: String,
    },
    /// The OS refused to spawn a worker thread.
    WorkerSpawn {
        /// Index of the worker that failed to spawn.
        index: usize,
        /// The error message.
        message: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidSettings { field, detail } => {
                write!(f, "invalid setting {field}: {detail}")
            }
            Error::WorkerSpawn { index, message } => {
                write!(f, "failed to spawn worker {index}: {message}")
            }
        }
    }
}

impl std::error::Error for Error {}
