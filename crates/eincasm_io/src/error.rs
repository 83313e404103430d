//! Failures while writing, reading or restoring snapshots.

use eincasm_core::SimError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IoError {
    /// A value could not be turned into snapshot JSON, or back.
    #[error("cannot encode snapshot data: {0}")]
    Serialization(String),

    #[error("snapshot file access failed: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("malformed snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The gzip stream was truncated or is not gzip at all.
    #[error("snapshot is not a valid gzip stream: {0}")]
    Compression(String),

    /// Snapshot contents disagree with themselves or with the target simulation.
    #[error("snapshot rejected: {0}")]
    Validation(String),

    #[error("no snapshot at {0}")]
    NotFound(String),

    #[error("snapshot checksum is {actual}, header says {expected}")]
    Checksum { expected: String, actual: String },

    /// The engine refused the restored channel table or memory.
    #[error("simulation refused snapshot: {0}")]
    Simulation(#[from] SimError),

    #[error("{context}: {source}")]
    Context {
        context: String,
        source: Box<IoError>,
    },
}

pub type Result<T> = std::result::Result<T, IoError>;

impl IoError {
    #[must_use]
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    #[must_use]
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    #[must_use]
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    #[must_use]
    pub fn compression(msg: impl Into<String>) -> Self {
        Self::Compression(msg.into())
    }

    #[must_use]
    pub fn checksum(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::Checksum {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Prefixes the error with what was being done, e.g. the snapshot path.
    #[must_use]
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Whether the file was readable but its contents cannot be trusted.
    #[must_use]
    pub fn is_corrupt(&self) -> bool {
        match self {
            Self::Json(_) | Self::Compression(_) | Self::Checksum { .. } | Self::Validation(_) => {
                true
            }
            Self::Context { source, .. } => source.is_corrupt(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_message_names_both_digests() {
        let err = IoError::checksum("ab", "cd");
        assert_eq!(err.to_string(), "snapshot checksum is cd, header says ab");
    }

    #[test]
    fn test_context_wraps_path() {
        let err = IoError::not_found("run.snap.gz").with_context("loading snapshot");
        assert_eq!(err.to_string(), "loading snapshot: no snapshot at run.snap.gz");
    }

    #[test]
    fn test_corruption_classification() {
        assert!(IoError::checksum("a", "b").is_corrupt());
        assert!(IoError::compression("eof").with_context("x").is_corrupt());
        assert!(!IoError::not_found("x").is_corrupt());
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(!IoError::from(io).is_corrupt());
    }

    #[test]
    fn test_engine_errors_convert() {
        let err: IoError = SimError::lookup("capital").into();
        assert!(matches!(err, IoError::Simulation(SimError::Lookup(_))));
        assert!(!err.is_corrupt());
    }
}
