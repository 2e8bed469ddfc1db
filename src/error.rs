use std::io;
use std::path::PathBuf;

/// Errors raised by the tracking engine
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// A ticket with this id already exists.
    #[error("ticket with id {0} already exists")]
    DuplicateId(String),

    /// Start was called on an account that is already accruing.
    #[error("time account is already running")]
    AlreadyRunning,

    /// The addressed ticket or todo does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The supplied ticket id is empty after trimming.
    #[error("invalid ticket id: {0:?}")]
    InvalidId(String),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Errors raised while reading or writing the state file
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The state file exists but is not a valid document.
    #[error("malformed state file {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl PersistenceError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            TrackerError::DuplicateId("A".to_string()).to_string(),
            "ticket with id A already exists"
        );
        let err = PersistenceError::io("/tmp/x.json", io::Error::new(io::ErrorKind::Other, "boom"));
        assert_eq!(err.to_string(), "I/O error on /tmp/x.json: boom");
        let wrapped: TrackerError = err.into();
        assert!(matches!(wrapped, TrackerError::Persistence(_)));
    }
}
