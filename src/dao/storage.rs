use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The requested record does not exist.
    #[error("{entity} `{key}` not found")]
    NotFound {
        /// Kind of record looked up.
        entity: &'static str,
        /// Key it was looked up by.
        key: String,
    },
    /// The backend could not be reached or failed while serving the request.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// What the backend was doing.
        message: String,
        /// Backend failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl StorageError {
    /// Construct a not-found error for the given entity kind and key.
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        StorageError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }

    /// Whether this error reports a missing record rather than a backend failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }
}
