/// Result type for service store operations
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Error type for service store operations
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// A required field is missing from the request; the store was not touched.
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    /// The environment already has a build in progress.
    #[error("could not create environment build: service in progress")]
    Conflict,
    /// The stored environment status is outside the known vocabulary.
    #[error("could not create environment build: unknown service state {0:?}")]
    InvalidState(String),
    #[error("malformed payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("could not encode reply: {0}")]
    Encode(serde_json::Error),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_errors_keep_their_messages() {
        assert_eq!(
            ServiceError::Conflict.to_string(),
            "could not create environment build: service in progress"
        );
        assert_eq!(
            ServiceError::InvalidState("paused".to_string()).to_string(),
            "could not create environment build: unknown service state \"paused\""
        );
    }

    #[test]
    fn store_errors_convert() {
        let err: ServiceError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, ServiceError::Database(sqlx::Error::RowNotFound)));
    }
}
