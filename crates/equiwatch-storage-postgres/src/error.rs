use equiwatch_storage::RepositoryError;

/// Errors specific to the PostgreSQL repository backend.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    #[error("database connection error: {0}")]
    Connection(#[from] sqlx_core::error::Error),

    #[error("configuration error: {message}")]
    Config { message: String },
}

impl PostgresError {
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

impl From<PostgresError> for RepositoryError {
    fn from(err: PostgresError) -> Self {
        match err {
            PostgresError::Connection(e) => RepositoryError::Backend(e.to_string()),
            PostgresError::Config { message } => RepositoryError::Backend(message),
        }
    }
}

pub type Result<T> = std::result::Result<T, PostgresError>;
