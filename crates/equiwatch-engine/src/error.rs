use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Repository(#[from] equiwatch_storage::RepositoryError),

    #[error(transparent)]
    Scraper(#[from] equiwatch_scraper::ScraperError),

    #[error(transparent)]
    Config(#[from] equiwatch_config::ConfigError),

    #[error(transparent)]
    Notifications(#[from] equiwatch_notifications::NotificationError),

    #[error("postgres storage error: {0}")]
    Postgres(String),
}

impl From<equiwatch_storage_postgres::PostgresError> for EngineError {
    fn from(err: equiwatch_storage_postgres::PostgresError) -> Self {
        EngineError::Postgres(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
