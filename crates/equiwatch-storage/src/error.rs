use thiserror::Error;

/// Errors surfaced by `Repository` implementations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("event not found: {0}")]
    EventNotFound(equiwatch_core::EventNumber),

    #[error("subscription not found: user={user_id} event={numero}")]
    SubscriptionNotFound {
        user_id: String,
        numero: equiwatch_core::EventNumber,
    },

    #[error("queue entry not found: {0}")]
    QueueEntryNotFound(i64),

    #[error("schema migration failed: {0}")]
    Migration(String),

    #[error("backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, RepositoryError>;
