use thiserror::Error;

/// Shared error type for domain-level validation failures.
///
/// Component crates (`equiwatch-storage`, `equiwatch-scraper`,
/// `equiwatch-notifications`) define their own narrower error enums for
/// their own fallible operations; this type covers only the primitives
/// defined in this crate (event numbers, status parsing, plans).
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid event number: {0}")]
    InvalidEventNumber(i64),

    #[error("invalid event status: {0}")]
    InvalidStatus(String),

    #[error("invalid plan: {0}")]
    InvalidPlan(String),

    #[error("invalid notification channel: {0}")]
    InvalidChannel(String),

    #[error("time parsing error: {0}")]
    TimeError(#[from] time::error::Parse),

    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
