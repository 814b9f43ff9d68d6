use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("invalid adapter configuration: {0}")]
    InvalidConfig(String),

    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("template not found: {0}")]
    TemplateNotFound(String),

    #[error("failed to build http client: {0}")]
    ClientBuild(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, NotificationError>;
