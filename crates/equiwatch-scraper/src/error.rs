use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("failed to build http client: {0}")]
    ClientBuild(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, ScraperError>;
