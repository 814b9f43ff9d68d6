pub mod error;
mod extract;
pub mod rate_limiter;
mod scraper;
pub mod snapshot;

pub use error::{Result, ScraperError};
pub use rate_limiter::RateLimiter;
pub use scraper::Scraper;
pub use snapshot::{FetchOutcome, Snapshot};
