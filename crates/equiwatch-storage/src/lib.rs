pub mod error;
pub mod traits;
pub mod types;

pub use error::{RepositoryError, Result};
pub use traits::Repository;
pub use types::{
    CheckHistoryRow, Event, NotificationLogRow, OpeningEventRow, QueueEntry, Subscription,
    UserProfile,
};
