pub mod adapters;
pub mod admin;
pub mod dispatch;
pub mod error;
pub mod templates;
pub mod types;

pub use adapters::{EmailAdapter, NotificationAdapter, PushAdapter};
pub use admin::{send_test_notification, AdminTestOutcome};
pub use dispatch::DispatchWorker;
pub use error::{NotificationError, Result};
pub use templates::{Template, TemplateRenderer};
pub use types::{NotificationTarget, PlanDelays, RenderedContent, SendResult};
