pub mod email;
pub mod push;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{NotificationTarget, RenderedContent, SendResult};

/// A single outbound delivery channel.
#[async_trait]
pub trait NotificationAdapter: Send + Sync {
    async fn send(
        &self,
        target: &NotificationTarget,
        content: &RenderedContent,
    ) -> Result<SendResult>;

    /// Sends a harmless test message to `target`, independent of any real
    /// opening. Backs the admin `/test-push`-style path spec §7 describes
    /// for surfacing a stale-token detail so the user can re-subscribe;
    /// the HTTP route itself is out of scope (CRUD/admin APIs, spec §1).
    async fn send_test(&self, target: &NotificationTarget) -> Result<SendResult>;
}

pub use email::EmailAdapter;
pub use push::PushAdapter;
