use async_trait::async_trait;
use equiwatch_core::EventNumber;
use time::OffsetDateTime;

use crate::error::Result;
use crate::types::{
    CheckHistoryRow, Event, NotificationLogRow, OpeningEventRow, QueueEntry, Subscription,
    UserProfile,
};

/// The storage contract every backend (in-memory, PostgreSQL) implements.
///
/// All operations are atomic with respect to concurrent callers; the
/// scheduler and the dispatch worker run as independent tasks and
/// communicate only through an implementation of this trait.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Creates the schema if absent and applies any outstanding idempotent
    /// migrations. Called once at startup before either task is spawned.
    async fn init_schema(&self) -> Result<()>;

    // ==================== Events ====================

    /// Inserts the event if absent, otherwise overwrites every non-key
    /// field with the given value — callers are expected to have already
    /// merged non-null scraped fields onto the prior row (spec §4.1: "only
    /// non-null provided fields overwrite"), so this call always carries a
    /// complete, already-merged `Event`. `opened_at` is the one exception:
    /// backends never clear a previously-set `opened_at` from a later
    /// write that doesn't explicitly carry a new one.
    async fn upsert_event(&self, event: &Event) -> Result<()>;

    async fn get_event(&self, numero: EventNumber) -> Result<Option<Event>>;

    /// Lists events matching the `is_open` flag — the scheduler polls with
    /// `is_open = false` to find events still worth watching.
    async fn list_events_where(&self, is_open: bool) -> Result<Vec<Event>>;

    async fn list_events_in_date_range(
        &self,
        from: OffsetDateTime,
        to: OffsetDateTime,
    ) -> Result<Vec<Event>>;

    /// Updates `status` and the derived `is_open` flag atomically, along
    /// with `opened_at` when transitioning into an open state.
    async fn set_event_status(
        &self,
        numero: EventNumber,
        status: equiwatch_core::EventStatus,
        is_open: bool,
        opened_at: Option<OffsetDateTime>,
    ) -> Result<()>;

    // ==================== Subscriptions ====================

    async fn subscribe(&self, user_id: &str, numero: EventNumber) -> Result<()>;

    async fn unsubscribe(&self, user_id: &str, numero: EventNumber) -> Result<()>;

    /// Subscriptions for `numero` where `notified = false`, joined with the
    /// subscriber's profile — the queue planner's input set.
    async fn list_subscribers_unnotified(
        &self,
        numero: EventNumber,
    ) -> Result<Vec<(Subscription, UserProfile)>>;

    /// Marks a subscription as notified (or resets it), per the
    /// `notified` lifecycle resolved in the notes on this crate.
    async fn set_subscription_notified(
        &self,
        user_id: &str,
        numero: EventNumber,
        notified: bool,
    ) -> Result<()>;

    /// Resets `notified = false` for every subscriber of `numero`. Called
    /// when an event transitions back to a closed state, so the next
    /// opening re-queues every subscriber (spec §4.7 invariant note: "reset
    /// `notified=false` only when the event transitions back to closed").
    async fn reset_subscriptions_notified(&self, numero: EventNumber) -> Result<()>;

    // ==================== Queue ====================

    async fn enqueue(&self, entry: &QueueEntry) -> Result<()>;

    /// Atomically claims up to `limit` due, unsent queue entries and marks
    /// them sent in the same operation, returning them joined against the
    /// owning subscriber's profile and the event. A claimed entry is never
    /// handed to two callers, and is never handed out twice.
    async fn claim_due_queue_entries(
        &self,
        now: OffsetDateTime,
        limit: u32,
    ) -> Result<Vec<(QueueEntry, UserProfile, Event)>>;

    /// Idempotent: marking an already-sent entry sent again is a no-op.
    async fn mark_entry_sent(&self, id: i64, sent_at: OffsetDateTime) -> Result<()>;

    // ==================== Audit trails ====================

    async fn record_check(&self, row: &CheckHistoryRow) -> Result<()>;

    async fn record_opening(&self, row: &OpeningEventRow) -> Result<()>;

    async fn record_notification(&self, row: &NotificationLogRow) -> Result<()>;
}
