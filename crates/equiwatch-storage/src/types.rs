use equiwatch_core::{EventNumber, EventStatus, NotificationChannel, Plan};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A watched event page and the last snapshot the scraper took of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub numero: EventNumber,
    pub name: Option<String>,
    pub venue: Option<String>,
    pub organisateur: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub discipline: Option<String>,
    pub status: EventStatus,
    pub is_open: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_checked_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub opened_at: Option<OffsetDateTime>,
}

impl Event {
    /// A freshly-seen event with no scraped data yet, as created on first
    /// subscription (spec §3: "created on first subscription").
    pub fn new_unseen(numero: EventNumber) -> Self {
        Self {
            numero,
            name: None,
            venue: None,
            organisateur: None,
            start_date: None,
            end_date: None,
            discipline: None,
            status: EventStatus::Previsional,
            is_open: false,
            last_checked_at: None,
            opened_at: None,
        }
    }
}

/// A (user, event) subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub user_id: String,
    pub numero: EventNumber,
    pub notified: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Read-only user profile consumed by the dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub email: String,
    pub plan: Plan,
    pub push_token: Option<String>,
    pub push_enabled: bool,
    pub email_enabled: bool,
}

/// A pending, plan-delayed notification for one (user, event) opening.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: i64,
    pub user_id: String,
    pub numero: EventNumber,
    pub plan: Plan,
    #[serde(with = "time::serde::rfc3339")]
    pub send_at: OffsetDateTime,
    pub sent: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub sent_at: Option<OffsetDateTime>,
}

/// A single poll's outcome, appended for audit (spec §3 "Check history").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckHistoryRow {
    pub numero: EventNumber,
    #[serde(with = "time::serde::rfc3339")]
    pub checked_at: OffsetDateTime,
    pub status_before: EventStatus,
    pub status_after: EventStatus,
    pub response_time_ms: u64,
    pub success: bool,
}

/// One `closed -> open` transition, appended for audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpeningEventRow {
    pub numero: EventNumber,
    #[serde(with = "time::serde::rfc3339")]
    pub opened_at: OffsetDateTime,
    pub status: EventStatus,
    #[serde(with = "time::serde::rfc3339::option")]
    pub notification_sent_at: Option<OffsetDateTime>,
}

/// One delivered (or attempted) notification, appended for audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationLogRow {
    pub user_id: String,
    pub numero: EventNumber,
    pub channel: NotificationChannel,
    pub plan: Plan,
    pub delay_seconds: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub sent_at: OffsetDateTime,
}
