//! In-memory repository backend for the surveillance engine.
//!
//! Uses a lock-free `papaya::HashMap` for the hot paths (events,
//! subscriptions, profiles) the way `octofhir-db-memory::InMemoryStorage`
//! does, and a `tokio::sync::Mutex`-guarded `Vec` for the notification
//! queue, where claim ordering must be serialized across concurrent
//! callers. Intended for the engine's integration tests and for
//! `--storage memory` local demos — not a production backend.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use equiwatch_core::{EventNumber, EventStatus};
use equiwatch_storage::{
    CheckHistoryRow, Event, NotificationLogRow, OpeningEventRow, QueueEntry, Repository,
    RepositoryError, Result, Subscription, UserProfile,
};
use papaya::HashMap as PapayaHashMap;
use time::OffsetDateTime;
use tokio::sync::{Mutex, RwLock};

#[derive(Debug)]
pub struct InMemoryRepository {
    events: Arc<PapayaHashMap<i64, Event>>,
    subscriptions: Arc<PapayaHashMap<(String, i64), Subscription>>,
    profiles: Arc<PapayaHashMap<String, UserProfile>>,
    queue: Arc<Mutex<Vec<QueueEntry>>>,
    next_queue_id: AtomicI64,
    check_history: Arc<RwLock<Vec<CheckHistoryRow>>>,
    opening_events: Arc<RwLock<Vec<OpeningEventRow>>>,
    notification_log: Arc<RwLock<Vec<NotificationLogRow>>>,
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self {
            events: Arc::new(PapayaHashMap::new()),
            subscriptions: Arc::new(PapayaHashMap::new()),
            profiles: Arc::new(PapayaHashMap::new()),
            queue: Arc::new(Mutex::new(Vec::new())),
            next_queue_id: AtomicI64::new(1),
            check_history: Arc::new(RwLock::new(Vec::new())),
            opening_events: Arc::new(RwLock::new(Vec::new())),
            notification_log: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Seeds a user profile. Not part of the `Repository` contract: user
    /// profile management belongs to the out-of-scope CRUD layer, but
    /// tests and local demos need some way to populate profiles.
    pub fn seed_user_profile(&self, profile: UserProfile) {
        self.profiles.pin().insert(profile.user_id.clone(), profile);
    }

    fn next_id(&self) -> i64 {
        self.next_queue_id.fetch_add(1, Ordering::SeqCst)
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn init_schema(&self) -> Result<()> {
        // Nothing to create: the backing maps are already live.
        Ok(())
    }

    async fn upsert_event(&self, event: &Event) -> Result<()> {
        self.events.pin().insert(event.numero.get(), event.clone());
        Ok(())
    }

    async fn get_event(&self, numero: EventNumber) -> Result<Option<Event>> {
        Ok(self.events.pin().get(&numero.get()).cloned())
    }

    async fn list_events_where(&self, is_open: bool) -> Result<Vec<Event>> {
        Ok(self
            .events
            .pin()
            .values()
            .filter(|e| e.is_open == is_open)
            .cloned()
            .collect())
    }

    async fn list_events_in_date_range(
        &self,
        from: OffsetDateTime,
        to: OffsetDateTime,
    ) -> Result<Vec<Event>> {
        // start_date is normalized to "YYYY-MM-DD" by the scraper, so plain
        // string comparison sorts identically to chronological order.
        let from_str = from.date().to_string();
        let to_str = to.date().to_string();
        Ok(self
            .events
            .pin()
            .values()
            .filter(|e| {
                e.start_date
                    .as_deref()
                    .map(|d| d >= from_str.as_str() && d <= to_str.as_str())
                    .unwrap_or(false)
            })
            .cloned()
            .collect())
    }

    async fn set_event_status(
        &self,
        numero: EventNumber,
        status: EventStatus,
        is_open: bool,
        opened_at: Option<OffsetDateTime>,
    ) -> Result<()> {
        let guard = self.events.pin();
        let Some(existing) = guard.get(&numero.get()).cloned() else {
            return Err(RepositoryError::EventNotFound(numero));
        };
        let mut updated = existing;
        updated.status = status;
        updated.is_open = is_open;
        if opened_at.is_some() {
            updated.opened_at = opened_at;
        }
        guard.insert(numero.get(), updated);
        Ok(())
    }

    async fn subscribe(&self, user_id: &str, numero: EventNumber) -> Result<()> {
        let key = (user_id.to_string(), numero.get());
        let guard = self.subscriptions.pin();
        if guard.get(&key).is_none() {
            guard.insert(
                key,
                Subscription {
                    user_id: user_id.to_string(),
                    numero,
                    notified: false,
                    created_at: OffsetDateTime::now_utc(),
                },
            );
        }
        Ok(())
    }

    async fn unsubscribe(&self, user_id: &str, numero: EventNumber) -> Result<()> {
        self.subscriptions
            .pin()
            .remove(&(user_id.to_string(), numero.get()));
        Ok(())
    }

    async fn list_subscribers_unnotified(
        &self,
        numero: EventNumber,
    ) -> Result<Vec<(Subscription, UserProfile)>> {
        let profiles = self.profiles.pin();
        Ok(self
            .subscriptions
            .pin()
            .iter()
            .filter(|((_, n), sub)| *n == numero.get() && !sub.notified)
            .filter_map(|(_, sub)| {
                profiles
                    .get(&sub.user_id)
                    .cloned()
                    .map(|profile| (sub.clone(), profile))
            })
            .collect())
    }

    async fn set_subscription_notified(
        &self,
        user_id: &str,
        numero: EventNumber,
        notified: bool,
    ) -> Result<()> {
        let key = (user_id.to_string(), numero.get());
        let guard = self.subscriptions.pin();
        let Some(existing) = guard.get(&key).cloned() else {
            return Err(RepositoryError::SubscriptionNotFound {
                user_id: user_id.to_string(),
                numero,
            });
        };
        let mut updated = existing;
        updated.notified = notified;
        guard.insert(key, updated);
        Ok(())
    }

    async fn reset_subscriptions_notified(&self, numero: EventNumber) -> Result<()> {
        let guard = self.subscriptions.pin();
        let to_reset: Vec<Subscription> = guard
            .iter()
            .filter(|((_, n), sub)| *n == numero.get() && sub.notified)
            .map(|(_, sub)| sub.clone())
            .collect();
        for mut sub in to_reset {
            sub.notified = false;
            guard.insert((sub.user_id.clone(), numero.get()), sub);
        }
        Ok(())
    }

    async fn enqueue(&self, entry: &QueueEntry) -> Result<()> {
        let mut entry = entry.clone();
        if entry.id == 0 {
            entry.id = self.next_id();
        }
        self.queue.lock().await.push(entry);
        Ok(())
    }

    async fn claim_due_queue_entries(
        &self,
        now: OffsetDateTime,
        limit: u32,
    ) -> Result<Vec<(QueueEntry, UserProfile, Event)>> {
        let mut queue = self.queue.lock().await;
        let profiles = self.profiles.pin();
        let events = self.events.pin();

        // Due candidates are claimed `send_at` ascending, matching the
        // Postgres backend's `ORDER BY send_at ASC` (spec §5: "Dispatch
        // ordering is by `send_at` ascending within each claim batch").
        let mut due: Vec<usize> = queue
            .iter()
            .enumerate()
            .filter(|(_, entry)| !entry.sent && entry.send_at <= now)
            .map(|(i, _)| i)
            .collect();
        due.sort_by_key(|&i| queue[i].send_at);
        due.truncate(limit as usize);

        let mut claimed = Vec::new();
        for i in due {
            let entry = &mut queue[i];
            entry.sent = true;
            entry.sent_at = Some(now);
            let Some(profile) = profiles.get(&entry.user_id).cloned() else {
                continue;
            };
            let Some(event) = events.get(&entry.numero.get()).cloned() else {
                continue;
            };
            claimed.push((entry.clone(), profile, event));
        }
        Ok(claimed)
    }

    async fn mark_entry_sent(&self, id: i64, sent_at: OffsetDateTime) -> Result<()> {
        let mut queue = self.queue.lock().await;
        let Some(entry) = queue.iter_mut().find(|e| e.id == id) else {
            return Err(RepositoryError::QueueEntryNotFound(id));
        };
        if !entry.sent {
            entry.sent = true;
            entry.sent_at = Some(sent_at);
        }
        Ok(())
    }

    async fn record_check(&self, row: &CheckHistoryRow) -> Result<()> {
        self.check_history.write().await.push(row.clone());
        Ok(())
    }

    async fn record_opening(&self, row: &OpeningEventRow) -> Result<()> {
        self.opening_events.write().await.push(row.clone());
        Ok(())
    }

    async fn record_notification(&self, row: &NotificationLogRow) -> Result<()> {
        self.notification_log.write().await.push(row.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use equiwatch_core::Plan;

    fn sample_event(numero: i64) -> Event {
        Event::new_unseen(EventNumber::new(numero).unwrap())
    }

    #[tokio::test]
    async fn upsert_then_get_round_trips() {
        let repo = InMemoryRepository::new();
        let event = sample_event(123456);
        repo.upsert_event(&event).await.unwrap();
        let fetched = repo.get_event(event.numero).await.unwrap().unwrap();
        assert_eq!(fetched.numero, event.numero);
    }

    #[tokio::test]
    async fn claim_marks_entries_sent_and_is_limit_bounded() {
        let repo = InMemoryRepository::new();
        let numero = EventNumber::new(1).unwrap();
        repo.upsert_event(&sample_event(1)).await.unwrap();
        repo.seed_user_profile(UserProfile {
            user_id: "u1".into(),
            email: "u1@example.com".into(),
            plan: Plan::Pro,
            push_token: None,
            push_enabled: false,
            email_enabled: true,
        });

        let now = OffsetDateTime::now_utc();
        for i in 0..3 {
            repo.enqueue(&QueueEntry {
                id: 0,
                user_id: "u1".into(),
                numero,
                plan: Plan::Pro,
                send_at: now - time::Duration::seconds(i),
                sent: false,
                sent_at: None,
            })
            .await
            .unwrap();
        }

        let claimed = repo.claim_due_queue_entries(now, 2).await.unwrap();
        assert_eq!(claimed.len(), 2);

        let remaining = repo.claim_due_queue_entries(now, 10).await.unwrap();
        assert_eq!(remaining.len(), 1);
    }

    #[tokio::test]
    async fn set_event_status_requires_existing_event() {
        let repo = InMemoryRepository::new();
        let numero = EventNumber::new(42).unwrap();
        let err = repo
            .set_event_status(numero, EventStatus::Engagement, true, None)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::EventNotFound(_)));
    }
}
