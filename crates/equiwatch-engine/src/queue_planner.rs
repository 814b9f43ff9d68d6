//! Turns an `Opened` transition into per-subscriber queue rows.
//!
//! Grounded in `NotificationDispatcher.queue_notifications_for_concours`:
//! load every subscriber who hasn't yet been notified for this opening,
//! compute a plan-delayed `send_at`, enqueue it, and flip `notified` so a
//! later poll doesn't double-queue the same subscriber for the same
//! opening (spec §4.7).

use equiwatch_core::EventNumber;
use equiwatch_storage::{QueueEntry, Repository};
use time::OffsetDateTime;
use tracing::{info, warn};

pub struct QueuePlanner<'a, R: Repository> {
    repository: &'a R,
    config: &'a equiwatch_config::AppConfig,
}

impl<'a, R: Repository> QueuePlanner<'a, R> {
    pub fn new(repository: &'a R, config: &'a equiwatch_config::AppConfig) -> Self {
        Self { repository, config }
    }

    /// Enqueues one delayed notification per unnotified subscriber of
    /// `numero`, anchored at `opened_at`.
    pub async fn plan_for_opening(
        &self,
        numero: EventNumber,
        opened_at: OffsetDateTime,
    ) -> equiwatch_storage::Result<u32> {
        let subscribers = self.repository.list_subscribers_unnotified(numero).await?;
        let mut queued = 0;

        for (subscription, profile) in subscribers {
            let delay = self.config.delay_secs_for(profile.plan);
            let send_at = opened_at + time::Duration::seconds(delay as i64);

            let entry = QueueEntry {
                id: 0,
                user_id: subscription.user_id.clone(),
                numero,
                plan: profile.plan,
                send_at,
                sent: false,
                sent_at: None,
            };

            if let Err(err) = self.repository.enqueue(&entry).await {
                warn!(user_id = %subscription.user_id, numero = numero.get(), error = %err, "failed to enqueue opening notification");
                continue;
            }
            self.repository
                .set_subscription_notified(&subscription.user_id, numero, true)
                .await?;
            queued += 1;
        }

        if queued > 0 {
            info!(numero = numero.get(), queued, "planned opening notifications");
        }
        Ok(queued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use equiwatch_config::AppConfig;
    use equiwatch_storage_memory::InMemoryRepository;

    #[tokio::test]
    async fn queues_one_entry_per_unnotified_subscriber() {
        let repo = InMemoryRepository::new();
        let numero = EventNumber::new(123456).unwrap();
        repo.upsert_event(&equiwatch_storage::Event::new_unseen(numero)).await.unwrap();
        repo.seed_user_profile(equiwatch_storage::UserProfile {
            user_id: "u1".into(),
            email: "u1@example.com".into(),
            plan: equiwatch_core::Plan::Pro,
            push_token: Some("tok".into()),
            push_enabled: true,
            email_enabled: true,
        });
        repo.subscribe("u1", numero).await.unwrap();

        let config = AppConfig::default();
        let planner = QueuePlanner::new(&repo, &config);
        let now = OffsetDateTime::now_utc();
        let queued = planner.plan_for_opening(numero, now).await.unwrap();
        assert_eq!(queued, 1);

        let remaining = repo.list_subscribers_unnotified(numero).await.unwrap();
        assert!(remaining.is_empty());
    }
}
