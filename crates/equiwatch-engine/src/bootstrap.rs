//! Wires configuration into concrete storage and notification adapters and
//! hands back the two long-lived tasks (scheduler, dispatch worker) ready
//! to be spawned.
//!
//! Grounded in the teacher's `ServerBuilder::build`/`AppState` assembly
//! shape (`octofhir_server::server`), narrowed to this system's two
//! background loops instead of an HTTP router.

use std::sync::Arc;
use std::time::Duration;

use equiwatch_config::AppConfig;
use equiwatch_notifications::{DispatchWorker, EmailAdapter, NotificationAdapter, PushAdapter};
use equiwatch_scraper::{RateLimiter, Scraper};
use equiwatch_storage::Repository;
use equiwatch_storage_memory::InMemoryRepository;
use equiwatch_storage_postgres::PostgresRepository;

use tracing::warn;

use crate::error::Result;
use crate::scheduler::PollingScheduler;

/// Either storage backend the engine can run against, enumerated so
/// `main.rs` picks one without the rest of the crate needing to be
/// generic over it.
pub enum AnyRepository {
    Memory(InMemoryRepository),
    Postgres(PostgresRepository),
}

#[async_trait::async_trait]
impl Repository for AnyRepository {
    async fn init_schema(&self) -> equiwatch_storage::Result<()> {
        match self {
            AnyRepository::Memory(r) => r.init_schema().await,
            AnyRepository::Postgres(r) => r.init_schema().await,
        }
    }

    async fn upsert_event(&self, event: &equiwatch_storage::Event) -> equiwatch_storage::Result<()> {
        match self {
            AnyRepository::Memory(r) => r.upsert_event(event).await,
            AnyRepository::Postgres(r) => r.upsert_event(event).await,
        }
    }

    async fn get_event(
        &self,
        numero: equiwatch_core::EventNumber,
    ) -> equiwatch_storage::Result<Option<equiwatch_storage::Event>> {
        match self {
            AnyRepository::Memory(r) => r.get_event(numero).await,
            AnyRepository::Postgres(r) => r.get_event(numero).await,
        }
    }

    async fn list_events_where(&self, is_open: bool) -> equiwatch_storage::Result<Vec<equiwatch_storage::Event>> {
        match self {
            AnyRepository::Memory(r) => r.list_events_where(is_open).await,
            AnyRepository::Postgres(r) => r.list_events_where(is_open).await,
        }
    }

    async fn list_events_in_date_range(
        &self,
        from: time::OffsetDateTime,
        to: time::OffsetDateTime,
    ) -> equiwatch_storage::Result<Vec<equiwatch_storage::Event>> {
        match self {
            AnyRepository::Memory(r) => r.list_events_in_date_range(from, to).await,
            AnyRepository::Postgres(r) => r.list_events_in_date_range(from, to).await,
        }
    }

    async fn set_event_status(
        &self,
        numero: equiwatch_core::EventNumber,
        status: equiwatch_core::EventStatus,
        is_open: bool,
        opened_at: Option<time::OffsetDateTime>,
    ) -> equiwatch_storage::Result<()> {
        match self {
            AnyRepository::Memory(r) => r.set_event_status(numero, status, is_open, opened_at).await,
            AnyRepository::Postgres(r) => r.set_event_status(numero, status, is_open, opened_at).await,
        }
    }

    async fn subscribe(&self, user_id: &str, numero: equiwatch_core::EventNumber) -> equiwatch_storage::Result<()> {
        match self {
            AnyRepository::Memory(r) => r.subscribe(user_id, numero).await,
            AnyRepository::Postgres(r) => r.subscribe(user_id, numero).await,
        }
    }

    async fn unsubscribe(&self, user_id: &str, numero: equiwatch_core::EventNumber) -> equiwatch_storage::Result<()> {
        match self {
            AnyRepository::Memory(r) => r.unsubscribe(user_id, numero).await,
            AnyRepository::Postgres(r) => r.unsubscribe(user_id, numero).await,
        }
    }

    async fn list_subscribers_unnotified(
        &self,
        numero: equiwatch_core::EventNumber,
    ) -> equiwatch_storage::Result<Vec<(equiwatch_storage::Subscription, equiwatch_storage::UserProfile)>> {
        match self {
            AnyRepository::Memory(r) => r.list_subscribers_unnotified(numero).await,
            AnyRepository::Postgres(r) => r.list_subscribers_unnotified(numero).await,
        }
    }

    async fn set_subscription_notified(
        &self,
        user_id: &str,
        numero: equiwatch_core::EventNumber,
        notified: bool,
    ) -> equiwatch_storage::Result<()> {
        match self {
            AnyRepository::Memory(r) => r.set_subscription_notified(user_id, numero, notified).await,
            AnyRepository::Postgres(r) => r.set_subscription_notified(user_id, numero, notified).await,
        }
    }

    async fn reset_subscriptions_notified(
        &self,
        numero: equiwatch_core::EventNumber,
    ) -> equiwatch_storage::Result<()> {
        match self {
            AnyRepository::Memory(r) => r.reset_subscriptions_notified(numero).await,
            AnyRepository::Postgres(r) => r.reset_subscriptions_notified(numero).await,
        }
    }

    async fn enqueue(&self, entry: &equiwatch_storage::QueueEntry) -> equiwatch_storage::Result<()> {
        match self {
            AnyRepository::Memory(r) => r.enqueue(entry).await,
            AnyRepository::Postgres(r) => r.enqueue(entry).await,
        }
    }

    async fn claim_due_queue_entries(
        &self,
        now: time::OffsetDateTime,
        limit: u32,
    ) -> equiwatch_storage::Result<
        Vec<(
            equiwatch_storage::QueueEntry,
            equiwatch_storage::UserProfile,
            equiwatch_storage::Event,
        )>,
    > {
        match self {
            AnyRepository::Memory(r) => r.claim_due_queue_entries(now, limit).await,
            AnyRepository::Postgres(r) => r.claim_due_queue_entries(now, limit).await,
        }
    }

    async fn mark_entry_sent(&self, id: i64, sent_at: time::OffsetDateTime) -> equiwatch_storage::Result<()> {
        match self {
            AnyRepository::Memory(r) => r.mark_entry_sent(id, sent_at).await,
            AnyRepository::Postgres(r) => r.mark_entry_sent(id, sent_at).await,
        }
    }

    async fn record_check(&self, row: &equiwatch_storage::CheckHistoryRow) -> equiwatch_storage::Result<()> {
        match self {
            AnyRepository::Memory(r) => r.record_check(row).await,
            AnyRepository::Postgres(r) => r.record_check(row).await,
        }
    }

    async fn record_opening(&self, row: &equiwatch_storage::OpeningEventRow) -> equiwatch_storage::Result<()> {
        match self {
            AnyRepository::Memory(r) => r.record_opening(row).await,
            AnyRepository::Postgres(r) => r.record_opening(row).await,
        }
    }

    async fn record_notification(&self, row: &equiwatch_storage::NotificationLogRow) -> equiwatch_storage::Result<()> {
        match self {
            AnyRepository::Memory(r) => r.record_notification(row).await,
            AnyRepository::Postgres(r) => r.record_notification(row).await,
        }
    }
}

/// Everything the binary needs to spawn the two background tasks.
pub struct Engine {
    pub repository: Arc<AnyRepository>,
    pub scheduler: PollingScheduler<AnyRepository>,
    pub dispatch_worker: DispatchWorker<AnyRepository>,
}

/// Builds the repository for `config.storage.backend`, then the scraper,
/// rate limiter, and channel adapters, and assembles the `Engine`.
pub async fn build(config: AppConfig) -> Result<Engine> {
    let repository = Arc::new(build_repository(&config).await?);
    repository.init_schema().await?;

    let scraper = Scraper::new(
        config.scraper.event_url_template.clone(),
        Duration::from_secs(config.scraper.request_timeout_secs),
    )?;
    let rate_limiter = RateLimiter::new(
        Duration::from_millis(config.scraper.min_interval_ms),
        config.scraper.max_requests_per_minute as usize,
    );

    let scheduler = PollingScheduler::new(repository.clone(), scraper, rate_limiter, config.clone());

    let push_adapter: Option<Arc<dyn NotificationAdapter>> =
        match (&config.notifications.app_id, &config.notifications.push_api_key) {
            (Some(app_id), Some(api_key)) => Some(Arc::new(PushAdapter::new(
                "https://onesignal.com/api/v1",
                app_id.clone(),
                api_key.clone(),
            )?) as Arc<dyn NotificationAdapter>),
            _ => {
                warn!("push notifications disabled: APP_ID/API_KEY not configured");
                None
            }
        };
    let email_adapter: Option<Arc<dyn NotificationAdapter>> = match &config.notifications.email_api_key {
        Some(api_key) => Some(Arc::new(EmailAdapter::new(
            "https://api.resend.com",
            api_key.clone(),
            config.notifications.from_address.clone(),
        )?) as Arc<dyn NotificationAdapter>),
        None => {
            warn!("email notifications disabled: API_KEY not configured");
            None
        }
    };

    let plan_delays = equiwatch_notifications::PlanDelays {
        free_secs: config.notifications.delay_free_secs,
        premium_secs: config.notifications.delay_premium_secs,
        pro_secs: config.notifications.delay_pro_secs,
    };

    let dispatch_worker = DispatchWorker::new(
        repository.clone(),
        push_adapter,
        email_adapter,
        config.scraper.event_url_template.clone(),
        Duration::from_secs(1),
        plan_delays,
    );

    Ok(Engine {
        repository,
        scheduler,
        dispatch_worker,
    })
}

async fn build_repository(config: &AppConfig) -> Result<AnyRepository> {
    match config.storage.backend.as_str() {
        "postgres" => {
            let database_url = config.storage.database_url.clone().unwrap_or_default();
            let pool_config = equiwatch_storage_postgres::PostgresConfig {
                url: database_url,
                pool_size: config.storage.pool_size,
            };
            let pool = equiwatch_storage_postgres::create_pool(&pool_config).await?;
            Ok(AnyRepository::Postgres(PostgresRepository::new(pool)))
        }
        _ => Ok(AnyRepository::Memory(InMemoryRepository::new())),
    }
}
