//! Polling scheduler: the tick loop that watches every tracked, still-closed
//! event and reacts to openings.
//!
//! Task-spawn/shutdown shape grounded in the teacher's
//! `CronScheduler::start` (`watch::Sender<bool>`, `tokio::select!` between
//! `interval.tick()` and `shutdown_rx.changed()`), generalized from
//! cron-triggered to fixed-interval triggered since this system has no
//! cron concept. The per-tick procedure (rate-limit, scrape, record,
//! merge, detect, act) is grounded directly in
//! `SurveillanceService._check_all_concours`/`_check_concours_scraper`.

use std::sync::Arc;
use std::time::Duration;

use equiwatch_config::AppConfig;
use equiwatch_core::EventNumber;
use equiwatch_scraper::{RateLimiter, Scraper};
use equiwatch_storage::{CheckHistoryRow, OpeningEventRow, Repository};
use time::OffsetDateTime;
use tracing::{debug, error, info, warn};

use crate::queue_planner::QueuePlanner;
use crate::transition;

pub struct PollingScheduler<R: Repository> {
    repository: Arc<R>,
    scraper: Scraper,
    rate_limiter: RateLimiter,
    config: AppConfig,
}

impl<R: Repository> PollingScheduler<R> {
    pub fn new(repository: Arc<R>, scraper: Scraper, rate_limiter: RateLimiter, config: AppConfig) -> Self {
        Self {
            repository,
            scraper,
            rate_limiter,
            config,
        }
    }

    /// Runs the tick loop until `shutdown` resolves. A consecutive run of
    /// `consecutive_failure_threshold` whole-tick failures triggers a
    /// `failure_backoff_secs` pause before resuming at the normal cadence
    /// (spec §4.6: "3 consecutive tick-level failures trigger a 60s
    /// backoff and reset").
    pub async fn run(&self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(Duration::from_secs(self.config.scheduler.check_interval_secs));
        let mut consecutive_failures = 0u32;

        info!(
            check_interval_secs = self.config.scheduler.check_interval_secs,
            "polling scheduler started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.tick().await {
                        Ok(()) => {
                            consecutive_failures = 0;
                        }
                        Err(err) => {
                            consecutive_failures += 1;
                            error!(error = %err, consecutive_failures, "scheduler tick failed");
                            if consecutive_failures >= self.config.scheduler.consecutive_failure_threshold {
                                warn!(
                                    backoff_secs = self.config.scheduler.failure_backoff_secs,
                                    "too many consecutive tick failures, backing off"
                                );
                                tokio::time::sleep(Duration::from_secs(self.config.scheduler.failure_backoff_secs)).await;
                                consecutive_failures = 0;
                            }
                        }
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("polling scheduler shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// One full sweep of every tracked, closed event.
    async fn tick(&self) -> crate::error::Result<()> {
        let events = self.repository.list_events_where(false).await?;
        for event in events {
            if let Err(err) = self.check_one(event.numero).await {
                warn!(numero = event.numero.get(), error = %err, "per-event check failed");
            }
            tokio::time::sleep(Duration::from_millis(self.config.scheduler.inter_event_delay_ms)).await;
        }
        Ok(())
    }

    async fn check_one(&self, numero: EventNumber) -> crate::error::Result<()> {
        self.rate_limiter.acquire().await;

        let Some(pre) = self.repository.get_event(numero).await? else {
            return Ok(());
        };

        let started = OffsetDateTime::now_utc();
        let outcome = self.scraper.fetch(numero).await;
        let response_time_ms = (OffsetDateTime::now_utc() - started).whole_milliseconds().max(0) as u64;
        let snapshot = outcome.snapshot;

        let now = OffsetDateTime::now_utc();

        self.repository
            .record_check(&CheckHistoryRow {
                numero,
                checked_at: now,
                status_before: pre.status,
                status_after: snapshot.status,
                response_time_ms,
                success: outcome.success,
            })
            .await?;

        if !outcome.success {
            return Ok(());
        }

        let transition = transition::detect(pre.status, pre.is_open, snapshot.status);

        let mut updated = pre.clone();
        if let Some(name) = snapshot.name {
            updated.name = Some(name);
        }
        if let Some(venue) = snapshot.venue {
            updated.venue = Some(venue);
        }
        if let Some(organisateur) = snapshot.organisateur {
            updated.organisateur = Some(organisateur);
        }
        if let Some(start_date) = snapshot.start_date {
            updated.start_date = Some(start_date);
        }
        if let Some(end_date) = snapshot.end_date {
            updated.end_date = Some(end_date);
        }
        if let Some(discipline) = snapshot.discipline {
            updated.discipline = Some(discipline);
        }
        updated.last_checked_at = Some(now);

        match transition {
            equiwatch_core::Transition::Opened => {
                updated.status = snapshot.status;
                updated.is_open = true;
                updated.opened_at = Some(now);
                self.repository.upsert_event(&updated).await?;
                self.repository
                    .set_event_status(numero, snapshot.status, true, Some(now))
                    .await?;

                let planner = QueuePlanner::new(self.repository.as_ref(), &self.config);
                let queued = planner.plan_for_opening(numero, now).await?;

                self.repository
                    .record_opening(&OpeningEventRow {
                        numero,
                        opened_at: now,
                        status: snapshot.status,
                        notification_sent_at: None,
                    })
                    .await?;

                info!(numero = numero.get(), queued, "event opened, notifications queued");
            }
            equiwatch_core::Transition::StatusChanged => {
                updated.status = snapshot.status;
                updated.is_open = snapshot.status.is_open();
                self.repository.upsert_event(&updated).await?;
                self.repository
                    .set_event_status(numero, snapshot.status, updated.is_open, None)
                    .await?;
                if pre.is_open && !updated.is_open {
                    // Re-closed: reset every subscriber's `notified` flag so
                    // the next opening re-queues them (spec §4.7 notes).
                    self.repository.reset_subscriptions_notified(numero).await?;
                }
                debug!(numero = numero.get(), status = %snapshot.status, "event status changed");
            }
            equiwatch_core::Transition::NoChange => {
                self.repository.upsert_event(&updated).await?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use equiwatch_core::Plan;
    use equiwatch_storage::{Event, Repository, UserProfile};
    use equiwatch_storage_memory::InMemoryRepository;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn numero(n: i64) -> EventNumber {
        EventNumber::new(n).unwrap()
    }

    async fn scheduler_against(
        mock_server: &MockServer,
        repository: Arc<InMemoryRepository>,
    ) -> PollingScheduler<InMemoryRepository> {
        let mut config = AppConfig::default();
        config.scraper.event_url_template = format!("{}/concours/{{numero}}", mock_server.uri());
        let scraper = Scraper::new(config.scraper.event_url_template.clone(), Duration::from_secs(5)).unwrap();
        let rate_limiter = RateLimiter::new(Duration::from_millis(1), 1_000);
        PollingScheduler::new(repository, scraper, rate_limiter, config)
    }

    #[tokio::test]
    async fn opening_enqueues_one_notification_per_subscriber() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/concours/123456"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<title>Fiche Concours - PARIS</title>Grand Prix de Paris Organisé par Club \
                 Ouvert aux engagements 05/06/2026 07/06/2026",
            ))
            .mount(&mock_server)
            .await;

        let repository = Arc::new(InMemoryRepository::new());
        repository.upsert_event(&Event::new_unseen(numero(123456))).await.unwrap();
        repository.seed_user_profile(UserProfile {
            user_id: "u1".into(),
            email: "u1@example.com".into(),
            plan: Plan::Pro,
            push_token: Some("tok".into()),
            push_enabled: true,
            email_enabled: false,
        });
        repository.subscribe("u1", numero(123456)).await.unwrap();

        let scheduler = scheduler_against(&mock_server, repository.clone()).await;
        scheduler.check_one(numero(123456)).await.unwrap();

        let event = repository.get_event(numero(123456)).await.unwrap().unwrap();
        assert!(event.is_open);
        assert_eq!(event.status, equiwatch_core::EventStatus::Engagement);
        assert!(event.opened_at.is_some());

        let remaining = repository.list_subscribers_unnotified(numero(123456)).await.unwrap();
        assert!(remaining.is_empty());
    }

    #[tokio::test]
    async fn transient_scrape_failure_records_unsuccessful_check_and_leaves_event_closed() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/concours/1"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let repository = Arc::new(InMemoryRepository::new());
        repository.upsert_event(&Event::new_unseen(numero(1))).await.unwrap();

        let scheduler = scheduler_against(&mock_server, repository.clone()).await;
        scheduler.check_one(numero(1)).await.unwrap();

        let event = repository.get_event(numero(1)).await.unwrap().unwrap();
        assert!(!event.is_open);
        assert!(event.opened_at.is_none());
    }

    #[tokio::test]
    async fn repeated_open_poll_does_not_re_emit_opening() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/concours/42"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Ouvert aux engagements"))
            .mount(&mock_server)
            .await;

        let repository = Arc::new(InMemoryRepository::new());
        repository.upsert_event(&Event::new_unseen(numero(42))).await.unwrap();
        repository.seed_user_profile(UserProfile {
            user_id: "u1".into(),
            email: "u1@example.com".into(),
            plan: Plan::Free,
            push_token: None,
            push_enabled: false,
            email_enabled: true,
        });
        repository.subscribe("u1", numero(42)).await.unwrap();

        let scheduler = scheduler_against(&mock_server, repository.clone()).await;
        scheduler.check_one(numero(42)).await.unwrap();
        scheduler.check_one(numero(42)).await.unwrap();

        let remaining = repository.list_subscribers_unnotified(numero(42)).await.unwrap();
        assert!(remaining.is_empty());
    }

    /// A stateful responder that serves the next body in sequence on every
    /// request, repeating the last one once the list is exhausted — used to
    /// drive a single event number through closed -> open -> closed -> open
    /// across consecutive polls.
    struct SequentialResponder {
        bodies: std::sync::Mutex<Vec<&'static str>>,
    }

    impl wiremock::Respond for SequentialResponder {
        fn respond(&self, _request: &wiremock::Request) -> ResponseTemplate {
            let mut bodies = self.bodies.lock().unwrap();
            let body = if bodies.len() > 1 {
                bodies.remove(0)
            } else {
                bodies[0]
            };
            ResponseTemplate::new(200).set_body_string(body)
        }
    }

    #[tokio::test]
    async fn reopening_after_a_closure_emits_a_second_opening_and_fan_out_round() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/concours/77"))
            .respond_with(SequentialResponder {
                bodies: std::sync::Mutex::new(vec![
                    "<title>Fiche Concours - PARIS</title>Grand Prix Organisé par Club Ouvert aux engagements 05/06/2026",
                    "<title>Fiche Concours - PARIS</title>Grand Prix Organisé par Club cloture",
                    "<title>Fiche Concours - PARIS</title>Grand Prix Organisé par Club Ouvert aux engagements 05/06/2026",
                ]),
            })
            .mount(&mock_server)
            .await;

        let repository = Arc::new(InMemoryRepository::new());
        repository.upsert_event(&Event::new_unseen(numero(77))).await.unwrap();
        repository.seed_user_profile(UserProfile {
            user_id: "u1".into(),
            email: "u1@example.com".into(),
            plan: Plan::Pro,
            push_token: Some("tok".into()),
            push_enabled: true,
            email_enabled: false,
        });
        repository.subscribe("u1", numero(77)).await.unwrap();

        let scheduler = scheduler_against(&mock_server, repository.clone()).await;

        // Poll 1: closed -> open. First opening.
        scheduler.check_one(numero(77)).await.unwrap();
        let event = repository.get_event(numero(77)).await.unwrap().unwrap();
        assert!(event.is_open);
        assert!(repository.list_subscribers_unnotified(numero(77)).await.unwrap().is_empty());

        // Poll 2: open -> closed. Notified flag resets for the next round.
        scheduler.check_one(numero(77)).await.unwrap();
        let event = repository.get_event(numero(77)).await.unwrap().unwrap();
        assert!(!event.is_open);
        assert_eq!(
            repository.list_subscribers_unnotified(numero(77)).await.unwrap().len(),
            1,
            "subscriber must be eligible again after the event re-closes"
        );

        // Poll 3: closed -> open again. Second opening, second fan-out round.
        scheduler.check_one(numero(77)).await.unwrap();
        let event = repository.get_event(numero(77)).await.unwrap().unwrap();
        assert!(event.is_open);
        assert!(repository.list_subscribers_unnotified(numero(77)).await.unwrap().is_empty());
    }
}
