//! Periodic dispatch worker: drains due queue entries and attempts
//! delivery on every enabled channel for each recipient.
//!
//! Grounded in the teacher's background-worker shape (a fixed-interval
//! `tokio::time::interval` loop around a storage claim) generalized from
//! FHIR subscription delivery to the plan-delayed opening notifications
//! this workspace queues. Per spec §4.8: a push failure and an email
//! failure are independent outcomes, both logged, and `mark_entry_sent`
//! is always called once the entry has been claimed regardless of how
//! either channel went. Unlike the teacher, there is no exponential
//! backoff/retry queue here — a failed send is logged and not retried.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use equiwatch_core::NotificationChannel;
use equiwatch_storage::Repository;
use serde_json::json;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::adapters::NotificationAdapter;
use crate::templates::TemplateRenderer;
use crate::types::{NotificationTarget, PlanDelays};

/// How many due entries to claim per tick. Matches the teacher's default
/// subscription-delivery batch size.
const CLAIM_BATCH_SIZE: u32 = 100;

pub struct DispatchWorker<R: Repository> {
    repository: Arc<R>,
    push_adapter: Option<Arc<dyn NotificationAdapter>>,
    email_adapter: Option<Arc<dyn NotificationAdapter>>,
    renderer: TemplateRenderer,
    event_url_template: String,
    tick_interval: Duration,
    plan_delays: PlanDelays,
}

impl<R: Repository> DispatchWorker<R> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        repository: Arc<R>,
        push_adapter: Option<Arc<dyn NotificationAdapter>>,
        email_adapter: Option<Arc<dyn NotificationAdapter>>,
        event_url_template: impl Into<String>,
        tick_interval: Duration,
        plan_delays: PlanDelays,
    ) -> Self {
        Self {
            repository,
            push_adapter,
            email_adapter,
            renderer: TemplateRenderer::with_builtin_templates(),
            event_url_template: event_url_template.into(),
            tick_interval,
            plan_delays,
        }
    }

    /// Runs until `shutdown` resolves. Intended to be spawned as its own
    /// long-lived task alongside the polling scheduler.
    pub async fn run(&self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.tick_interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(err) = self.tick().await {
                        warn!(error = %err, "dispatch tick failed");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    }

    async fn tick(&self) -> equiwatch_storage::Result<()> {
        let now = OffsetDateTime::now_utc();
        let claimed = self.repository.claim_due_queue_entries(now, CLAIM_BATCH_SIZE).await?;
        if claimed.is_empty() {
            return Ok(());
        }
        info!(count = claimed.len(), "dispatching due queue entries");

        for (entry, profile, event) in claimed {
            let url = self.event_url_template.replace("{numero}", &entry.numero.get().to_string());

            let mut data = HashMap::new();
            data.insert("name".to_string(), json!(event.name.clone().unwrap_or_default()));
            data.insert("venue".to_string(), json!(event.venue.clone().unwrap_or_default()));
            data.insert("start_date".to_string(), json!(event.start_date.clone().unwrap_or_default()));
            data.insert("end_date".to_string(), json!(event.end_date.clone().unwrap_or_default()));
            data.insert("url".to_string(), json!(url));

            let content = match self.renderer.render("opening_notification", &data) {
                Ok(content) => content,
                Err(err) => {
                    warn!(error = %err, numero = entry.numero.get(), "template render failed");
                    self.repository.mark_entry_sent(entry.id, now).await?;
                    continue;
                }
            };

            let target = NotificationTarget {
                numero: entry.numero,
                status: event.status,
                url,
                push_token: profile.push_token.clone(),
                email: profile.email.clone(),
            };

            if profile.push_enabled && target.push_token.is_some() {
                if let Some(adapter) = &self.push_adapter {
                    self.attempt(adapter.as_ref(), &target, &content, &profile.user_id, NotificationChannel::Push, entry.plan, now)
                        .await;
                }
            }

            if profile.email_enabled {
                if let Some(adapter) = &self.email_adapter {
                    self.attempt(adapter.as_ref(), &target, &content, &profile.user_id, NotificationChannel::Email, entry.plan, now)
                        .await;
                }
            }

            // Always marked sent once claimed, independent of per-channel
            // outcome (spec §4.8) — idempotent if the claim already did so.
            self.repository.mark_entry_sent(entry.id, now).await?;
        }

        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn attempt(
        &self,
        adapter: &dyn NotificationAdapter,
        target: &NotificationTarget,
        content: &crate::types::RenderedContent,
        user_id: &str,
        channel: NotificationChannel,
        plan: equiwatch_core::Plan,
        now: OffsetDateTime,
    ) {
        let result = adapter.send(target, content).await;
        let delivered = match result {
            Ok(outcome) if outcome.success => {
                info!(user_id, numero = target.numero.get(), %channel, "notification delivered");
                true
            }
            Ok(outcome) => {
                warn!(user_id, numero = target.numero.get(), %channel, detail = ?outcome.detail, "notification delivery failed");
                false
            }
            Err(err) => {
                warn!(user_id, numero = target.numero.get(), %channel, error = %err, "notification adapter error");
                false
            }
        };

        // Only a successful send gets a log row (spec §8 invariant 3): the
        // queue row is still marked sent either way, demonstrating
        // at-most-once delivery per channel, never exactly-once.
        if !delivered {
            return;
        }
        let log_row = equiwatch_storage::NotificationLogRow {
            user_id: user_id.to_string(),
            numero: target.numero,
            channel,
            plan,
            delay_seconds: self.plan_delays.for_plan(plan),
            sent_at: now,
        };
        if let Err(err) = self.repository.record_notification(&log_row).await {
            warn!(error = %err, "failed to record notification log entry");
        }
    }
}
