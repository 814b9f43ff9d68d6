use std::str::FromStr;

use async_trait::async_trait;
use equiwatch_core::{EventNumber, EventStatus, NotificationChannel, Plan};
use equiwatch_storage::{
    CheckHistoryRow, Event, NotificationLogRow, OpeningEventRow, QueueEntry, Repository,
    RepositoryError, Result, Subscription, UserProfile,
};
use sqlx_core::query::query;
use sqlx_core::row::Row;
use sqlx_postgres::{PgPool, PgRow};
use time::OffsetDateTime;

fn backend_err(e: sqlx_core::error::Error) -> RepositoryError {
    RepositoryError::Backend(e.to_string())
}

fn row_to_event(row: &PgRow) -> Event {
    let numero: i64 = row.get("numero");
    let status: String = row.get("status");
    Event {
        numero: EventNumber::new(numero).expect("numero column is always positive"),
        name: row.get("name"),
        venue: row.get("venue"),
        organisateur: row.get("organisateur"),
        start_date: row.get("start_date"),
        end_date: row.get("end_date"),
        discipline: row.get("discipline"),
        status: EventStatus::from_str(&status).unwrap_or(EventStatus::Previsional),
        is_open: row.get("is_open"),
        last_checked_at: row.get("last_checked_at"),
        opened_at: row.get("opened_at"),
    }
}

fn row_to_profile(row: &PgRow) -> UserProfile {
    let plan: String = row.get("plan");
    UserProfile {
        user_id: row.get("user_id"),
        email: row.get("email"),
        plan: Plan::from_str(&plan).unwrap_or_default(),
        push_token: row.get("push_token"),
        push_enabled: row.get("push_enabled"),
        email_enabled: row.get("email_enabled"),
    }
}

fn row_to_subscription(row: &PgRow) -> Subscription {
    let numero: i64 = row.get("numero");
    Subscription {
        user_id: row.get("user_id"),
        numero: EventNumber::new(numero).expect("numero column is always positive"),
        notified: row.get("notified"),
        created_at: row.get("created_at"),
    }
}

fn row_to_queue_entry(row: &PgRow) -> QueueEntry {
    let numero: i64 = row.get("numero");
    let plan: String = row.get("plan");
    QueueEntry {
        id: row.get("id"),
        user_id: row.get("user_id"),
        numero: EventNumber::new(numero).expect("numero column is always positive"),
        plan: Plan::from_str(&plan).unwrap_or_default(),
        send_at: row.get("send_at"),
        sent: row.get("sent"),
        sent_at: row.get("sent_at"),
    }
}

/// PostgreSQL-backed `Repository` implementation.
#[derive(Debug, Clone)]
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn init_schema(&self) -> Result<()> {
        crate::schema::run_migrations(&self.pool)
            .await
            .map_err(|e| RepositoryError::Migration(e.to_string()))
    }

    async fn upsert_event(&self, event: &Event) -> Result<()> {
        query(
            r#"INSERT INTO events
                (numero, name, venue, organisateur, start_date, end_date, discipline,
                 status, is_open, last_checked_at, opened_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
               ON CONFLICT (numero) DO UPDATE SET
                 name = EXCLUDED.name,
                 venue = EXCLUDED.venue,
                 organisateur = EXCLUDED.organisateur,
                 start_date = EXCLUDED.start_date,
                 end_date = EXCLUDED.end_date,
                 discipline = EXCLUDED.discipline,
                 status = EXCLUDED.status,
                 is_open = EXCLUDED.is_open,
                 last_checked_at = EXCLUDED.last_checked_at,
                 opened_at = COALESCE(EXCLUDED.opened_at, events.opened_at)"#,
        )
        .bind(event.numero.get())
        .bind(&event.name)
        .bind(&event.venue)
        .bind(&event.organisateur)
        .bind(&event.start_date)
        .bind(&event.end_date)
        .bind(&event.discipline)
        .bind(event.status.as_str())
        .bind(event.is_open)
        .bind(event.last_checked_at)
        .bind(event.opened_at)
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;
        Ok(())
    }

    async fn get_event(&self, numero: EventNumber) -> Result<Option<Event>> {
        let row = query("SELECT * FROM events WHERE numero = $1")
            .bind(numero.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(row.as_ref().map(row_to_event))
    }

    async fn list_events_where(&self, is_open: bool) -> Result<Vec<Event>> {
        let rows = query("SELECT * FROM events WHERE is_open = $1")
            .bind(is_open)
            .fetch_all(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(rows.iter().map(row_to_event).collect())
    }

    async fn list_events_in_date_range(
        &self,
        from: OffsetDateTime,
        to: OffsetDateTime,
    ) -> Result<Vec<Event>> {
        let rows = query("SELECT * FROM events WHERE start_date >= $1 AND start_date <= $2")
            .bind(from.date().to_string())
            .bind(to.date().to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(rows.iter().map(row_to_event).collect())
    }

    async fn set_event_status(
        &self,
        numero: EventNumber,
        status: EventStatus,
        is_open: bool,
        opened_at: Option<OffsetDateTime>,
    ) -> Result<()> {
        let result = query(
            r#"UPDATE events SET status = $2, is_open = $3,
                 opened_at = COALESCE($4, opened_at)
               WHERE numero = $1"#,
        )
        .bind(numero.get())
        .bind(status.as_str())
        .bind(is_open)
        .bind(opened_at)
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::EventNotFound(numero));
        }
        Ok(())
    }

    async fn subscribe(&self, user_id: &str, numero: EventNumber) -> Result<()> {
        query(
            r#"INSERT INTO subscriptions (user_id, numero, notified, created_at)
               VALUES ($1, $2, false, now())
               ON CONFLICT (user_id, numero) DO NOTHING"#,
        )
        .bind(user_id)
        .bind(numero.get())
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;
        Ok(())
    }

    async fn unsubscribe(&self, user_id: &str, numero: EventNumber) -> Result<()> {
        query("DELETE FROM subscriptions WHERE user_id = $1 AND numero = $2")
            .bind(user_id)
            .bind(numero.get())
            .execute(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(())
    }

    async fn list_subscribers_unnotified(
        &self,
        numero: EventNumber,
    ) -> Result<Vec<(Subscription, UserProfile)>> {
        let rows = query(
            r#"SELECT s.user_id AS user_id, s.numero AS numero, s.notified AS notified,
                      s.created_at AS created_at,
                      p.email AS email, p.plan AS plan, p.push_token AS push_token,
                      p.push_enabled AS push_enabled, p.email_enabled AS email_enabled
               FROM subscriptions s
               JOIN user_profiles p ON p.user_id = s.user_id
               WHERE s.numero = $1 AND s.notified = false"#,
        )
        .bind(numero.get())
        .fetch_all(&self.pool)
        .await
        .map_err(backend_err)?;
        Ok(rows
            .iter()
            .map(|row| (row_to_subscription(row), row_to_profile(row)))
            .collect())
    }

    async fn set_subscription_notified(
        &self,
        user_id: &str,
        numero: EventNumber,
        notified: bool,
    ) -> Result<()> {
        let result = query(
            "UPDATE subscriptions SET notified = $3 WHERE user_id = $1 AND numero = $2",
        )
        .bind(user_id)
        .bind(numero.get())
        .bind(notified)
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::SubscriptionNotFound {
                user_id: user_id.to_string(),
                numero,
            });
        }
        Ok(())
    }

    async fn reset_subscriptions_notified(&self, numero: EventNumber) -> Result<()> {
        query("UPDATE subscriptions SET notified = false WHERE numero = $1 AND notified = true")
            .bind(numero.get())
            .execute(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(())
    }

    async fn enqueue(&self, entry: &QueueEntry) -> Result<()> {
        query(
            r#"INSERT INTO queue (user_id, numero, plan, send_at, sent, sent_at)
               VALUES ($1, $2, $3, $4, $5, $6)"#,
        )
        .bind(&entry.user_id)
        .bind(entry.numero.get())
        .bind(entry.plan.as_str())
        .bind(entry.send_at)
        .bind(entry.sent)
        .bind(entry.sent_at)
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;
        Ok(())
    }

    /// Claims up to `limit` due entries, locking them against concurrent
    /// claimers with `FOR UPDATE SKIP LOCKED` and flipping `sent` within
    /// the same statement so a claimed row is never handed out twice.
    async fn claim_due_queue_entries(
        &self,
        now: OffsetDateTime,
        limit: u32,
    ) -> Result<Vec<(QueueEntry, UserProfile, Event)>> {
        let rows = query(
            r#"UPDATE queue SET sent = true, sent_at = $1
               WHERE id IN (
                   SELECT id FROM queue
                   WHERE sent = false AND send_at <= $1
                   ORDER BY send_at ASC
                   LIMIT $2
                   FOR UPDATE SKIP LOCKED
               )
               RETURNING id, user_id, numero, plan, send_at, sent, sent_at"#,
        )
        .bind(now)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(backend_err)?;

        let mut claimed = Vec::with_capacity(rows.len());
        for row in &rows {
            let entry = row_to_queue_entry(row);
            let profile_row = query("SELECT * FROM user_profiles WHERE user_id = $1")
                .bind(&entry.user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(backend_err)?;
            let event_row = query("SELECT * FROM events WHERE numero = $1")
                .bind(entry.numero.get())
                .fetch_optional(&self.pool)
                .await
                .map_err(backend_err)?;
            if let (Some(profile_row), Some(event_row)) = (profile_row, event_row) {
                claimed.push((entry, row_to_profile(&profile_row), row_to_event(&event_row)));
            }
        }
        Ok(claimed)
    }

    async fn mark_entry_sent(&self, id: i64, sent_at: OffsetDateTime) -> Result<()> {
        let result = query(
            "UPDATE queue SET sent = true, sent_at = $2 WHERE id = $1 AND sent = false",
        )
        .bind(id)
        .bind(sent_at)
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;
        // Not finding a row here means it was already marked sent (by
        // `claim_due_queue_entries` or a prior call) — idempotent no-op.
        let _ = result.rows_affected();
        Ok(())
    }

    async fn record_check(&self, row: &CheckHistoryRow) -> Result<()> {
        query(
            r#"INSERT INTO check_history
                (numero, checked_at, status_before, status_after, response_time_ms, success)
               VALUES ($1, $2, $3, $4, $5, $6)"#,
        )
        .bind(row.numero.get())
        .bind(row.checked_at)
        .bind(row.status_before.as_str())
        .bind(row.status_after.as_str())
        .bind(row.response_time_ms as i64)
        .bind(row.success)
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;
        Ok(())
    }

    async fn record_opening(&self, row: &OpeningEventRow) -> Result<()> {
        query(
            r#"INSERT INTO opening_events (numero, opened_at, status, notification_sent_at)
               VALUES ($1, $2, $3, $4)"#,
        )
        .bind(row.numero.get())
        .bind(row.opened_at)
        .bind(row.status.as_str())
        .bind(row.notification_sent_at)
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;
        Ok(())
    }

    async fn record_notification(&self, row: &NotificationLogRow) -> Result<()> {
        query(
            r#"INSERT INTO notification_log
                (user_id, numero, channel, plan, delay_seconds, sent_at)
               VALUES ($1, $2, $3, $4, $5, $6)"#,
        )
        .bind(&row.user_id)
        .bind(row.numero.get())
        .bind(channel_str(row.channel))
        .bind(row.plan.as_str())
        .bind(row.delay_seconds as i64)
        .bind(row.sent_at)
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;
        Ok(())
    }
}

fn channel_str(channel: NotificationChannel) -> &'static str {
    match channel {
        NotificationChannel::Push => "push",
        NotificationChannel::Email => "email",
    }
}
