//! Schema creation and idempotent migrations for the PostgreSQL backend.
//!
//! Every statement is safe to run repeatedly: `CREATE TABLE IF NOT EXISTS`
//! and `ADD COLUMN IF NOT EXISTS` so a fresh deploy and an upgrade of an
//! existing database both converge to the same schema.

use sqlx_core::query::query;
use sqlx_postgres::PgPool;
use tracing::{info, instrument};

use crate::error::Result;

const CREATE_TABLES: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS events (
        numero BIGINT PRIMARY KEY,
        name TEXT,
        venue TEXT,
        organisateur TEXT,
        start_date TEXT,
        end_date TEXT,
        discipline TEXT,
        status TEXT NOT NULL DEFAULT 'previsional',
        is_open BOOLEAN NOT NULL DEFAULT false,
        last_checked_at TIMESTAMPTZ,
        opened_at TIMESTAMPTZ
    )"#,
    r#"CREATE INDEX IF NOT EXISTS idx_events_is_open ON events (is_open)"#,
    r#"CREATE TABLE IF NOT EXISTS user_profiles (
        user_id TEXT PRIMARY KEY,
        email TEXT NOT NULL,
        plan TEXT NOT NULL DEFAULT 'free',
        push_token TEXT,
        push_enabled BOOLEAN NOT NULL DEFAULT true,
        email_enabled BOOLEAN NOT NULL DEFAULT true
    )"#,
    r#"CREATE TABLE IF NOT EXISTS subscriptions (
        user_id TEXT NOT NULL,
        numero BIGINT NOT NULL REFERENCES events(numero),
        notified BOOLEAN NOT NULL DEFAULT false,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        PRIMARY KEY (user_id, numero)
    )"#,
    r#"CREATE INDEX IF NOT EXISTS idx_subscriptions_numero_notified ON subscriptions (numero, notified)"#,
    r#"CREATE TABLE IF NOT EXISTS queue (
        id BIGSERIAL PRIMARY KEY,
        user_id TEXT NOT NULL,
        numero BIGINT NOT NULL,
        plan TEXT NOT NULL,
        send_at TIMESTAMPTZ NOT NULL,
        sent BOOLEAN NOT NULL DEFAULT false,
        sent_at TIMESTAMPTZ
    )"#,
    r#"CREATE INDEX IF NOT EXISTS idx_queue_due ON queue (send_at) WHERE sent = false"#,
    r#"CREATE TABLE IF NOT EXISTS check_history (
        id BIGSERIAL PRIMARY KEY,
        numero BIGINT NOT NULL,
        checked_at TIMESTAMPTZ NOT NULL,
        status_before TEXT NOT NULL,
        status_after TEXT NOT NULL,
        response_time_ms BIGINT NOT NULL,
        success BOOLEAN NOT NULL
    )"#,
    r#"CREATE INDEX IF NOT EXISTS idx_check_history_numero ON check_history (numero)"#,
    r#"CREATE TABLE IF NOT EXISTS opening_events (
        id BIGSERIAL PRIMARY KEY,
        numero BIGINT NOT NULL,
        opened_at TIMESTAMPTZ NOT NULL,
        status TEXT NOT NULL,
        notification_sent_at TIMESTAMPTZ
    )"#,
    r#"CREATE INDEX IF NOT EXISTS idx_opening_events_numero ON opening_events (numero)"#,
    r#"CREATE TABLE IF NOT EXISTS notification_log (
        id BIGSERIAL PRIMARY KEY,
        user_id TEXT NOT NULL,
        numero BIGINT NOT NULL,
        channel TEXT NOT NULL,
        plan TEXT NOT NULL,
        delay_seconds BIGINT NOT NULL,
        sent_at TIMESTAMPTZ NOT NULL
    )"#,
];

/// Columns added after the initial release, applied idempotently so an
/// existing database upgrades in place.
const ADD_COLUMNS: &[&str] = &[
    "ALTER TABLE events ADD COLUMN IF NOT EXISTS organisateur TEXT",
];

#[instrument(skip(pool))]
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    for statement in CREATE_TABLES {
        query(statement).execute(pool).await?;
    }
    for statement in ADD_COLUMNS {
        query(statement).execute(pool).await?;
    }
    info!("schema migrations applied");
    Ok(())
}
