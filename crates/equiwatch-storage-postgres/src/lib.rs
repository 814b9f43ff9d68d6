//! PostgreSQL repository backend for the surveillance engine.
//!
//! Built directly on `sqlx-core` + `sqlx-postgres` (not the umbrella `sqlx`
//! crate) to avoid pulling in its SQLite feature set, and on raw SQL via
//! `query`/`query_as` rather than the compile-time `query!` macros, which
//! need a live `DATABASE_URL` at build time.

pub mod error;
pub mod pool;
mod schema;
mod storage;

pub use error::PostgresError;
pub use pool::{create_pool, PostgresConfig};
pub use schema::run_migrations;
pub use storage::PostgresRepository;
