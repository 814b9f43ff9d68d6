pub mod bootstrap;
pub mod error;
pub mod observability;
pub mod queue_planner;
pub mod scheduler;
pub mod transition;

pub use bootstrap::{build, AnyRepository, Engine};
pub use error::{EngineError, Result};
pub use observability::{init_tracing, shutdown_tracing};
