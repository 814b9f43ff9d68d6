use clap::Parser;
use equiwatch_engine::{build, init_tracing, shutdown_tracing};
use tracing::{error, info};

/// FFE event-opening surveillance engine: polls watched events and fans
/// out plan-delayed notifications the moment one opens for enrollment.
#[derive(Debug, Parser)]
#[command(name = "equiwatch-engine", version, about)]
struct Args {
    /// Path to a TOML configuration file. Falls back to `equiwatch.toml`
    /// in the working directory, then to `EQUIWATCH__`-prefixed env vars.
    #[arg(long, env = "EQUIWATCH_CONFIG")]
    config: Option<String>,

    /// Overrides `logging.level` / `LOG_LEVEL` from the command line.
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match equiwatch_config::loader::load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("fatal: invalid configuration: {err}");
            std::process::exit(1);
        }
    };

    init_tracing(&config.logging.level);

    let engine = match build(config).await {
        Ok(engine) => engine,
        Err(err) => {
            error!(error = %err, "fatal: engine failed to start");
            shutdown_tracing();
            std::process::exit(1);
        }
    };

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let scheduler_handle = tokio::spawn({
        let rx = shutdown_rx.clone();
        let scheduler = engine.scheduler;
        async move { scheduler.run(rx).await }
    });
    let dispatch_handle = tokio::spawn({
        let rx = shutdown_rx.clone();
        let dispatch_worker = engine.dispatch_worker;
        async move { dispatch_worker.run(rx).await }
    });

    info!("equiwatch engine started");

    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to install ctrl-c handler");
    }
    info!("shutdown signal received, stopping scheduler and dispatch worker");
    let _ = shutdown_tx.send(true);

    let grace_period = tokio::time::Duration::from_secs(10);
    let joined = tokio::time::timeout(grace_period, async {
        let _ = tokio::join!(scheduler_handle, dispatch_handle);
    })
    .await;
    if joined.is_err() {
        error!("background tasks did not stop within the grace period, exiting anyway");
    }

    info!("equiwatch engine stopped");
    shutdown_tracing();
}
