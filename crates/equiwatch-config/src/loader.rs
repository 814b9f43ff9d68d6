use std::path::{Path, PathBuf};

use config::{Config, Environment, File};

use crate::{AppConfig, ConfigError};

/// The bare, un-prefixed environment variable names the spec's external
/// interface (§6) names directly — `BASE_URL`, `CHECK_INTERVAL`, and so
/// on. These map to dotted config keys and are applied last, so they win
/// over both the TOML file and the `EQUIWATCH__`-prefixed layer below.
const LEGACY_ENV_MAP: &[(&str, &str)] = &[
    ("BASE_URL", "scraper.base_url"),
    ("EVENT_URL_TEMPLATE", "scraper.event_url_template"),
    ("DATABASE_URL", "storage.database_url"),
    ("APP_ID", "notifications.app_id"),
    ("ONESIGNAL_API_KEY", "notifications.push_api_key"),
    ("RESEND_API_KEY", "notifications.email_api_key"),
    ("FROM_ADDRESS", "notifications.from_address"),
    ("CHECK_INTERVAL", "scheduler.check_interval_secs"),
    ("DELAY_FREE", "notifications.delay_free_secs"),
    ("DELAY_PREMIUM", "notifications.delay_premium_secs"),
    ("DELAY_PRO", "notifications.delay_pro_secs"),
    ("LOG_LEVEL", "logging.level"),
];

/// Loads configuration from an optional TOML file, `EQUIWATCH__`-prefixed
/// environment variables (e.g. `EQUIWATCH__SCRAPER__BASE_URL=...`), and
/// finally the bare spec-contract variable names in [`LEGACY_ENV_MAP`]
/// (`BASE_URL`, `CHECK_INTERVAL`, `DELAY_FREE`, …), which take precedence
/// over everything else. A `.env` file in the working directory, if
/// present, is loaded into the process environment before any of this
/// runs.
pub fn load_config(path: Option<&str>) -> Result<AppConfig, ConfigError> {
    let _ = dotenvy::dotenv();

    let mut builder = Config::builder();
    match path {
        Some(p) => {
            let pathbuf = PathBuf::from(p);
            if pathbuf.exists() {
                builder = builder.add_source(File::from(pathbuf));
            }
        }
        None => {
            let default_path = PathBuf::from("equiwatch.toml");
            if default_path.exists() {
                builder = builder.add_source(File::from(default_path));
            }
        }
    }

    builder = builder.add_source(
        Environment::with_prefix("EQUIWATCH")
            .try_parsing(true)
            .separator("__"),
    );

    for (env_name, config_key) in LEGACY_ENV_MAP {
        if let Ok(value) = std::env::var(env_name) {
            builder = builder.set_override(*config_key, value)?;
        }
    }

    let cfg = builder.build()?;
    let merged: AppConfig = cfg.try_deserialize()?;
    merged.validate()?;
    Ok(merged)
}

pub fn load_config_with_default_path<P: AsRef<Path>>(
    path: Option<P>,
) -> Result<AppConfig, ConfigError> {
    let p = path.as_ref().map(|p| p.as_ref().to_string_lossy().to_string());
    load_config(p.as_deref())
}
