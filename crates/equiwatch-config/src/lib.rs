pub mod error;
pub mod loader;

pub use error::ConfigError;

use serde::{Deserialize, Serialize};

/// Full runtime configuration for the surveillance engine, assembled from a
/// TOML file (if present) layered under `EQUIWATCH__`-prefixed environment
/// variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scraper: ScraperConfig::default(),
            storage: StorageConfig::default(),
            notifications: NotificationsConfig::default(),
            scheduler: SchedulerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scraper.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("scraper.base_url must not be empty".into()));
        }
        if !self.scraper.event_url_template.contains("{numero}") {
            return Err(ConfigError::Invalid(
                "scraper.event_url_template must contain a {numero} placeholder".into(),
            ));
        }
        match self.storage.backend.as_str() {
            "memory" => {}
            "postgres" => {
                if self.storage.database_url.as_deref().unwrap_or("").is_empty() {
                    return Err(ConfigError::Invalid(
                        "storage.database_url is required when storage.backend = \"postgres\"".into(),
                    ));
                }
            }
            other => {
                return Err(ConfigError::Invalid(format!(
                    "storage.backend must be \"memory\" or \"postgres\", got {other:?}"
                )));
            }
        }
        if self.scheduler.check_interval_secs == 0 {
            return Err(ConfigError::Invalid("scheduler.check_interval_secs must be > 0".into()));
        }
        for (name, secs) in [
            ("notifications.delay_free_secs", self.notifications.delay_free_secs),
            ("notifications.delay_premium_secs", self.notifications.delay_premium_secs),
            ("notifications.delay_pro_secs", self.notifications.delay_pro_secs),
        ] {
            if secs == 0 {
                return Err(ConfigError::Invalid(format!("{name} must be > 0")));
            }
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid = ["trace", "debug", "info", "warn", "error"];
        if !valid.contains(&lvl.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "logging.level must be one of {valid:?}, got {lvl:?}"
            )));
        }
        Ok(())
    }

    /// Delay, in seconds, before a queued notification for the given plan
    /// becomes due (spec §4.7 / §6).
    pub fn delay_secs_for(&self, plan: equiwatch_core::Plan) -> u64 {
        match plan {
            equiwatch_core::Plan::Free => self.notifications.delay_free_secs,
            equiwatch_core::Plan::Premium => self.notifications.delay_premium_secs,
            equiwatch_core::Plan::Pro => self.notifications.delay_pro_secs,
        }
    }

    /// Builds the public event page URL for a given event number.
    pub fn event_url(&self, numero: equiwatch_core::EventNumber) -> String {
        self.scraper
            .event_url_template
            .replace("{numero}", &numero.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_event_url_template")]
    pub event_url_template: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
    #[serde(default = "default_max_requests_per_minute")]
    pub max_requests_per_minute: u32,
}

fn default_base_url() -> String {
    "https://www.ffe.com".into()
}
fn default_event_url_template() -> String {
    "https://www.ffe.com/concours/{numero}".into()
}
fn default_request_timeout_secs() -> u64 {
    15
}
fn default_min_interval_ms() -> u64 {
    2_000
}
fn default_max_requests_per_minute() -> u32 {
    20
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            event_url_template: default_event_url_template(),
            request_timeout_secs: default_request_timeout_secs(),
            min_interval_ms: default_min_interval_ms(),
            max_requests_per_minute: default_max_requests_per_minute(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// `"memory"` or `"postgres"`.
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

fn default_backend() -> String {
    "memory".into()
}
fn default_pool_size() -> u32 {
    5
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            database_url: None,
            pool_size: default_pool_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub push_api_key: Option<String>,
    #[serde(default)]
    pub email_api_key: Option<String>,
    #[serde(default = "default_from_address")]
    pub from_address: String,
    #[serde(default = "default_delay_free")]
    pub delay_free_secs: u64,
    #[serde(default = "default_delay_premium")]
    pub delay_premium_secs: u64,
    #[serde(default = "default_delay_pro")]
    pub delay_pro_secs: u64,
}

fn default_from_address() -> String {
    "notifications@equiwatch.dev".into()
}
fn default_delay_free() -> u64 {
    600
}
fn default_delay_premium() -> u64 {
    60
}
fn default_delay_pro() -> u64 {
    10
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            app_id: None,
            push_api_key: None,
            email_api_key: None,
            from_address: default_from_address(),
            delay_free_secs: default_delay_free(),
            delay_premium_secs: default_delay_premium(),
            delay_pro_secs: default_delay_pro(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,
    #[serde(default = "default_inter_event_delay_ms")]
    pub inter_event_delay_ms: u64,
    #[serde(default = "default_failure_backoff_secs")]
    pub failure_backoff_secs: u64,
    #[serde(default = "default_consecutive_failure_threshold")]
    pub consecutive_failure_threshold: u32,
}

fn default_check_interval() -> u64 {
    5
}
fn default_inter_event_delay_ms() -> u64 {
    1_000
}
fn default_failure_backoff_secs() -> u64 {
    60
}
fn default_consecutive_failure_threshold() -> u32 {
    3
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: default_check_interval(),
            inter_event_delay_ms: default_inter_event_delay_ms(),
            failure_backoff_secs: default_failure_backoff_secs(),
            consecutive_failure_threshold: default_consecutive_failure_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        AppConfig::default().validate().unwrap();
    }

    #[test]
    fn postgres_backend_requires_database_url() {
        let mut cfg = AppConfig::default();
        cfg.storage.backend = "postgres".into();
        assert!(cfg.validate().is_err());
        cfg.storage.database_url = Some("postgres://localhost/equiwatch".into());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn event_url_substitutes_numero() {
        let cfg = AppConfig::default();
        let numero = equiwatch_core::EventNumber::new(123456).unwrap();
        assert_eq!(cfg.event_url(numero), "https://www.ffe.com/concours/123456");
    }
}
