//! Server configuration, layered the way `ConfigManager` builds a
//! `TaskerConfig` in the orchestration service this crate grew out of —
//! built-in defaults, an optional TOML file, then environment overrides,
//! then a local `.env` file.

use pe_engine::EngineConfig;
use pe_events::WebhookConfig;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "./config/engine.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind_address: String,
    pub bind_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            bind_port: 8080,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub default_step_timeout_secs: u64,
    pub parallel_execution: bool,
    pub max_concurrent_steps: usize,
    pub stop_on_failure: bool,
    pub poll_interval_ms: u64,
    pub cost_alert_threshold: Option<String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        let defaults = EngineConfig::default();
        Self {
            default_step_timeout_secs: defaults.default_step_timeout.as_secs(),
            parallel_execution: defaults.parallel_execution,
            max_concurrent_steps: defaults.max_concurrent_steps,
            stop_on_failure: defaults.stop_on_failure,
            poll_interval_ms: defaults.poll_interval.as_millis() as u64,
            cost_alert_threshold: None,
        }
    }
}

impl EngineSettings {
    pub fn to_engine_config(&self) -> EngineConfig {
        EngineConfig {
            default_step_timeout: Duration::from_secs(self.default_step_timeout_secs),
            parallel_execution: self.parallel_execution,
            max_concurrent_steps: self.max_concurrent_steps,
            stop_on_failure: self.stop_on_failure,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            cost_alert_threshold: self
                .cost_alert_threshold
                .as_deref()
                .and_then(|s| Decimal::from_str(s).ok())
                .map(pe_domain::Money::from_decimal),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebhookSettings {
    pub urls: Vec<String>,
    pub max_attempts: u32,
    pub retry_backoff_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for WebhookSettings {
    fn default() -> Self {
        let defaults = WebhookConfig::default();
        Self {
            urls: defaults.urls,
            max_attempts: defaults.max_attempts,
            retry_backoff_ms: defaults.retry_backoff.as_millis() as u64,
            request_timeout_secs: defaults.request_timeout.as_secs(),
        }
    }
}

impl WebhookSettings {
    pub fn to_webhook_config(&self) -> WebhookConfig {
        WebhookConfig {
            urls: self.urls.clone(),
            max_attempts: self.max_attempts,
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    pub server: ServerSettings,
    pub engine: EngineSettings,
    pub webhook: WebhookSettings,
}

/// Loads configuration the way `tasker-shared::config::ConfigManager` does:
/// defaults baked into the `Default` impls above, an optional TOML file at
/// `PROCESS_ENGINE_CONFIG` (falling back to `./config/engine.toml`), then
/// `PROCESS_ENGINE__`-prefixed environment variables (double-underscore
/// nesting, per the `config` crate's convention), loaded after `.env`.
pub fn load() -> anyhow::Result<ServerConfig> {
    let _ = dotenvy::dotenv();

    let config_path =
        std::env::var("PROCESS_ENGINE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let builder = config::Config::builder()
        .add_source(config::File::with_name(&config_path).required(false))
        .add_source(
            config::Environment::with_prefix("PROCESS_ENGINE")
                .separator("__")
                .try_parsing(true),
        );

    let settings = builder.build()?;
    Ok(settings.try_deserialize::<ServerConfig>().unwrap_or_default())
}
