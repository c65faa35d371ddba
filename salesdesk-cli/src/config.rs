//! Application configuration
//!
//! TOML file at `<config_dir>/salesdesk/config.toml` (overridable with
//! `SALESDESK_CONFIG`), plus environment overrides for the values that
//! differ per deployment. Every field has a usable default so a bare
//! install can run the local engine out of the box.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono_tz::Tz;
use once_cell::sync::OnceCell;
use serde::Deserialize;

use crate::api::resilience::{ConcurrencyConfig, ResilienceConfig, RetryConfig};
use crate::engine::SheetSchema;

#[derive(Debug, Clone)]
pub struct Config {
    /// Remote scripting backend. `None` means local-engine only.
    pub script_url: Option<String>,
    /// Directory of `<document_id>.xlsx` files for the local engine.
    pub data_dir: PathBuf,
    pub cache_path: PathBuf,
    pub data_master_id: String,
    pub auth_master_id: String,
    pub listen_addr: String,
    pub timezone: Tz,
    pub cache_ttl: Duration,
    pub request_timeout: Duration,
    pub resilience: ResilienceConfig,
    pub schema: SheetSchema,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    script_url: Option<String>,
    data_dir: Option<PathBuf>,
    cache_path: Option<PathBuf>,
    data_master_id: Option<String>,
    auth_master_id: Option<String>,
    listen_addr: Option<String>,
    timezone: Option<String>,
    cache_ttl_secs: Option<u64>,
    request_timeout_secs: Option<u64>,
    resilience: RawResilience,
    schema: SheetSchema,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawResilience {
    max_attempts: Option<u32>,
    base_delay_ms: Option<u64>,
    max_delay_ms: Option<u64>,
    backoff_multiplier: Option<f64>,
    jitter: Option<bool>,
    max_concurrent_requests: Option<usize>,
    concurrency_enabled: Option<bool>,
}

impl RawResilience {
    fn resolve(self) -> ResilienceConfig {
        let defaults = ResilienceConfig::default();
        ResilienceConfig {
            retry: RetryConfig {
                max_attempts: self.max_attempts.unwrap_or(defaults.retry.max_attempts),
                base_delay: self
                    .base_delay_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.retry.base_delay),
                max_delay: self
                    .max_delay_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.retry.max_delay),
                backoff_multiplier: self
                    .backoff_multiplier
                    .unwrap_or(defaults.retry.backoff_multiplier),
                jitter: self.jitter.unwrap_or(defaults.retry.jitter),
            },
            concurrency: ConcurrencyConfig {
                max_concurrent_requests: self
                    .max_concurrent_requests
                    .unwrap_or(defaults.concurrency.max_concurrent_requests),
                enabled: self
                    .concurrency_enabled
                    .unwrap_or(defaults.concurrency.enabled),
            },
        }
    }
}

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("salesdesk")
        .join("config.toml")
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("salesdesk")
}

impl Config {
    /// Load from disk and the environment. A missing config file is fine;
    /// a malformed one is not.
    pub fn load() -> Result<Self> {
        let path = std::env::var_os("SALESDESK_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(default_config_path);

        let raw = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            toml::from_str(&text)
                .with_context(|| format!("Failed to parse config: {}", path.display()))?
        } else {
            RawConfig::default()
        };

        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self> {
        let script_url = std::env::var("SALESDESK_SCRIPT_URL")
            .ok()
            .filter(|v| !v.is_empty())
            .or(raw.script_url);
        let data_dir = std::env::var_os("SALESDESK_DATA_DIR")
            .map(PathBuf::from)
            .or(raw.data_dir)
            .unwrap_or_else(default_data_dir);
        let cache_path = raw
            .cache_path
            .unwrap_or_else(|| data_dir.join("cache.sqlite"));

        let timezone_name = raw.timezone.unwrap_or_else(|| "Asia/Tokyo".to_string());
        let Ok(timezone) = timezone_name.parse::<Tz>() else {
            bail!("Unknown timezone in config: {timezone_name}");
        };

        Ok(Self {
            script_url,
            data_dir,
            cache_path,
            data_master_id: raw.data_master_id.unwrap_or_else(|| "master".to_string()),
            auth_master_id: raw
                .auth_master_id
                .unwrap_or_else(|| "master".to_string()),
            listen_addr: raw
                .listen_addr
                .unwrap_or_else(|| "127.0.0.1:8787".to_string()),
            timezone,
            cache_ttl: Duration::from_secs(raw.cache_ttl_secs.unwrap_or(21_600)),
            request_timeout: Duration::from_secs(raw.request_timeout_secs.unwrap_or(30)),
            resilience: raw.resilience.resolve(),
            schema: raw.schema,
        })
    }
}

static CONFIG: OnceCell<Config> = OnceCell::new();

/// Install the loaded config as the process-wide instance.
pub fn init(config: Config) -> &'static Config {
    CONFIG.get_or_init(|| config)
}

/// The process-wide config. Panics if [`init`] has not run; main
/// installs it before anything else touches it.
pub fn global() -> &'static Config {
    CONFIG.get().expect("config not initialized")
}
