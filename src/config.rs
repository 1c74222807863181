use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio::fs;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,

    /// Interstitial page that blocked top-level navigations are redirected to.
    #[serde(default = "default_block_page")]
    pub block_page: String,

    #[serde(default)]
    pub classifier: ClassifierConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub ledger: LedgerConfig,

    #[serde(default)]
    pub persistence: PersistenceConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub rules: RulesConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClassifierConfig {
    #[serde(default = "default_classifier_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_classifier_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_single_flight")]
    pub single_flight: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LedgerConfig {
    #[serde(default = "default_ledger_capacity")]
    pub capacity: usize,
    #[serde(default = "default_recent")]
    pub recent_default: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PersistenceConfig {
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_enable")]
    pub enable: bool,
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_log_blocked")]
    pub log_blocked: bool,
    #[serde(default = "default_log_all_decisions")]
    pub log_all_decisions: bool,
    #[serde(default = "default_log_sinks")]
    pub sinks: Vec<String>,
}

/// Seed patterns merged into the persisted lists at start-up.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct RulesConfig {
    #[serde(default)]
    pub allowlist: Vec<String>,
    #[serde(default)]
    pub denylist: Vec<String>,
}

// Defaults
fn default_host() -> String {
    "127.0.0.1".to_string()
}
// 8080 belongs to the classifier backend.
fn default_port() -> u16 {
    8081
}
fn default_block_page() -> String {
    "http://127.0.0.1:8081/blocked".to_string()
}
fn default_classifier_endpoint() -> String {
    "http://localhost:8080/analyze/url".to_string()
}
fn default_classifier_timeout_ms() -> u64 {
    5000
}
fn default_user_agent() -> String {
    "UrlSentinel/1.0".to_string()
}
fn default_single_flight() -> bool {
    true
}
fn default_cache_ttl() -> u64 {
    300 // 5 minutes
}
fn default_cache_capacity() -> usize {
    1000
}
fn default_sweep_interval() -> u64 {
    60
}
fn default_ledger_capacity() -> usize {
    100
}
fn default_recent() -> usize {
    10
}
fn default_backend() -> String {
    "sqlite".to_string()
}
fn default_sqlite_path() -> String {
    "url-sentinel.db".to_string()
}
fn default_log_enable() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}
fn default_log_blocked() -> bool {
    true
}
fn default_log_all_decisions() -> bool {
    false
}
fn default_log_sinks() -> Vec<String> {
    vec!["console".to_string()]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            block_page: default_block_page(),
            classifier: ClassifierConfig::default(),
            cache: CacheConfig::default(),
            ledger: LedgerConfig::default(),
            persistence: PersistenceConfig::default(),
            logging: LoggingConfig::default(),
            rules: RulesConfig::default(),
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: default_classifier_endpoint(),
            timeout_ms: default_classifier_timeout_ms(),
            user_agent: default_user_agent(),
            single_flight: default_single_flight(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl(),
            capacity: default_cache_capacity(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            capacity: default_ledger_capacity(),
            recent_default: default_recent(),
        }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            sqlite_path: default_sqlite_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable: default_log_enable(),
            level: default_log_level(),
            format: default_log_format(),
            log_blocked: default_log_blocked(),
            log_all_decisions: default_log_all_decisions(),
            sinks: default_log_sinks(),
        }
    }
}

impl Config {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .context("Failed to read config file")?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("Failed to parse config TOML")?;
        Ok(config)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    pub fn classifier_timeout(&self) -> Duration {
        Duration::from_millis(self.classifier.timeout_ms)
    }
}
