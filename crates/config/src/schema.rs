use figment::{
    Figment,
    providers::{Env, Format as _, Serialized, Yaml},
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Prefix for environment overrides (`NETDESK_RETRY__MAX_RETRIES=5`).
const ENV_PREFIX: &str = "NETDESK_";

fn default_base_url() -> String {
    "http://127.0.0.1:8000/api/v1".to_string()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_refresh_threshold_secs() -> u64 {
    120
}
fn default_login_path() -> String {
    "/auth/login".to_string()
}
fn default_register_path() -> String {
    "/auth/register".to_string()
}
fn default_refresh_path() -> String {
    "/auth/refresh".to_string()
}
fn default_logout_path() -> String {
    "/auth/logout".to_string()
}
fn default_max_retries() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    1000
}
fn default_polling_paths() -> Vec<String> {
    vec!["/status".to_string(), "/poll".to_string()]
}
fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}

/// Auth endpoint locations and the proactive refresh window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Refresh this many seconds before the access token expires (defaults to 120).
    #[serde(default = "default_refresh_threshold_secs")]
    pub refresh_threshold_secs: u64,
    #[serde(default = "default_login_path")]
    pub login_path: String,
    #[serde(default = "default_register_path")]
    pub register_path: String,
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,
    #[serde(default = "default_logout_path")]
    pub logout_path: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            refresh_threshold_secs: default_refresh_threshold_secs(),
            login_path: default_login_path(),
            register_path: default_register_path(),
            refresh_path: default_refresh_path(),
            logout_path: default_logout_path(),
        }
    }
}

impl AuthConfig {
    #[must_use]
    pub fn refresh_threshold(&self) -> Duration {
        Duration::from_secs(self.refresh_threshold_secs)
    }

    /// Endpoints that precede CSRF issuance and never carry the CSRF header.
    #[must_use]
    pub fn csrf_exempt_paths(&self) -> Vec<String> {
        vec![
            self.login_path.clone(),
            self.register_path.clone(),
            self.refresh_path.clone(),
            self.logout_path.clone(),
        ]
    }
}

/// Transient-failure retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum replays after the first attempt (defaults to 3).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Backoff unit; attempt `n` waits `n * base_delay_ms` (defaults to 1000).
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Path fragments identifying polling endpoints whose 429 is never retried.
    #[serde(default = "default_polling_paths")]
    pub polling_paths: Vec<String>,
    /// Retry POST/PATCH under the same policy as idempotent methods (defaults to `true`).
    #[serde(default = "default_true")]
    pub retry_non_idempotent: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            polling_paths: default_polling_paths(),
            retry_non_idempotent: true,
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` directive (defaults to `info`).
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    /// Write logs to this file instead of stderr.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            file: None,
        }
    }
}

/// Top-level client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API root every request path is appended to.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Active tenant slug; absent for a platform-level caller.
    #[serde(default)]
    pub tenant: Option<String>,
    /// Per-request transport timeout (defaults to 10).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            tenant: None,
            timeout_secs: default_timeout_secs(),
            auth: AuthConfig::default(),
            retry: RetryConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Config {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Parses configuration from a YAML string, merged with defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`figment::Error`] if the YAML is invalid or extraction fails.
    #[allow(clippy::result_large_err)]
    pub fn from_yaml(yaml: &str) -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Yaml::string(yaml))
            .extract()
    }

    /// Loads configuration from a file path, merged with defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`figment::Error`] if the file cannot be read or parsed.
    #[allow(clippy::result_large_err)]
    pub fn from_file(path: &std::path::Path) -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .extract()
    }

    /// Loads defaults, then the optional YAML file, then `NETDESK_*` environment
    /// overrides (`__` separates nested keys).
    ///
    /// # Errors
    ///
    /// Returns a [`figment::Error`] if any layer cannot be read or parsed.
    #[allow(clippy::result_large_err)]
    pub fn load(path: Option<&std::path::Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
    }
}
