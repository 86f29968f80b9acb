//! Configuration management
//!
//! Settings are resolved in the following order:
//! 1. Environment variables
//! 2. `event-fetcher.toml` configuration file
//! 3. Built-in defaults
//!
//! Inside the configuration file, `${VAR_NAME}` expands to the value of the
//! named environment variable.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::Error;

/// Main configuration for the event fetcher service
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Redis broker configuration
    #[serde(default)]
    pub redis: RedisConfig,

    /// Facebook Graph API credentials
    #[serde(default)]
    pub facebook: FacebookConfig,

    /// Fetch and scheduling limits
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Default log level directive (RUST_LOG takes precedence)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Port for the HTTP API server
    #[serde(default = "default_api_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: default_api_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis host name
    #[serde(default = "default_redis_host")]
    pub host: String,

    /// Redis port
    #[serde(default = "default_redis_port")]
    pub port: u16,

    /// Full connection URL; overrides host/port when set
    pub url: Option<String>,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: default_redis_host(),
            port: default_redis_port(),
            url: None,
        }
    }
}

impl RedisConfig {
    /// Effective connection URL
    pub fn url(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => format!("redis://{}:{}", self.host, self.port),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FacebookConfig {
    /// Facebook app ID
    pub app_id: Option<String>,

    /// Facebook app secret
    pub app_secret: Option<String>,

    /// Graph API access token
    pub access_token: Option<String>,
}

impl FacebookConfig {
    /// Whether a Graph API token can be resolved from the configuration,
    /// either directly or as the `{app_id}|{app_secret}` app token.
    pub fn has_credentials(&self) -> bool {
        let set = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        set(&self.access_token) || (set(&self.app_id) && set(&self.app_secret))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Default per-page fetch interval in seconds
    #[serde(default = "default_fetch_interval")]
    pub interval_secs: u64,

    /// Maximum pages processed in a single scheduler pass
    #[serde(default = "default_max_pages_per_fetch")]
    pub max_pages_per_fetch: usize,

    /// Maximum events requested per page fetch
    #[serde(default = "default_max_events_per_page")]
    pub max_events_per_page: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_fetch_interval(),
            max_pages_per_fetch: default_max_pages_per_fetch(),
            max_events_per_page: default_max_events_per_page(),
        }
    }
}

fn default_api_port() -> u16 {
    8000
}

fn default_db_path() -> String {
    "data/event-fetcher.db".to_string()
}

fn default_redis_host() -> String {
    "redis".to_string()
}

fn default_redis_port() -> u16 {
    6379
}

fn default_fetch_interval() -> u64 {
    3600
}

fn default_max_pages_per_fetch() -> usize {
    10
}

fn default_max_events_per_page() -> usize {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Expand `${VAR_NAME}` references to environment variable values.
    ///
    /// Unknown variables expand to the empty string.
    fn expand_env_vars(value: &str) -> String {
        let mut result = String::new();
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next(); // consume '{'

                let mut var_name = String::new();
                while let Some(&c) = chars.peek() {
                    if c == '}' {
                        chars.next(); // consume '}'
                        break;
                    }
                    var_name.push(chars.next().unwrap());
                }

                if let Ok(env_value) = std::env::var(&var_name) {
                    result.push_str(&env_value);
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    /// Load configuration from a TOML file.
    ///
    /// `${VAR_NAME}` references in the file are expanded before parsing, and
    /// environment variables take precedence over file values.
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let toml_content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let expanded_content = Self::expand_env_vars(&toml_content);

        let mut config: Config = toml::from_str(&expanded_content)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;

        config.apply_env_overrides();

        Ok(config)
    }

    /// Load configuration from the default locations.
    ///
    /// Reads `./event-fetcher.toml` when present, otherwise falls back to
    /// environment variables over built-in defaults.
    pub fn load() -> crate::Result<Self> {
        if Path::new("event-fetcher.toml").exists() {
            return Self::from_toml_file("event-fetcher.toml");
        }

        Ok(Self::from_env())
    }

    /// Load configuration from environment variables only.
    ///
    /// No variable is required; defaults cover everything.
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Override settings from environment variables
    fn apply_env_overrides(&mut self) {
        if let Ok(port) = std::env::var("API_PORT") {
            if let Ok(p) = port.parse() {
                self.api.port = p;
            }
        }

        if let Ok(path) = std::env::var("DB_PATH") {
            self.database.db_path = path;
        }

        if let Ok(host) = std::env::var("REDIS_HOST") {
            self.redis.host = host;
        }
        if let Ok(port) = std::env::var("REDIS_PORT") {
            if let Ok(p) = port.parse() {
                self.redis.port = p;
            }
        }
        if let Ok(url) = std::env::var("REDIS_URL") {
            self.redis.url = Some(url);
        }

        if let Ok(app_id) = std::env::var("FACEBOOK_APP_ID") {
            self.facebook.app_id = Some(app_id);
        }
        if let Ok(app_secret) = std::env::var("FACEBOOK_APP_SECRET") {
            self.facebook.app_secret = Some(app_secret);
        }
        if let Ok(token) = std::env::var("FACEBOOK_ACCESS_TOKEN") {
            self.facebook.access_token = Some(token);
        }

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            if !level.is_empty() {
                self.log_level = level;
            }
        }

        if let Ok(interval) = std::env::var("FETCH_INTERVAL") {
            if let Ok(secs) = interval.parse() {
                self.fetch.interval_secs = secs;
            }
        }
        if let Ok(max) = std::env::var("MAX_PAGES_PER_FETCH") {
            if let Ok(n) = max.parse() {
                self.fetch.max_pages_per_fetch = n;
            }
        }
        if let Ok(max) = std::env::var("MAX_EVENTS_PER_PAGE") {
            if let Ok(n) = max.parse() {
                self.fetch.max_events_per_page = n;
            }
        }
    }
}
