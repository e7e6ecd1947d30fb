//! Application configuration with layered loading.
//!
//! Uses figment to merge, from lowest to highest precedence:
//!
//! 1. Built-in defaults
//! 2. TOML config file (if OFFCACHE_CONFIG_FILE set)
//! 3. Environment variables (OFFCACHE_*)

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Name of the cache that receives network responses and precached entries.
    ///
    /// Bump it (e.g. `app-cache-v2`) to start from an empty cache.
    #[serde(default = "default_cache_name")]
    pub cache_name: String,

    /// Path to SQLite cache database.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Base URL that relative identities (`/app.js`) are resolved against.
    #[serde(default)]
    pub origin: Option<String>,

    /// Identities added to the cache at startup, in order.
    ///
    /// Easiest to set from the TOML file; env form is `OFFCACHE_PRECACHE='["/index.html"]'`.
    #[serde(default)]
    pub precache: Vec<String>,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Default for consulting the cache before the network.
    #[serde(default = "default_true")]
    pub prefer_cache_first: bool,

    /// Default for refreshing cache hits from the network in the background.
    #[serde(default = "default_true")]
    pub refresh_in_background: bool,

    /// Default for ignoring the adaptive cache-first switch.
    #[serde(default)]
    pub ignore_adaptive_flag: bool,
}

fn default_cache_name() -> String {
    "app-cache-v1".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./offcache.sqlite")
}

fn default_user_agent() -> String {
    "offcache/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_name: default_cache_name(),
            db_path: default_db_path(),
            origin: None,
            precache: Vec::new(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            prefer_cache_first: true,
            refresh_in_background: true,
            ignore_adaptive_flag: false,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("OFFCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("OFFCACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Parsed `origin`, if one is configured.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `origin` is not an absolute http(s) URL.
    pub fn origin_url(&self) -> Result<Option<url::Url>, ConfigError> {
        let Some(origin) = self.origin.as_deref() else {
            return Ok(None);
        };

        let parsed = url::Url::parse(origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })?;

        match parsed.scheme() {
            "http" | "https" => Ok(Some(parsed)),
            scheme => Err(ConfigError::Invalid {
                field: "origin".into(),
                reason: format!("unsupported scheme: {scheme}"),
            }),
        }
    }
}
