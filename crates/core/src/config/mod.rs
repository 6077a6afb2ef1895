//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SW_PROXY_*)
//! 2. TOML config file (if SW_PROXY_CONFIG_FILE set, or passed explicitly)
//! 3. Built-in defaults

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::worker::ProxyConfig;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SW_PROXY_*)
/// 2. TOML config file
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite cache storage database.
    ///
    /// Set via SW_PROXY_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin of the application whose requests are proxied.
    ///
    /// Precache paths and the navigation fallback resolve against it.
    /// Set via SW_PROXY_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Cache generation identifier. Bump it on deploy to invalidate
    /// every previously stored entry at the next activation.
    ///
    /// Set via SW_PROXY_CACHE_NAME environment variable.
    #[serde(default = "default_cache_name")]
    pub cache_name: String,

    /// Absolute paths fetched and stored at install time.
    ///
    /// Set via SW_PROXY_PRECACHE environment variable (e.g. `[/favicon.png,/app.css]`).
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// Cached document served when a navigation cannot reach the network.
    ///
    /// Set via SW_PROXY_NAVIGATION_FALLBACK environment variable.
    #[serde(default = "default_navigation_fallback")]
    pub navigation_fallback: String,

    /// User-Agent string for network requests.
    ///
    /// Set via SW_PROXY_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via SW_PROXY_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Network request timeout in milliseconds.
    ///
    /// Set via SW_PROXY_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./sw-proxy-cache.sqlite")
}

fn default_origin() -> String {
    "http://127.0.0.1:5000".into()
}

fn default_cache_name() -> String {
    "keyword-pro-v2".into()
}

fn default_precache() -> Vec<String> {
    vec!["/favicon.png".into()]
}

fn default_navigation_fallback() -> String {
    "/index.html".into()
}

fn default_user_agent() -> String {
    "sw-proxy/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            cache_name: default_cache_name(),
            precache: default_precache(),
            navigation_fallback: default_navigation_fallback(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
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
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SW_PROXY_`
    /// 2. TOML file from `SW_PROXY_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let file = std::env::var("SW_PROXY_CONFIG_FILE").ok().map(PathBuf::from);
        Self::load_from(file.as_deref())
    }

    /// Load configuration using an explicit TOML file instead of `SW_PROXY_CONFIG_FILE`.
    pub fn load_from(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(path) = config_file {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(
            Env::prefixed("SW_PROXY_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Parsed application origin.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `origin` is not an absolute http(s) URL.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(ConfigError::Invalid {
                field: "origin".into(),
                reason: format!("unsupported scheme: {scheme}"),
            }),
        }
    }

    /// Worker settings derived from this configuration.
    pub fn proxy_config(&self) -> Result<ProxyConfig, ConfigError> {
        Ok(ProxyConfig {
            cache_name: self.cache_name.clone(),
            precache: self.precache.clone(),
            navigation_fallback: self.navigation_fallback.clone(),
            origin: self.origin_url()?,
        })
    }
}
