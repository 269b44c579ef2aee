//! Configuration management for the Away service
//!
//! Handles loading configuration from files and environment variables,
//! and validates it once at startup so a misconfigured process never
//! starts serving requests.

use crate::AwayError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Older variable names still honored for the geocoding key
const LEGACY_GEOCODING_KEY_VARS: [&str; 2] = ["BACKEND_GOOGLE_API_KEY", "GOOGLE_MAPS_API_KEY"];

/// Root configuration structure for the Away service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AwayConfig {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Geocoding provider settings
    #[serde(default)]
    pub geocoding: GeocodingConfig,
    /// Caption provider settings
    #[serde(default)]
    pub caption: CaptionConfig,
    /// NER service settings
    #[serde(default)]
    pub ner: NerConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind
    #[serde(default = "default_server_host")]
    pub host: String,
    /// Port to bind
    #[serde(default = "default_server_port")]
    pub port: u16,
    /// Largest accepted request body
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

/// Geocoding provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingConfig {
    /// Google Geocoding API key
    pub api_key: Option<String>,
    /// Geocoding endpoint
    #[serde(default = "default_geocoding_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_geocoding_timeout")]
    pub timeout_seconds: u64,
}

/// Which backend fetches captions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionProviderKind {
    /// Apify Instagram scraper actor
    #[default]
    Apify,
    /// Instagram web endpoints with a logged-in session
    Instagram,
}

/// Caption provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionConfig {
    #[serde(default)]
    pub provider: CaptionProviderKind,
    /// Apify API token
    pub apify_token: Option<String>,
    /// Apify actor that scrapes a single post
    #[serde(default = "default_apify_actor")]
    pub apify_actor: String,
    /// Apify API root
    #[serde(default = "default_apify_base_url")]
    pub apify_base_url: String,
    /// Instagram `sessionid` cookie
    pub session_id: Option<String>,
    /// Instagram web root
    #[serde(default = "default_instagram_base_url")]
    pub instagram_base_url: String,
    /// Attempts before giving up on a rate-limited provider
    #[serde(default = "default_caption_max_attempts")]
    pub max_attempts: u32,
    /// First backoff delay in milliseconds, doubled after each attempt
    #[serde(default = "default_caption_base_delay")]
    pub base_delay_ms: u64,
    /// Request timeout in seconds
    #[serde(default = "default_caption_timeout")]
    pub timeout_seconds: u64,
}

/// NER service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NerConfig {
    /// Endpoint accepting `{"text": ..}` and returning labeled entities
    #[serde(default = "default_ner_url")]
    pub url: String,
    /// Model name forwarded to the service
    pub model: Option<String>,
    /// Request timeout in seconds
    #[serde(default = "default_ner_timeout")]
    pub timeout_seconds: u64,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_server_host() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_max_body_bytes() -> usize {
    64 * 1024
}

fn default_geocoding_base_url() -> String {
    "https://maps.googleapis.com/maps/api/geocode/json".to_string()
}

fn default_geocoding_timeout() -> u64 {
    15
}

fn default_apify_actor() -> String {
    "apify~instagram-scraper".to_string()
}

fn default_apify_base_url() -> String {
    "https://api.apify.com/v2".to_string()
}

fn default_instagram_base_url() -> String {
    "https://www.instagram.com".to_string()
}

fn default_caption_max_attempts() -> u32 {
    3
}

fn default_caption_base_delay() -> u64 {
    2000
}

fn default_caption_timeout() -> u64 {
    60
}

fn default_ner_url() -> String {
    "http://127.0.0.1:8001/ner".to_string()
}

fn default_ner_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_geocoding_base_url(),
            timeout_seconds: default_geocoding_timeout(),
        }
    }
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            provider: CaptionProviderKind::default(),
            apify_token: None,
            apify_actor: default_apify_actor(),
            apify_base_url: default_apify_base_url(),
            session_id: None,
            instagram_base_url: default_instagram_base_url(),
            max_attempts: default_caption_max_attempts(),
            base_delay_ms: default_caption_base_delay(),
            timeout_seconds: default_caption_timeout(),
        }
    }
}

impl Default for NerConfig {
    fn default() -> Self {
        Self {
            url: default_ner_url(),
            model: None,
            timeout_seconds: default_ner_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl GeocodingConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl CaptionConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    #[must_use]
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

impl NerConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl AwayConfig {
    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        // Load from file if path is provided or use default location
        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path()
                .filter(|path| path.exists())
                .unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // Environment overrides, e.g. AWAY_GEOCODING__API_KEY
        builder = builder.add_source(
            Environment::with_prefix("AWAY")
                .prefix_separator("_")
                .separator("__"),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let port_configured = port_is_configured(&settings);
        let mut config: AwayConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_env_fallbacks(port_configured, |name| std::env::var(name).ok());
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("away").join("config.toml"))
    }

    /// Fill gaps from variables that live outside the `AWAY_` namespace.
    ///
    /// `PORT` is only honoured when neither the config file nor
    /// `AWAY_SERVER__PORT` set a port.
    pub fn apply_env_fallbacks<F>(&mut self, port_configured: bool, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.geocoding.api_key.as_deref().is_none_or(str::is_empty) {
            self.geocoding.api_key = LEGACY_GEOCODING_KEY_VARS
                .iter()
                .find_map(|name| lookup(name).filter(|value| !value.is_empty()));
        }

        // Cloud Run and friends hand the port over in PORT
        if port_configured {
            return;
        }
        if let Some(port) = lookup("PORT").and_then(|p| p.parse::<u16>().ok()) {
            self.server.port = port;
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_credentials()?;
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate API keys and provider credentials
    pub fn validate_credentials(&self) -> Result<()> {
        if self.geocoding.api_key.as_deref().is_none_or(str::is_empty) {
            return Err(AwayError::config(
                "Missing geocoding API key. Set AWAY_GEOCODING__API_KEY or BACKEND_GOOGLE_API_KEY.",
            )
            .into());
        }

        match self.caption.provider {
            CaptionProviderKind::Apify => {
                if self.caption.apify_token.as_deref().is_none_or(str::is_empty) {
                    return Err(AwayError::config(
                        "Caption provider 'apify' requires AWAY_CAPTION__APIFY_TOKEN",
                    )
                    .into());
                }
            }
            CaptionProviderKind::Instagram => {
                if self.caption.session_id.as_deref().is_none_or(str::is_empty) {
                    return Err(AwayError::config(
                        "Caption provider 'instagram' requires AWAY_CAPTION__SESSION_ID",
                    )
                    .into());
                }
            }
        }

        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.caption.max_attempts == 0 || self.caption.max_attempts > 10 {
            return Err(
                AwayError::config("Caption max attempts must be between 1 and 10").into(),
            );
        }

        for (name, seconds) in [
            ("Geocoding", self.geocoding.timeout_seconds),
            ("Caption", self.caption.timeout_seconds),
            ("NER", self.ner.timeout_seconds),
        ] {
            if seconds == 0 || seconds > 300 {
                return Err(AwayError::config(format!(
                    "{name} timeout must be between 1 and 300 seconds"
                ))
                .into());
            }
        }

        if self.server.max_body_bytes == 0 {
            return Err(AwayError::config("Server max body size cannot be zero").into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(AwayError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(AwayError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        for (name, url) in [
            ("Geocoding base URL", &self.geocoding.base_url),
            ("Apify base URL", &self.caption.apify_base_url),
            ("Instagram base URL", &self.caption.instagram_base_url),
            ("NER URL", &self.ner.url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(AwayError::config(format!(
                    "{name} must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        Ok(())
    }
}

fn port_is_configured(settings: &Config) -> bool {
    settings.get::<u16>("server.port").is_ok()
}
