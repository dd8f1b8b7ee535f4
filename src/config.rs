//! Configuration loader — merges env vars, .env file, and config.toml.

use std::path::Path;

use serde::{Deserialize, Serialize};

use common::Error;

/// Top-level service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Amadeus API credentials and environment.
    #[serde(default)]
    pub amadeus: AmadeusConfig,

    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Calendar cache windows and limits.
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmadeusConfig {
    /// Amadeus API key.
    #[serde(default)]
    pub api_key: String,

    /// Amadeus API secret.
    #[serde(default)]
    pub api_secret: String,

    /// Use the test environment (true) or production (false).
    #[serde(default = "default_true")]
    pub use_test: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Listen port.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// All values in seconds unless noted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// How long a computed calendar is served without any recomputation.
    #[serde(default = "default_fresh_secs")]
    pub fresh_secs: u64,

    /// How long past freshness a calendar may be served while a
    /// background refresh runs. Must exceed `fresh_secs`.
    #[serde(default = "default_stale_secs")]
    pub stale_secs: u64,

    /// Cache entry cap before expired entries are purged.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Per fare-lookup timeout.
    #[serde(default = "default_lookup_timeout_secs")]
    pub lookup_timeout_secs: u64,
}

// ── Defaults ──────────────────────────────────────────────────────────

fn default_true() -> bool {
    true
}

fn default_host() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    3000
}

fn default_fresh_secs() -> u64 {
    60 * 60
}

fn default_stale_secs() -> u64 {
    6 * 60 * 60
}

fn default_max_entries() -> usize {
    512
}

fn default_lookup_timeout_secs() -> u64 {
    20
}

impl Default for AmadeusConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_secret: String::new(),
            use_test: default_true(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            fresh_secs: default_fresh_secs(),
            stale_secs: default_stale_secs(),
            max_entries: default_max_entries(),
            lookup_timeout_secs: default_lookup_timeout_secs(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            amadeus: AmadeusConfig::default(),
            server: ServerConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

// ── Loading ───────────────────────────────────────────────────────────

fn parse_bool(raw: &str) -> bool {
    let lowered = raw.trim().to_ascii_lowercase();
    lowered != "0" && lowered != "false" && lowered != "no" && lowered != "off"
}

fn parse_positive_u64(raw: &str, env_name: &str) -> Result<u64, Error> {
    let parsed = raw
        .trim()
        .parse::<u64>()
        .map_err(|_| Error::Config(format!("{env_name} must be an integer > 0")))?;
    if parsed == 0 {
        return Err(Error::Config(format!("{env_name} must be an integer > 0")));
    }
    Ok(parsed)
}

fn validate_config(config: &AppConfig) -> Result<(), Error> {
    let mut issues: Vec<String> = Vec::new();

    if config.amadeus.api_key.is_empty() {
        issues.push("AMADEUS_API_KEY is required (set in .env or environment)".into());
    }
    if config.amadeus.api_secret.is_empty() {
        issues.push("AMADEUS_API_SECRET is required (set in .env or environment)".into());
    }

    if config.cache.fresh_secs == 0 {
        issues.push("cache.fresh_secs must be > 0".into());
    }
    if config.cache.stale_secs <= config.cache.fresh_secs {
        issues.push("cache.stale_secs must be > cache.fresh_secs".into());
    }
    if config.cache.max_entries == 0 {
        issues.push("cache.max_entries must be > 0".into());
    }
    if config.cache.lookup_timeout_secs == 0 {
        issues.push("cache.lookup_timeout_secs must be > 0".into());
    }

    if config.server.host.trim().is_empty() {
        issues.push("server.host must not be empty".into());
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "Invalid config:\n - {}",
            issues.join("\n - ")
        )))
    }
}

/// Load service configuration from environment and optional config file.
pub fn load_config() -> Result<AppConfig, Error> {
    // 1. Load .env file from project root or parent directories.
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }

    // 2. Start with defaults.
    let mut config = AppConfig::default();

    // 3. Try loading config.toml if it exists.
    let config_path = Path::new("config.toml");
    if config_path.exists() {
        let contents = std::fs::read_to_string(config_path)
            .map_err(|e| Error::Config(format!("Failed to read config.toml: {}", e)))?;
        config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config.toml: {}", e)))?;
    }

    // 4. Override with environment variables (highest priority).
    if let Ok(key) = std::env::var("AMADEUS_API_KEY") {
        config.amadeus.api_key = key;
    }
    if let Ok(secret) = std::env::var("AMADEUS_API_SECRET") {
        config.amadeus.api_secret = secret;
    }
    if let Ok(raw) = std::env::var("AMADEUS_USE_TEST") {
        config.amadeus.use_test = parse_bool(&raw);
    }
    if let Ok(host) = std::env::var("FARECAL_HOST") {
        let trimmed = host.trim();
        if !trimmed.is_empty() {
            config.server.host = trimmed.to_string();
        }
    }
    if let Ok(raw) = std::env::var("FARECAL_PORT") {
        config.server.port = raw
            .trim()
            .parse::<u16>()
            .map_err(|_| Error::Config("FARECAL_PORT must be a port number".into()))?;
    }
    if let Ok(raw) = std::env::var("FARECAL_CACHE_FRESH_SECS") {
        config.cache.fresh_secs = parse_positive_u64(&raw, "FARECAL_CACHE_FRESH_SECS")?;
    }
    if let Ok(raw) = std::env::var("FARECAL_CACHE_STALE_SECS") {
        config.cache.stale_secs = parse_positive_u64(&raw, "FARECAL_CACHE_STALE_SECS")?;
    }
    if let Ok(raw) = std::env::var("FARECAL_CACHE_MAX_ENTRIES") {
        config.cache.max_entries =
            parse_positive_u64(&raw, "FARECAL_CACHE_MAX_ENTRIES")? as usize;
    }
    if let Ok(raw) = std::env::var("FARECAL_LOOKUP_TIMEOUT_SECS") {
        config.cache.lookup_timeout_secs =
            parse_positive_u64(&raw, "FARECAL_LOOKUP_TIMEOUT_SECS")?;
    }

    // 5. Validate.
    validate_config(&config)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_creds() -> AppConfig {
        let mut config = AppConfig::default();
        config.amadeus.api_key = "key".into();
        config.amadeus.api_secret = "secret".into();
        config
    }

    #[test]
    fn test_defaults_validate_once_credentials_set() {
        assert!(validate_config(&config_with_creds()).is_ok());
    }

    #[test]
    fn test_missing_credentials_rejected() {
        assert!(validate_config(&AppConfig::default()).is_err());
    }

    #[test]
    fn test_stale_window_must_exceed_fresh_window() {
        let mut config = config_with_creds();
        config.cache.stale_secs = config.cache.fresh_secs;
        assert!(validate_config(&config).is_err());
    }
}
