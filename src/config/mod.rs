//! Configuration loading for the listings importer.
//!
//! Loads layered `.env` files and environment variables prefixed with
//! `LISTINGS_`, producing a typed [`AppConfig`].

use std::{collections::BTreeMap, env, fmt, path::PathBuf, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::import::{FailureMode, ImportOptions};

/// Which geocoding service resolves new building addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeocoderProvider {
    #[default]
    Google,
    Nominatim,
}

impl FromStr for GeocoderProvider {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(GeocoderProvider::Google),
            "nominatim" | "osm" => Ok(GeocoderProvider::Nominatim),
            other => Err(format!("unknown geocoder provider '{}'", other)),
        }
    }
}

impl fmt::Display for GeocoderProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeocoderProvider::Google => f.write_str("google"),
            GeocoderProvider::Nominatim => f.write_str("nominatim"),
        }
    }
}

/// Application configuration derived from `LISTINGS_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AppConfig {
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_db_acquire_timeout_ms")]
    pub db_acquire_timeout_ms: u64,
    #[serde(default)]
    pub geocoder_provider: GeocoderProvider,
    /// Overrides the provider's public endpoint (self-hosted Nominatim, proxies)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geocoder_base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geocoder_api_key: Option<String>,
    #[serde(default = "default_geocoder_timeout_ms")]
    pub geocoder_timeout_ms: u64,
    /// Upper bound for each individual store query or insert
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,
    #[serde(default)]
    pub import_failure_mode: FailureMode,
    /// Skip repeated unit numbers inside one address group of a single file
    #[serde(default)]
    pub import_dedupe_within_batch: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            database_url: default_database_url(),
            db_max_connections: default_db_max_connections(),
            db_acquire_timeout_ms: default_db_acquire_timeout_ms(),
            geocoder_provider: GeocoderProvider::default(),
            geocoder_base_url: None,
            geocoder_api_key: None,
            geocoder_timeout_ms: default_geocoder_timeout_ms(),
            store_timeout_ms: default_store_timeout_ms(),
            import_failure_mode: FailureMode::default(),
            import_dedupe_within_batch: false,
        }
    }
}

impl AppConfig {
    /// Returns a redacted JSON representation (secrets are redacted).
    pub fn redacted_json(&self) -> serde_json::Result<String> {
        let mut config = self.clone();
        if config.geocoder_api_key.is_some() {
            config.geocoder_api_key = Some("[REDACTED]".to_string());
        }
        if let Ok(mut url) = Url::parse(&config.database_url)
            && url.password().is_some()
            && url.set_password(Some("[REDACTED]")).is_ok()
        {
            config.database_url = url.to_string();
        }
        serde_json::to_string_pretty(&config)
    }

    /// Options handed to the importer.
    pub fn import_options(&self) -> ImportOptions {
        ImportOptions {
            failure_mode: self.import_failure_mode,
            dedupe_within_batch: self.import_dedupe_within_batch,
            geocode_timeout: Duration::from_millis(self.geocoder_timeout_ms),
            store_timeout: Duration::from_millis(self.store_timeout_ms),
        }
    }

    fn is_dev_profile(&self) -> bool {
        matches!(self.profile.as_str(), "local" | "test")
    }

    /// Validates the configuration, returning an error on out-of-range values
    /// or missing settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.log_format.as_str(), "json" | "pretty") {
            return Err(ConfigError::InvalidLogFormat {
                value: self.log_format.clone(),
            });
        }

        if self.db_max_connections == 0 {
            return Err(ConfigError::InvalidDbMaxConnections {
                value: self.db_max_connections,
            });
        }

        if !(100..=120_000).contains(&self.geocoder_timeout_ms) {
            return Err(ConfigError::InvalidGeocoderTimeout {
                value: self.geocoder_timeout_ms,
            });
        }

        if !(100..=120_000).contains(&self.store_timeout_ms) {
            return Err(ConfigError::InvalidStoreTimeout {
                value: self.store_timeout_ms,
            });
        }

        if let Some(ref base_url) = self.geocoder_base_url {
            Url::parse(base_url).map_err(|source| ConfigError::InvalidGeocoderBaseUrl {
                value: base_url.clone(),
                source,
            })?;
        }

        // Local and test runs may use a stub geocoder; everywhere else Google needs a key.
        if self.geocoder_provider == GeocoderProvider::Google
            && self.geocoder_api_key.is_none()
            && !self.is_dev_profile()
        {
            return Err(ConfigError::MissingGeocoderApiKey);
        }

        Ok(())
    }
}

fn default_profile() -> String {
    "local".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_database_url() -> String {
    "sqlite://listings.db?mode=rwc".to_string()
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_acquire_timeout_ms() -> u64 {
    5000
}

fn default_geocoder_timeout_ms() -> u64 {
    10_000
}

fn default_store_timeout_ms() -> u64 {
    5000
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load environment file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
    #[error("invalid value '{value}' for LISTINGS_{key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("log format must be 'json' or 'pretty', got '{value}'")]
    InvalidLogFormat { value: String },
    #[error("database max connections must be at least 1, got {value}")]
    InvalidDbMaxConnections { value: u32 },
    #[error("geocoder timeout must be between 100 and 120000 ms, got {value}")]
    InvalidGeocoderTimeout { value: u64 },
    #[error("store timeout must be between 100 and 120000 ms, got {value}")]
    InvalidStoreTimeout { value: u64 },
    #[error("invalid geocoder base url '{value}': {source}")]
    InvalidGeocoderBaseUrl {
        value: String,
        source: url::ParseError,
    },
    #[error("geocoder API key is missing; set LISTINGS_GEOCODER_API_KEY")]
    MissingGeocoderApiKey,
}

/// Loads configuration using layered `.env` files and `LISTINGS_*` env vars.
pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    /// Creates a new loader rooted at the current working directory.
    pub fn new() -> Self {
        Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Creates a loader rooted at the provided directory (useful for tests).
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Loads `.env`, `.env.local`, `.env.{profile}`, `.env.{profile}.local`
    /// in that order, then the process environment, and validates the result.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let (mut layered, profile_hint) = self.collect_layered_env()?;

        // Overlay process environment last so it wins.
        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix("LISTINGS_") {
                layered.insert(stripped.to_string(), value);
            }
        }

        let profile = layered
            .remove("PROFILE")
            .filter(|v| !v.is_empty())
            .unwrap_or(profile_hint);
        let log_level = layered
            .remove("LOG_LEVEL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_log_level);
        let log_format = layered
            .remove("LOG_FORMAT")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_log_format);
        let database_url = layered
            .remove("DATABASE_URL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_database_url);
        let db_max_connections =
            parse_number(&mut layered, "DB_MAX_CONNECTIONS", default_db_max_connections)?;
        let db_acquire_timeout_ms =
            parse_number(&mut layered, "DB_ACQUIRE_TIMEOUT_MS", default_db_acquire_timeout_ms)?;

        let geocoder_provider = match layered.remove("GEOCODER_PROVIDER") {
            Some(value) if !value.trim().is_empty() => {
                value
                    .parse()
                    .map_err(|reason| ConfigError::InvalidValue {
                        key: "GEOCODER_PROVIDER",
                        value: value.clone(),
                        reason,
                    })?
            }
            _ => GeocoderProvider::default(),
        };
        let geocoder_base_url = non_empty(layered.remove("GEOCODER_BASE_URL"));
        let geocoder_api_key = non_empty(layered.remove("GEOCODER_API_KEY"));
        let geocoder_timeout_ms =
            parse_number(&mut layered, "GEOCODER_TIMEOUT_MS", default_geocoder_timeout_ms)?;
        let store_timeout_ms =
            parse_number(&mut layered, "STORE_TIMEOUT_MS", default_store_timeout_ms)?;

        let import_failure_mode = match layered.remove("IMPORT_FAILURE_MODE") {
            Some(value) if !value.trim().is_empty() => {
                value
                    .parse()
                    .map_err(|reason| ConfigError::InvalidValue {
                        key: "IMPORT_FAILURE_MODE",
                        value: value.clone(),
                        reason,
                    })?
            }
            _ => FailureMode::default(),
        };
        let import_dedupe_within_batch = match layered.remove("IMPORT_DEDUPE_WITHIN_BATCH") {
            Some(value) => parse_flag(&value).ok_or_else(|| ConfigError::InvalidValue {
                key: "IMPORT_DEDUPE_WITHIN_BATCH",
                value: value.clone(),
                reason: "expected true or false".to_string(),
            })?,
            None => false,
        };

        let config = AppConfig {
            profile,
            log_level,
            log_format,
            database_url,
            db_max_connections,
            db_acquire_timeout_ms,
            geocoder_provider,
            geocoder_base_url,
            geocoder_api_key,
            geocoder_timeout_ms,
            store_timeout_ms,
            import_failure_mode,
            import_dedupe_within_batch,
        };

        config.validate()?;
        Ok(config)
    }

    fn collect_layered_env(&self) -> Result<(BTreeMap<String, String>, String), ConfigError> {
        let mut values = BTreeMap::new();

        self.merge_dotenv(self.base_dir.join(".env"), &mut values)?;
        self.merge_dotenv(self.base_dir.join(".env.local"), &mut values)?;

        let profile = env::var("LISTINGS_PROFILE")
            .ok()
            .or_else(|| values.get("PROFILE").cloned())
            .unwrap_or_else(default_profile);

        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}", &profile)),
            &mut values,
        )?;
        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}.local", &profile)),
            &mut values,
        )?;

        Ok((values, profile))
    }

    fn merge_dotenv(
        &self,
        path: PathBuf,
        values: &mut BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        match dotenvy::from_path_iter(&path) {
            Ok(iter) => {
                for item in iter {
                    let (key, value) = item.map_err(|source| ConfigError::EnvFile {
                        path: path.clone(),
                        source,
                    })?;
                    if let Some(stripped) = key.strip_prefix("LISTINGS_") {
                        values.insert(stripped.to_string(), value);
                    }
                }
                Ok(())
            }
            Err(dotenvy::Error::Io(ref io_err))
                if io_err.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(())
            }
            Err(err) => Err(ConfigError::EnvFile { path, source: err }),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|val| {
        let trimmed = val.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Reads a numeric key; blank or absent falls back to `default`.
fn parse_number<T>(
    layered: &mut BTreeMap<String, String>,
    key: &'static str,
    default: fn() -> T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match layered.remove(key) {
        Some(value) if !value.trim().is_empty() => {
            value
                .trim()
                .parse()
                .map_err(|err: T::Err| ConfigError::InvalidValue {
                    key,
                    reason: err.to_string(),
                    value,
                })
        }
        _ => Ok(default()),
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
