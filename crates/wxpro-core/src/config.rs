use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::error::ConfigError;

/// Environment variable that overrides any stored API key.
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

const KEYRING_SERVICE: &str = "wxpro";
const KEYRING_USER: &str = "openweathermap";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Unit system requested from the weather provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    #[default]
    Celsius,
    Fahrenheit,
}

impl UnitSystem {
    /// Value of the provider's `units` query parameter.
    pub fn api_param(self) -> &'static str {
        match self {
            UnitSystem::Celsius => "metric",
            UnitSystem::Fahrenheit => "imperial",
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            UnitSystem::Celsius => "°C",
            UnitSystem::Fahrenheit => "°F",
        }
    }

    pub fn wind_speed_label(self) -> &'static str {
        match self {
            UnitSystem::Celsius => "m/s",
            UnitSystem::Fahrenheit => "mph",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            UnitSystem::Celsius => UnitSystem::Fahrenheit,
            UnitSystem::Fahrenheit => UnitSystem::Celsius,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory
    pub config_dir: PathBuf,

    /// Weather provider endpoint and credential settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Weather behavior settings
    #[serde(default)]
    pub weather: WeatherConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Provider root, e.g. https://api.openweathermap.org
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Stored credential. Prefer the environment variable or the keyring;
    /// this field exists for local setups and is never written by default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Bound on every weather/geocoding HTTP request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.openweathermap.org".to_string()
}

fn default_request_timeout_secs() -> u64 {
    20
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Resolve the API key: environment first, then this config, then the
    /// system keyring.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                return Some(key.trim().to_string());
            }
        }

        if let Some(key) = self.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            return Some(key.trim().to_string());
        }

        let entry = match keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!("Keyring unavailable: {}", e);
                return None;
            }
        };
        match entry.get_password() {
            Ok(key) => Some(key),
            Err(keyring::Error::NoEntry) => None,
            Err(e) => {
                tracing::debug!("Failed to read API key from keyring: {}", e);
                None
            }
        }
    }

    /// Store the API key in the system keyring.
    pub fn store_api_key(key: &str) -> Result<()> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER)
            .context("Failed to open keyring entry")?;
        entry
            .set_password(key.trim())
            .context("Failed to store API key in keyring")?;
        tracing::info!("Stored API key in system keyring");
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Unit system used until the user toggles it
    #[serde(default)]
    pub units: UnitSystem,

    /// Quiet period after the last keystroke before suggestions are fetched
    #[serde(default = "default_suggest_debounce_ms")]
    pub suggest_debounce_ms: u64,

    /// Shorter (trimmed) queries never hit the geocoding endpoint
    #[serde(default = "default_min_query_len")]
    pub min_query_len: usize,

    #[serde(default = "default_suggestion_limit")]
    pub suggestion_limit: u8,

    #[serde(default = "default_geolocation_timeout_secs")]
    pub geolocation_timeout_secs: u64,

    /// Days of forecast kept, today included (max 7)
    #[serde(default = "default_forecast_days")]
    pub forecast_days: usize,

    /// Forecast endpoints tried in order; the first success wins
    #[serde(default = "default_forecast_endpoints")]
    pub forecast_endpoints: Vec<String>,

    #[serde(default = "default_detect_location_on_start")]
    pub detect_location_on_start: bool,
}

fn default_suggest_debounce_ms() -> u64 {
    450
}

fn default_min_query_len() -> usize {
    3
}

fn default_suggestion_limit() -> u8 {
    5
}

fn default_geolocation_timeout_secs() -> u64 {
    10
}

fn default_forecast_days() -> usize {
    7
}

fn default_forecast_endpoints() -> Vec<String> {
    vec!["data/3.0/onecall".to_string(), "data/2.5/onecall".to_string()]
}

fn default_detect_location_on_start() -> bool {
    true
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            units: UnitSystem::default(),
            suggest_debounce_ms: default_suggest_debounce_ms(),
            min_query_len: default_min_query_len(),
            suggestion_limit: default_suggestion_limit(),
            geolocation_timeout_secs: default_geolocation_timeout_secs(),
            forecast_days: default_forecast_days(),
            forecast_endpoints: default_forecast_endpoints(),
            detect_location_on_start: default_detect_location_on_start(),
        }
    }
}

impl WeatherConfig {
    pub fn suggest_debounce(&self) -> Duration {
        Duration::from_millis(self.suggest_debounce_ms)
    }

    pub fn geolocation_timeout(&self) -> Duration {
        Duration::from_secs(self.geolocation_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("wxpro");

        Self {
            config_dir,
            api: ApiConfig::default(),
            weather: WeatherConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if missing
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, writing defaults there if it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let mut config = Self::default();
            if let Some(parent) = path.parent() {
                config.config_dir = parent.to_path_buf();
            }
            config.save_to(path)?;
            tracing::info!("Created default config at {}", path.display());
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents).map_err(|e| {
            ConfigError::ParseError(format!("{}: {}", path.display(), e.message()))
        })?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        Self::load_validated_from(&Self::config_path()?)
    }

    pub fn load_validated_from(path: &Path) -> Result<(Self, ValidationResult)> {
        let config = Self::load_from(path)?;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.api.base_url, "api.base_url", &mut result);

        if self.api.request_timeout_secs == 0 {
            result.add_error(
                "api.request_timeout_secs",
                "Request timeout must be greater than 0",
            );
        }

        if self.api.resolve_api_key().is_none() {
            result.add_warning(
                "api.api_key",
                format!(
                    "No API key configured (set {} or store one in the keyring)",
                    API_KEY_ENV
                ),
            );
        }

        let weather = &self.weather;
        if !(100..=2000).contains(&weather.suggest_debounce_ms) {
            result.add_warning(
                "weather.suggest_debounce_ms",
                "Debounce outside 100-2000 ms; suggestions may feel laggy or flood the API",
            );
        }

        if weather.min_query_len == 0 {
            result.add_warning(
                "weather.min_query_len",
                "Every keystroke will trigger a geocoding lookup",
            );
        }

        if weather.suggestion_limit == 0 {
            result.add_error(
                "weather.suggestion_limit",
                "Suggestion limit must be greater than 0",
            );
        }

        if weather.geolocation_timeout_secs == 0 {
            result.add_error(
                "weather.geolocation_timeout_secs",
                "Geolocation timeout must be greater than 0",
            );
        }

        if weather.forecast_days == 0 || weather.forecast_days > 7 {
            result.add_error(
                "weather.forecast_days",
                "Forecast days must be between 1 and 7",
            );
        }

        if weather.forecast_endpoints.is_empty() {
            result.add_warning(
                "weather.forecast_endpoints",
                "No forecast endpoints configured; forecasts will be unavailable",
            );
        }

        result
    }

    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("wxpro");

        Ok(config_dir.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_default_config() {
        let config = Config::default();
        let result = config.validate();
        // Missing API key is only a warning
        assert!(result.is_valid(), "Default config should be valid: {:?}", result.errors);
    }

    #[test]
    fn test_invalid_base_url() {
        let mut config = Config::default();
        config.api.base_url = "not-a-url".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "api.base_url"));
    }

    #[test]
    fn test_invalid_url_scheme() {
        let mut config = Config::default();
        config.api.base_url = "ftp://api.openweathermap.org".to_string();
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.message.contains("http or https")));
    }

    #[test]
    fn test_forecast_days_bounds() {
        let mut config = Config::default();
        config.weather.forecast_days = 8;
        assert!(!config.validate().is_valid());

        config.weather.forecast_days = 0;
        assert!(!config.validate().is_valid());

        config.weather.forecast_days = 5;
        assert!(config.validate().is_valid());
    }

    #[test]
    fn test_zero_timeouts_are_errors() {
        let mut config = Config::default();
        config.api.request_timeout_secs = 0;
        config.weather.geolocation_timeout_secs = 0;
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.field == "api.request_timeout_secs"));
        assert!(result
            .errors
            .iter()
            .any(|e| e.field == "weather.geolocation_timeout_secs"));
    }

    #[test]
    fn test_empty_forecast_endpoints_is_warning() {
        let mut config = Config::default();
        config.weather.forecast_endpoints.clear();
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result
            .warnings
            .iter()
            .any(|w| w.field == "weather.forecast_endpoints"));
    }

    #[test]
    fn test_config_api_key_is_used_when_present() {
        let mut api = ApiConfig::default();
        api.api_key = Some("  abc123 ".to_string());
        if std::env::var(API_KEY_ENV).is_err() {
            assert_eq!(api.resolve_api_key().as_deref(), Some("abc123"));
        }
    }

    #[test]
    fn test_unit_system_params() {
        assert_eq!(UnitSystem::default(), UnitSystem::Celsius);
        assert_eq!(UnitSystem::Celsius.api_param(), "metric");
        assert_eq!(UnitSystem::Fahrenheit.api_param(), "imperial");
        assert_eq!(UnitSystem::Celsius.toggled(), UnitSystem::Fahrenheit);
        assert_eq!(UnitSystem::Fahrenheit.wind_speed_label(), "mph");
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.config_dir, dir.path());
        assert_eq!(config.weather.forecast_endpoints.len(), 2);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "config_dir = \"/tmp/wxpro\"\n\n[weather]\nunits = \"fahrenheit\"\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.weather.units, UnitSystem::Fahrenheit);
        assert_eq!(config.weather.suggest_debounce_ms, 450);
        assert_eq!(config.api.base_url, "https://api.openweathermap.org");
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[weather]\nunits = 3\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        let config_err = err.downcast_ref::<ConfigError>().unwrap();
        assert!(matches!(config_err, ConfigError::ParseError(msg) if msg.contains("config.toml")));
        assert_eq!(
            config_err.user_message(),
            "Configuration file is malformed. Check your settings."
        );
    }

    #[test]
    fn test_out_of_range_file_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "config_dir = \"/tmp/wxpro\"\n\n[weather]\nforecast_days = 9\n",
        )
        .unwrap();

        let err = Config::load_validated_from(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::Invalid(summary)) if summary.contains("weather.forecast_days")
        ));
    }

    #[test]
    fn test_save_omits_missing_api_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        Config::default().save_to(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(!contents.contains("api_key"));
    }

    #[test]
    fn test_validation_result_error_summary() {
        let mut result = ValidationResult::default();
        result.add_error("field1", "error1");
        result.add_error("field2", "error2");
        let summary = result.error_summary();
        assert!(summary.contains("field1"));
        assert!(summary.contains("field2"));
    }
}
