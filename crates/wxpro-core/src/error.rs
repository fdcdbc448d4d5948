//! Centralized error types for Weather Pro.
//!
//! This module provides a typed error hierarchy that:
//! - Distinguishes the failure kinds callers react to differently
//! - Provides user-friendly messages suitable for UI display
//! - Preserves full error context for debugging/logging

use thiserror::Error;

/// Top-level application error type.
///
/// Use `user_message()` to get a UI-appropriate message.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Weather service error: {0}")]
    Weather(#[from] WeatherError),

    #[error("Location error: {0}")]
    Location(#[from] LocationError),
}

impl AppError {
    /// Returns a user-friendly message suitable for display in the UI.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Config(e) => e.user_message().to_string(),
            AppError::Weather(e) => e.user_message(),
            AppError::Location(e) => e.user_message().to_string(),
        }
    }
}

/// Transport-level failures (no usable HTTP response).
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl NetworkError {
    pub fn user_message(&self) -> &'static str {
        match self {
            NetworkError::ConnectionFailed(_) => {
                "Network error. Please check your internet connection and try again."
            }
            NetworkError::Timeout => "The request timed out. Please try again.",
            NetworkError::InvalidResponse(_) => {
                "Received an unexpected response from the weather service. Please try again."
            }
        }
    }
}

/// Weather provider errors.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Location not found: {0}")]
    NotFound(String),

    #[error("Invalid API key")]
    Unauthorized,

    #[error("Service unavailable (status {0})")]
    ServiceUnavailable(u16),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error(transparent)]
    Network(#[from] NetworkError),
}

impl WeatherError {
    /// Classify a non-success HTTP status. `subject` names what was requested
    /// (a city, a coordinate pair) for the not-found message.
    pub fn from_status(status: u16, subject: impl Into<String>, body: String) -> Self {
        match status {
            404 => WeatherError::NotFound(subject.into()),
            401 => WeatherError::Unauthorized,
            500..=599 => WeatherError::ServiceUnavailable(status),
            _ => WeatherError::Api {
                status,
                message: body,
            },
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            WeatherError::NotFound(subject) => format!(
                "City \"{}\" not found. Please check the spelling and try again.",
                subject
            ),
            WeatherError::Unauthorized => {
                "Invalid API key. Please check your OpenWeatherMap API configuration.".to_string()
            }
            WeatherError::ServiceUnavailable(_) => {
                "Weather service is temporarily unavailable. Please try again later.".to_string()
            }
            WeatherError::Api { .. } => "Weather service error. Please try again.".to_string(),
            WeatherError::Network(e) => e.user_message().to_string(),
        }
    }

    /// Whether the provider is at fault rather than the request.
    pub fn is_provider_side(&self) -> bool {
        matches!(
            self,
            WeatherError::ServiceUnavailable(_) | WeatherError::Network(_)
        )
    }
}

/// Device geolocation errors.
#[derive(Debug, Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Location service unavailable")]
    Unavailable,

    #[error("Location request timed out")]
    Timeout,

    #[error("Location error: {0}")]
    Other(String),
}

impl LocationError {
    pub fn user_message(&self) -> &'static str {
        match self {
            LocationError::PermissionDenied => {
                "Location access was denied. Search for a city instead."
            }
            LocationError::Unavailable => {
                "Geolocation is not supported on this device. Search for a city instead."
            }
            LocationError::Timeout => "Finding your location took too long. Please try again.",
            LocationError::Other(_) => "Unable to determine your location.",
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),

    #[error("Missing required setting: {0}")]
    MissingSetting(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::ParseError(_) => "Configuration file is malformed. Check your settings.",
            ConfigError::MissingSetting(_) => "A required setting is missing. Check your settings.",
        }
    }
}

/// Extension trait for converting reqwest errors to our error types.
pub trait ReqwestErrorExt {
    fn into_network_error(self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    /// The request URL carries the API key, so it is stripped before the
    /// error is turned into text.
    fn into_network_error(self) -> NetworkError {
        let e = self.without_url();
        if e.is_timeout() {
            NetworkError::Timeout
        } else if e.is_decode() {
            NetworkError::InvalidResponse(e.to_string())
        } else {
            NetworkError::ConnectionFailed(e.to_string())
        }
    }
}

impl From<reqwest::Error> for WeatherError {
    fn from(e: reqwest::Error) -> Self {
        WeatherError::Network(e.into_network_error())
    }
}
