//! Current conditions and daily forecast from an OpenWeatherMap-compatible
//! provider.
//!
//! Current conditions are mandatory: every failure is reported. The forecast
//! is best-effort: each configured endpoint is tried in order and exhausting
//! them yields `None`.

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::instrument;
use wxpro_core::{ApiConfig, UnitSystem, WeatherConfig, WeatherError};

use crate::types::{CurrentConditions, Forecast, ForecastDay, Location};

const CURRENT_PATH: &str = "data/2.5/weather";
const MAX_FORECAST_DAYS: usize = 7;

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    #[serde(default)]
    name: String,
    #[serde(default)]
    sys: SysBlock,
    #[serde(default)]
    timezone: i32,
    coord: CoordBlock,
    #[serde(default)]
    weather: Vec<ConditionBlock>,
    main: MainBlock,
    #[serde(default)]
    wind: WindBlock,
    visibility: Option<u32>,
    dt: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct SysBlock {
    #[serde(default)]
    country: String,
    sunrise: Option<i64>,
    sunset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct CoordBlock {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Default, Deserialize)]
struct ConditionBlock {
    #[serde(default)]
    main: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    icon: String,
}

#[derive(Debug, Deserialize)]
struct MainBlock {
    temp: f64,
    feels_like: f64,
    #[serde(default)]
    humidity: u8,
    #[serde(default)]
    pressure: f64,
}

#[derive(Debug, Default, Deserialize)]
struct WindBlock {
    #[serde(default)]
    speed: f64,
    deg: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    daily: Vec<DailyEntry>,
}

#[derive(Debug, Deserialize)]
struct DailyEntry {
    dt: i64,
    temp: DailyTemp,
    #[serde(default)]
    weather: Vec<ConditionBlock>,
}

#[derive(Debug, Deserialize)]
struct DailyTemp {
    min: f64,
    max: f64,
}

fn timestamp(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}

impl CurrentResponse {
    fn into_conditions(self, units: UnitSystem) -> CurrentConditions {
        // A missing or zero `dt` means "now"
        let observed_at = self
            .dt
            .filter(|dt| *dt > 0)
            .and_then(timestamp)
            .unwrap_or_else(Utc::now);
        let condition = self.weather.into_iter().next().unwrap_or_default();

        CurrentConditions {
            location_name: self.name,
            country: self.sys.country,
            lat: self.coord.lat,
            lon: self.coord.lon,
            condition_code: condition.main,
            description: condition.description,
            icon_id: condition.icon,
            temperature: self.main.temp,
            feels_like: self.main.feels_like,
            humidity_pct: self.main.humidity,
            pressure_hpa: self.main.pressure,
            wind_speed: self.wind.speed,
            wind_direction_deg: self.wind.deg,
            visibility_meters: self.visibility,
            sunrise: self.sys.sunrise.and_then(timestamp),
            sunset: self.sys.sunset.and_then(timestamp),
            timezone_offset_seconds: self.timezone,
            observed_at,
            units,
        }
    }
}

impl ForecastResponse {
    fn into_forecast(self, max_days: usize) -> Option<Forecast> {
        let mut days: Vec<ForecastDay> = self
            .daily
            .into_iter()
            .filter_map(|entry| {
                let condition = entry.weather.into_iter().next().unwrap_or_default();
                Some(ForecastDay {
                    date: timestamp(entry.dt)?,
                    temp_min: entry.temp.min,
                    temp_max: entry.temp.max,
                    condition_code: condition.main,
                    icon_id: condition.icon,
                })
            })
            .collect();

        days.sort_by_key(|d| d.date);
        days.truncate(max_days);

        if days.is_empty() {
            None
        } else {
            Some(Forecast { days })
        }
    }
}

/// One forecast endpoint in the fallback chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForecastStrategy {
    pub path: String,
}

impl ForecastStrategy {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.trim_matches('/').to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WeatherFetcher {
    client: Client,
    base_url: String,
    api_key: String,
    strategies: Vec<ForecastStrategy>,
    forecast_days: usize,
}

impl WeatherFetcher {
    pub fn new(client: Client, base_url: &str, api_key: &str, config: &WeatherConfig) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            strategies: config
                .forecast_endpoints
                .iter()
                .map(|p| ForecastStrategy::new(p))
                .collect(),
            forecast_days: config.forecast_days.min(MAX_FORECAST_DAYS),
        }
    }

    /// HTTP client with the request timeout from `api` applied.
    pub fn build_client(api: &ApiConfig) -> Result<Client, WeatherError> {
        Ok(Client::builder().timeout(api.request_timeout()).build()?)
    }

    pub fn strategies(&self) -> &[ForecastStrategy] {
        &self.strategies
    }

    /// Current conditions at `location`, in `units` as delivered by the provider.
    #[instrument(skip(self, location), fields(lat = location.lat, lon = location.lon), level = "info")]
    pub async fn fetch_current(
        &self,
        location: &Location,
        units: UnitSystem,
    ) -> Result<CurrentConditions, WeatherError> {
        let (lat, lon) = (location.lat.to_string(), location.lon.to_string());
        let subject = if location.has_name() {
            location.name.clone()
        } else {
            format!("{}, {}", lat, lon)
        };

        let response: CurrentResponse = self
            .get_json(
                CURRENT_PATH,
                &[("lat", lat.as_str()), ("lon", lon.as_str())],
                units,
                &subject,
            )
            .await?;

        Ok(response.into_conditions(units))
    }

    /// Current conditions for a city name, used when geocoding finds nothing.
    #[instrument(skip(self), level = "info")]
    pub async fn fetch_current_by_city(
        &self,
        city: &str,
        units: UnitSystem,
    ) -> Result<CurrentConditions, WeatherError> {
        let response: CurrentResponse = self
            .get_json(CURRENT_PATH, &[("q", city)], units, city)
            .await?;

        Ok(response.into_conditions(units))
    }

    /// Daily forecast at `location`, or `None` when no endpoint delivers one.
    #[instrument(skip(self, location), fields(lat = location.lat, lon = location.lon), level = "info")]
    pub async fn fetch_forecast(&self, location: &Location, units: UnitSystem) -> Option<Forecast> {
        for strategy in &self.strategies {
            match self.try_forecast(strategy, location, units).await {
                Ok(forecast) => {
                    if forecast.is_none() {
                        tracing::info!("{} returned an empty daily series", strategy.path);
                    }
                    return forecast;
                }
                Err(e) => {
                    tracing::warn!("Forecast via {} failed: {}", strategy.path, e);
                }
            }
        }

        tracing::warn!("No forecast endpoint succeeded; forecast unavailable");
        None
    }

    async fn try_forecast(
        &self,
        strategy: &ForecastStrategy,
        location: &Location,
        units: UnitSystem,
    ) -> Result<Option<Forecast>, WeatherError> {
        let (lat, lon) = (location.lat.to_string(), location.lon.to_string());

        let response: ForecastResponse = self
            .get_json(
                &strategy.path,
                &[
                    ("lat", lat.as_str()),
                    ("lon", lon.as_str()),
                    ("exclude", "current,minutely,hourly,alerts"),
                ],
                units,
                &location.label(),
            )
            .await?;

        Ok(response.into_forecast(self.forecast_days))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
        units: UnitSystem,
        subject: &str,
    ) -> Result<T, WeatherError> {
        let url = format!("{}/{}", self.base_url, path);
        tracing::debug!("GET {} {:?} units={}", url, params, units.api_param());

        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[("units", units.api_param()), ("appid", self.api_key.as_str())])
            .send()
            .await?;

        handle_response(response, subject).await
    }
}

async fn handle_response<T: DeserializeOwned>(
    response: reqwest::Response,
    subject: &str,
) -> Result<T, WeatherError> {
    let status = response.status();

    if status.is_success() {
        Ok(response.json().await?)
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(WeatherError::from_status(status.as_u16(), subject, body))
    }
}
