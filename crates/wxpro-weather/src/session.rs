//! Weather session: sequences location resolution and weather fetches in
//! response to user actions, and owns the state presentation reads.
//!
//! Every request bumps a generation counter. Results are applied only if
//! their generation is still the latest when they arrive; anything older is
//! dropped. In-flight HTTP calls are never aborted.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::instrument;
use wxpro_core::{
    AppError, Config, ConfigError, LocationError, UnitSystem, WeatherError, API_KEY_ENV,
};

use crate::geocode::{GeoResolver, SuggestDebouncer};
use crate::location::{resolve_device_location, IpLocationSource, LocationSource};
use crate::provider::WeatherFetcher;
use crate::types::{CurrentConditions, Forecast, Location, WeatherReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SessionPhase {
    #[default]
    Idle,
    ResolvingLocation,
    Fetching,
    Ready,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum LocationPermission {
    #[default]
    Idle,
    Requesting,
    Granted,
    Denied,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FetchState {
    pub is_loading: bool,
    pub error_message: Option<String>,
    pub location_permission: LocationPermission,
}

/// Everything presentation needs, copied out by [`WeatherSession::snapshot`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub fetch: FetchState,
    pub units: UnitSystem,
    /// Location the next unit toggle re-fetches
    pub location: Option<Location>,
    pub report: Option<WeatherReport>,
    pub suggestions: Vec<Location>,
    pub generation: u64,
}

/// How a user action ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    Ready,
    Failed,
    /// A newer request started first; this one's results were dropped
    Superseded,
    /// Nothing to do (e.g. a blank search)
    Ignored,
}

/// Start a request under the lock: new generation, loading, error cleared.
/// A location request still pending is abandoned by any other request.
fn start_request(state: &mut SessionState, phase: SessionPhase) -> (u64, UnitSystem) {
    if phase != SessionPhase::ResolvingLocation
        && state.fetch.location_permission == LocationPermission::Requesting
    {
        state.fetch.location_permission = LocationPermission::Idle;
    }
    state.generation += 1;
    state.phase = phase;
    state.fetch.is_loading = true;
    state.fetch.error_message = None;
    (state.generation, state.units)
}

pub struct WeatherSession {
    fetcher: WeatherFetcher,
    geo: GeoResolver,
    locator: Arc<dyn LocationSource>,
    geolocation_timeout: Duration,
    detect_on_start: bool,
    debouncer: SuggestDebouncer,
    state: Mutex<SessionState>,
}

impl WeatherSession {
    pub fn new(
        fetcher: WeatherFetcher,
        geo: GeoResolver,
        locator: Arc<dyn LocationSource>,
        config: &Config,
    ) -> Self {
        let state = SessionState {
            units: config.weather.units,
            ..SessionState::default()
        };

        Self {
            fetcher,
            geo,
            locator,
            geolocation_timeout: config.weather.geolocation_timeout(),
            detect_on_start: config.weather.detect_location_on_start,
            debouncer: SuggestDebouncer::new(config.weather.suggest_debounce()),
            state: Mutex::new(state),
        }
    }

    /// Build a session from configuration, locating the device by IP address.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let api_key = config.api.resolve_api_key().ok_or_else(|| {
            ConfigError::MissingSetting(format!("api.api_key (or {})", API_KEY_ENV))
        })?;
        let client = WeatherFetcher::build_client(&config.api)?;

        let fetcher = WeatherFetcher::new(
            client.clone(),
            &config.api.base_url,
            &api_key,
            &config.weather,
        );
        let geo = GeoResolver::new(client.clone(), &config.api.base_url, &api_key, &config.weather);
        let locator = Arc::new(IpLocationSource::new(client));

        tracing::info!("Weather session ready ({})", config.api.base_url);
        Ok(Self::new(fetcher, geo, locator, config))
    }

    /// Replace the device location source.
    pub fn with_location_source(mut self, locator: Arc<dyn LocationSource>) -> Self {
        self.locator = locator;
        self
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.lock().clone()
    }

    pub fn units(&self) -> UnitSystem {
        self.state.lock().units
    }

    fn is_current(&self, generation: u64) -> bool {
        self.state.lock().generation == generation
    }

    /// App start: try device location if configured to.
    pub async fn start(&self) -> Option<RequestOutcome> {
        if !self.detect_on_start {
            return None;
        }
        Some(self.detect_location().await)
    }

    /// Resolve the device location, then load weather for it.
    #[instrument(skip(self), level = "info")]
    pub async fn detect_location(&self) -> RequestOutcome {
        let (generation, units) = {
            let mut state = self.state.lock();
            state.fetch.location_permission = LocationPermission::Requesting;
            start_request(&mut state, SessionPhase::ResolvingLocation)
        };

        let location =
            match resolve_device_location(self.locator.as_ref(), self.geolocation_timeout).await {
                Ok(location) => location,
                Err(e) => {
                    let mut state = self.state.lock();
                    if state.generation != generation {
                        return RequestOutcome::Superseded;
                    }
                    state.fetch.location_permission = match e {
                        LocationError::PermissionDenied | LocationError::Unavailable => {
                            LocationPermission::Denied
                        }
                        _ => LocationPermission::Idle,
                    };
                    drop(state);
                    return self.fail(generation, e.into(), None);
                }
            };

        {
            let mut state = self.state.lock();
            if state.generation != generation {
                return RequestOutcome::Superseded;
            }
            state.fetch.location_permission = LocationPermission::Granted;
            state.phase = SessionPhase::Fetching;
        }

        self.load(generation, location, units).await
    }

    /// Submit a free-text search.
    #[instrument(skip(self), level = "info")]
    pub async fn search(&self, query: &str) -> RequestOutcome {
        let query = query.trim();
        if query.is_empty() {
            return RequestOutcome::Ignored;
        }

        self.debouncer.cancel();
        let (generation, units) = {
            let mut state = self.state.lock();
            state.suggestions.clear();
            start_request(&mut state, SessionPhase::Fetching)
        };

        let location = match self.geo.resolve(query).await {
            Ok(location) => location,
            Err(WeatherError::NotFound(_)) => {
                tracing::info!("Geocoding found no match for {:?}; trying city lookup", query);
                return self.load_by_city(generation, query, units).await;
            }
            Err(e) => return self.fail(generation, e.into(), None),
        };

        if !self.is_current(generation) {
            return RequestOutcome::Superseded;
        }
        self.load(generation, location, units).await
    }

    /// A suggestion was clicked.
    #[instrument(skip(self, location), fields(location = %location.label()), level = "info")]
    pub async fn select_suggestion(&self, location: Location) -> RequestOutcome {
        self.debouncer.cancel();
        let (generation, units) = {
            let mut state = self.state.lock();
            state.suggestions.clear();
            start_request(&mut state, SessionPhase::Fetching)
        };

        self.load(generation, location, units).await
    }

    /// Switch unit systems. With a held location, both fetches are re-issued
    /// under the new units; returns `None` when there is nothing to re-fetch.
    #[instrument(skip(self), level = "info")]
    pub async fn set_units(&self, units: UnitSystem) -> Option<RequestOutcome> {
        let (generation, units, location) = {
            let mut state = self.state.lock();
            if state.units == units {
                return None;
            }
            state.units = units;
            // Values in the old unit system are no longer valid
            state.report = None;
            let location = state.location.clone()?;
            let (generation, units) = start_request(&mut state, SessionPhase::Fetching);
            (generation, units, location)
        };

        tracing::info!("Units changed to {:?}; re-fetching {}", units, location.label());
        Some(self.load(generation, location, units).await)
    }

    pub async fn toggle_units(&self) -> Option<RequestOutcome> {
        let units = self.units().toggled();
        self.set_units(units).await
    }

    /// Search-as-you-type. Waits for the debounce period, then looks up
    /// suggestions. Returns `None` if a newer keystroke superseded this one.
    pub async fn update_query(&self, query: &str) -> Option<Vec<Location>> {
        let ticket = self.debouncer.settle().await?;
        let suggestions = self.geo.suggest(query).await;

        // Ticket check and write under one lock
        let mut state = self.state.lock();
        if !self.debouncer.is_current(ticket) {
            return None;
        }
        state.suggestions = suggestions.clone();
        Some(suggestions)
    }

    /// Fetch current conditions and forecast together for `location`.
    async fn load(&self, generation: u64, location: Location, units: UnitSystem) -> RequestOutcome {
        let (current, forecast) = tokio::join!(
            self.fetcher.fetch_current(&location, units),
            self.fetcher.fetch_forecast(&location, units),
        );

        match current {
            Ok(current) => self.finish(generation, location, units, current, forecast),
            Err(e) => self.fail(generation, e.into(), Some(location)),
        }
    }

    /// Current-by-city path: coordinates come from the current conditions,
    /// so the forecast can only follow afterwards.
    async fn load_by_city(&self, generation: u64, city: &str, units: UnitSystem) -> RequestOutcome {
        let current = match self.fetcher.fetch_current_by_city(city, units).await {
            Ok(current) => current,
            Err(e) => return self.fail(generation, e.into(), None),
        };

        if !self.is_current(generation) {
            return RequestOutcome::Superseded;
        }

        let location = current.location();
        let forecast = self.fetcher.fetch_forecast(&location, units).await;
        self.finish(generation, location, units, current, forecast)
    }

    fn finish(
        &self,
        generation: u64,
        mut location: Location,
        units: UnitSystem,
        current: CurrentConditions,
        forecast: Option<Forecast>,
    ) -> RequestOutcome {
        let mut state = self.state.lock();
        if state.generation != generation {
            tracing::debug!(
                "Discarding stale weather for {} (generation {} < {})",
                location.label(),
                generation,
                state.generation
            );
            return RequestOutcome::Superseded;
        }

        if !location.has_name() {
            location.name = current.location_name.clone();
            location.country = current.country.clone();
        }

        tracing::info!(
            "Weather ready for {} ({} forecast days)",
            location.label(),
            forecast.as_ref().map_or(0, Forecast::len)
        );

        state.location = Some(location.clone());
        state.report = Some(WeatherReport {
            location,
            units,
            current,
            forecast,
        });
        state.phase = SessionPhase::Ready;
        state.fetch.is_loading = false;
        RequestOutcome::Ready
    }

    fn fail(&self, generation: u64, error: AppError, location: Option<Location>) -> RequestOutcome {
        let mut state = self.state.lock();
        if state.generation != generation {
            tracing::debug!("Discarding stale failure: {}", error);
            return RequestOutcome::Superseded;
        }

        match &error {
            AppError::Weather(e) if e.is_provider_side() => {
                tracing::warn!("Weather request failed: {}", error)
            }
            _ => tracing::info!("Weather request failed: {}", error),
        }

        if let Some(location) = location {
            state.location = Some(location);
        }
        state.report = None;
        state.phase = SessionPhase::Error;
        state.fetch.is_loading = false;
        state.fetch.error_message = Some(error.user_message());
        RequestOutcome::Failed
    }
}
