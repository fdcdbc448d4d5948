//! Weather for Weather Pro
//!
//! Current conditions and a daily forecast from OpenWeatherMap, city search
//! with suggestions, device location, and the session that ties them together.

pub mod background;
pub mod geocode;
pub mod location;
pub mod normalize;
pub mod provider;
pub mod session;
pub mod types;

pub use background::{background_for, BackgroundAsset};
pub use geocode::{GeoResolver, SuggestDebouncer};
pub use location::{resolve_device_location, IpLocationSource, LocationSource, NoLocationSource};
pub use normalize::{format_temperature, humidity_level, visibility_km, wind_direction, HumidityLevel};
pub use provider::{ForecastStrategy, WeatherFetcher};
pub use session::{
    FetchState, LocationPermission, RequestOutcome, SessionPhase, SessionState, WeatherSession,
};
pub use types::*;
pub use wxpro_core::UnitSystem;
