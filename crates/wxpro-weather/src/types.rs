use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use wxpro_core::UnitSystem;

/// Canonical location: coordinates plus display name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub country: String,
    pub state: Option<String>,
    pub lat: f64,
    pub lon: f64,
}

impl Location {
    /// A location known only by its coordinates (e.g. from device geolocation
    /// without a place name).
    pub fn from_coordinates(lat: f64, lon: f64) -> Self {
        Self {
            name: String::new(),
            country: String::new(),
            state: None,
            lat,
            lon,
        }
    }

    pub fn has_name(&self) -> bool {
        !self.name.trim().is_empty()
    }

    /// Label for display, e.g. "Springfield, Illinois, US".
    /// Falls back to coordinates when no name is known.
    pub fn label(&self) -> String {
        if !self.has_name() {
            return format!("{:.2}, {:.2}", self.lat, self.lon);
        }

        let mut parts = vec![self.name.as_str()];
        if let Some(state) = self.state.as_deref().filter(|s| !s.is_empty()) {
            parts.push(state);
        }
        if !self.country.is_empty() {
            parts.push(self.country.as_str());
        }
        parts.join(", ")
    }
}

/// Current conditions, already in the unit system they were requested in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub location_name: String,
    pub country: String,
    pub lat: f64,
    pub lon: f64,
    /// Provider condition group, e.g. "Clouds"
    pub condition_code: String,
    pub description: String,
    pub icon_id: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity_pct: u8,
    pub pressure_hpa: f64,
    pub wind_speed: f64,
    pub wind_direction_deg: Option<f64>,
    pub visibility_meters: Option<u32>,
    pub sunrise: Option<DateTime<Utc>>,
    pub sunset: Option<DateTime<Utc>>,
    pub timezone_offset_seconds: i32,
    pub observed_at: DateTime<Utc>,
    pub units: UnitSystem,
}

impl CurrentConditions {
    /// The location these conditions were reported for.
    pub fn location(&self) -> Location {
        Location {
            name: self.location_name.clone(),
            country: self.country.clone(),
            state: None,
            lat: self.lat,
            lon: self.lon,
        }
    }

    /// Day or night at observation time: icon suffix first, then the
    /// sunrise/sunset window, otherwise day.
    pub fn is_day(&self) -> bool {
        if self.icon_id.ends_with('d') {
            return true;
        }
        if self.icon_id.ends_with('n') {
            return false;
        }
        match (self.sunrise, self.sunset) {
            (Some(rise), Some(set)) => self.observed_at >= rise && self.observed_at < set,
            _ => true,
        }
    }
}

/// One forecast day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub date: DateTime<Utc>,
    pub temp_min: f64,
    pub temp_max: f64,
    pub condition_code: String,
    pub icon_id: String,
}

/// Chronological daily forecast, today first. Never empty: an empty series
/// is represented as an absent forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub days: Vec<ForecastDay>,
}

impl Forecast {
    pub fn today(&self) -> Option<&ForecastDay> {
        self.days.first()
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

/// Current conditions and forecast fetched together for one location and
/// unit system. Always replaced as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub location: Location,
    pub units: UnitSystem,
    pub current: CurrentConditions,
    pub forecast: Option<Forecast>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn conditions(icon: &str) -> CurrentConditions {
        let noon = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap();
        CurrentConditions {
            location_name: "London".into(),
            country: "GB".into(),
            lat: 51.5,
            lon: -0.12,
            condition_code: "Clear".into(),
            description: "clear sky".into(),
            icon_id: icon.into(),
            temperature: 15.2,
            feels_like: 14.0,
            humidity_pct: 60,
            pressure_hpa: 1012.0,
            wind_speed: 3.1,
            wind_direction_deg: Some(200.0),
            visibility_meters: Some(10_000),
            sunrise: Some(noon - chrono::Duration::hours(7)),
            sunset: Some(noon + chrono::Duration::hours(9)),
            timezone_offset_seconds: 3600,
            observed_at: noon,
            units: UnitSystem::Celsius,
        }
    }

    #[test]
    fn test_label_with_state() {
        let loc = Location {
            name: "Springfield".into(),
            country: "US".into(),
            state: Some("Illinois".into()),
            lat: 39.8,
            lon: -89.6,
        };
        assert_eq!(loc.label(), "Springfield, Illinois, US");
    }

    #[test]
    fn test_label_falls_back_to_coordinates() {
        let loc = Location::from_coordinates(51.5074, -0.1278);
        assert!(!loc.has_name());
        assert_eq!(loc.label(), "51.51, -0.13");
    }

    #[test]
    fn test_is_day_from_icon() {
        assert!(conditions("01d").is_day());
        assert!(!conditions("01n").is_day());
    }

    #[test]
    fn test_is_day_from_sun_window() {
        let mut c = conditions("");
        assert!(c.is_day());

        c.observed_at = c.sunset.unwrap() + chrono::Duration::minutes(1);
        assert!(!c.is_day());

        c.sunrise = None;
        assert!(c.is_day());
    }

    #[test]
    fn test_location_extracted_from_conditions() {
        let loc = conditions("01d").location();
        assert_eq!(loc.name, "London");
        assert_eq!(loc.lat, 51.5);
        assert_eq!(loc.lon, -0.12);
    }
}
