//! Unit conversion and display helpers.
//!
//! The provider delivers values in the requested unit system; these helpers
//! cover the values it does not convert and the formatting around them.

use wxpro_core::UnitSystem;

/// Round to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Convert a Celsius temperature into `target`, rounded to one decimal.
pub fn convert(temp_celsius: f64, target: UnitSystem) -> f64 {
    match target {
        UnitSystem::Celsius => round1(temp_celsius),
        UnitSystem::Fahrenheit => round1(temp_celsius * 9.0 / 5.0 + 32.0),
    }
}

/// Format a temperature that is already in `unit`, e.g. "59.4°F".
pub fn format_temperature(value: f64, unit: UnitSystem) -> String {
    format!("{:.1}{}", value, unit.symbol())
}

/// Eight-point compass direction for a wind bearing in degrees.
pub fn wind_direction(deg: f64) -> &'static str {
    let deg = deg.rem_euclid(360.0);
    if deg > 337.5 || deg <= 22.5 {
        "N"
    } else if deg <= 67.5 {
        "NE"
    } else if deg <= 112.5 {
        "E"
    } else if deg <= 157.5 {
        "SE"
    } else if deg <= 202.5 {
        "S"
    } else if deg <= 247.5 {
        "SW"
    } else if deg <= 292.5 {
        "W"
    } else {
        "NW"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HumidityLevel {
    Low,
    Moderate,
    High,
}

impl HumidityLevel {
    pub fn label(self) -> &'static str {
        match self {
            HumidityLevel::Low => "Low",
            HumidityLevel::Moderate => "Moderate",
            HumidityLevel::High => "High",
        }
    }
}

pub fn humidity_level(pct: u8) -> HumidityLevel {
    match pct {
        0..=29 => HumidityLevel::Low,
        30..=59 => HumidityLevel::Moderate,
        _ => HumidityLevel::High,
    }
}

/// Visibility in kilometers with one decimal, e.g. "10.0 km".
pub fn visibility_km(meters: u32) -> String {
    format!("{:.1} km", f64::from(meters) / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_rounds_to_one_decimal() {
        assert_eq!(convert(15.24, UnitSystem::Celsius), 15.2);
        assert_eq!(convert(15.2, UnitSystem::Fahrenheit), 59.4);
        assert_eq!(convert(-40.0, UnitSystem::Fahrenheit), -40.0);
        assert_eq!(convert(100.0, UnitSystem::Fahrenheit), 212.0);
    }

    #[test]
    fn test_format_temperature() {
        assert_eq!(format_temperature(59.4, UnitSystem::Fahrenheit), "59.4°F");
        assert_eq!(format_temperature(15.0, UnitSystem::Celsius), "15.0°C");
    }

    #[test]
    fn test_wind_direction_sectors() {
        assert_eq!(wind_direction(0.0), "N");
        assert_eq!(wind_direction(22.5), "N");
        assert_eq!(wind_direction(22.6), "NE");
        assert_eq!(wind_direction(90.0), "E");
        assert_eq!(wind_direction(180.0), "S");
        assert_eq!(wind_direction(270.0), "W");
        assert_eq!(wind_direction(337.5), "NW");
        assert_eq!(wind_direction(337.6), "N");
        assert_eq!(wind_direction(360.0), "N");
    }

    #[test]
    fn test_humidity_levels() {
        assert_eq!(humidity_level(29), HumidityLevel::Low);
        assert_eq!(humidity_level(30), HumidityLevel::Moderate);
        assert_eq!(humidity_level(59), HumidityLevel::Moderate);
        assert_eq!(humidity_level(60).label(), "High");
    }

    #[test]
    fn test_visibility_km() {
        assert_eq!(visibility_km(10_000), "10.0 km");
        assert_eq!(visibility_km(2_460), "2.5 km");
    }
}
