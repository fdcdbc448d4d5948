//! Condition to background asset lookup. Pure data, no I/O.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundAsset {
    Thunderstorm,
    Rain,
    Snow,
    ClearDay,
    ClearNight,
    CloudsDay,
    CloudsNight,
    Haze,
    /// Looping video used for conditions without a dedicated asset
    Default,
}

impl BackgroundAsset {
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Thunderstorm => "Thunderstorm.gif",
            Self::Rain => "Rain.gif",
            Self::Snow => "Snow.gif",
            Self::ClearDay => "ClearDay.gif",
            Self::ClearNight => "ClearNight.gif",
            Self::CloudsDay => "CloudsDay.gif",
            Self::CloudsNight => "CloudsNight.gif",
            Self::Haze => "Haze.gif",
            Self::Default => "video1.mp4",
        }
    }

    pub fn is_video(self) -> bool {
        self.file_name().ends_with(".mp4")
    }
}

/// Pick the background for a provider condition group ("Clear", "Rain", ...).
/// Only Clear and Clouds have day/night variants.
pub fn background_for(condition: &str, is_day: bool) -> BackgroundAsset {
    match (condition, is_day) {
        ("Thunderstorm", _) => BackgroundAsset::Thunderstorm,
        ("Drizzle" | "Rain", _) => BackgroundAsset::Rain,
        ("Snow", _) => BackgroundAsset::Snow,
        ("Clear", true) => BackgroundAsset::ClearDay,
        ("Clear", false) => BackgroundAsset::ClearNight,
        ("Clouds", true) => BackgroundAsset::CloudsDay,
        ("Clouds", false) => BackgroundAsset::CloudsNight,
        ("Mist" | "Smoke" | "Haze" | "Fog", _) => BackgroundAsset::Haze,
        _ => BackgroundAsset::Default,
    }
}
