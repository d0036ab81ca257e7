//! Weather sample model and condition lookup table

use serde::{Deserialize, Serialize};

use super::Coordinate;

/// Weather conditions the overlay distinguishes, keyed by WMO weather code
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    #[default]
    Clear,
    MostlyClear,
    PartlyCloudy,
    Cloudy,
    Fog,
    Drizzle,
    Rain,
    HeavyRain,
    Snow,
    Thunderstorm,
}

impl WeatherCondition {
    /// Map a WMO weather code (as returned by Open-Meteo) to a condition.
    /// Unknown codes fall back to `Clear`.
    #[must_use]
    pub fn from_wmo_code(code: u8) -> Self {
        match code {
            0 => Self::Clear,
            1 => Self::MostlyClear,
            2 => Self::PartlyCloudy,
            3 => Self::Cloudy,
            45 | 48 => Self::Fog,
            51 | 53 | 55 | 56 | 57 => Self::Drizzle,
            61 | 63 | 66 | 80 | 81 => Self::Rain,
            65 | 67 | 82 => Self::HeavyRain,
            71 | 73 | 75 | 77 | 85 | 86 => Self::Snow,
            95 | 96 | 99 => Self::Thunderstorm,
            _ => Self::Clear,
        }
    }

    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::Clear => "Clear sky",
            Self::MostlyClear => "Mainly clear",
            Self::PartlyCloudy => "Partly cloudy",
            Self::Cloudy => "Overcast",
            Self::Fog => "Fog",
            Self::Drizzle => "Drizzle",
            Self::Rain => "Rain",
            Self::HeavyRain => "Heavy rain",
            Self::Snow => "Snow",
            Self::Thunderstorm => "Thunderstorm",
        }
    }
}

/// Weather at one sampled point of the route, for the current local hour
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WeatherSample {
    /// Position of this sample in route order (0 = origin)
    pub sample_index: usize,
    pub coord: Coordinate,
    /// Temperature in Celsius
    pub temperature_c: f32,
    /// Precipitation probability (0-100%)
    pub precipitation_probability_pct: u8,
    pub condition: WeatherCondition,
    /// Precipitation probability met the hazard threshold
    pub is_hazard: bool,
    /// Best-effort place name, only looked up for hazard samples
    pub location_name: Option<String>,
}

impl WeatherSample {
    /// Format temperature with unit
    #[must_use]
    pub fn format_temperature(&self) -> String {
        format!("{:.0}°C", self.temperature_c.round())
    }
}

/// The single rain warning shown for a trip
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RainAlert {
    pub coord: Coordinate,
    pub probability_pct: u8,
    pub location_name: Option<String>,
}

impl From<&WeatherSample> for RainAlert {
    fn from(sample: &WeatherSample) -> Self {
        Self {
            coord: sample.coord,
            probability_pct: sample.precipitation_probability_pct,
            location_name: sample.location_name.clone(),
        }
    }
}
