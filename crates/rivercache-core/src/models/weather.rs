use serde::{Deserialize, Serialize};

/// Response of `/api/weather/{lat}/{lng}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub current: CurrentWeather,
    #[serde(default)]
    pub forecast: Vec<ForecastDay>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeather {
    pub temp: f64,
    pub condition: String,
    #[serde(default)]
    pub precipitation: String,
    #[serde(default)]
    pub wind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub day: String,
    pub high: f64,
    pub low: f64,
    pub condition: String,
    #[serde(default)]
    pub precipitation: String,
}

/// Pick a glyph for a free-text condition ("Partly Cloudy", "Showers", ...).
pub fn condition_icon(condition: &str) -> &'static str {
    let lower = condition.to_lowercase();
    if lower.contains("rain") || lower.contains("shower") {
        "🌧"
    } else if lower.contains("snow") {
        "❄"
    } else if lower.contains("cloud") && lower.contains("part") {
        "⛅"
    } else if lower.contains("cloud") {
        "☁"
    } else if lower.contains("sun") || lower.contains("clear") {
        "☀"
    } else if lower.contains("thunder") || lower.contains("storm") {
        "⛈"
    } else if lower.contains("fog") || lower.contains("haz") {
        "🌫"
    } else {
        "⛅"
    }
}
