use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A USGS monitoring station as listed by `/api/stations`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub river: String,
}

/// Gauge condition relative to the thresholds applied by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadingStatus {
    High,
    Normal,
    Low,
    #[default]
    #[serde(other)]
    Unknown,
}

impl ReadingStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ReadingStatus::High => "High",
            ReadingStatus::Normal => "Normal",
            ReadingStatus::Low => "Low",
            ReadingStatus::Unknown => "Unknown",
        }
    }
}

/// Latest instantaneous values. Any gauge may be missing a parameter.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CurrentReading {
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub flow: Option<f64>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StationStatus {
    #[serde(default)]
    pub height: ReadingStatus,
    #[serde(default)]
    pub flow: ReadingStatus,
    #[serde(default)]
    pub temperature: ReadingStatus,
}

/// One day of the daily-value series (date is preformatted, e.g. "Apr 10").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalReading {
    pub date: String,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub flow: Option<f64>,
    #[serde(default)]
    pub temperature: Option<f64>,
}

/// Response of `/api/station/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationReadings {
    pub id: String,
    pub name: String,
    pub current: CurrentReading,
    #[serde(default)]
    pub status: StationStatus,
    #[serde(default)]
    pub historical: Vec<HistoricalReading>,
}

impl StationReadings {
    /// Flow values of the historical series, oldest first, skipping gaps.
    pub fn flow_series(&self) -> Vec<f64> {
        self.historical.iter().filter_map(|h| h.flow).collect()
    }
}

/// River filter choices: "all" followed by each river in first-seen order.
pub fn river_options(stations: &[Station]) -> Vec<String> {
    let mut options = vec!["all".to_string()];
    for station in stations {
        if !options.iter().skip(1).any(|r| r == &station.river) {
            options.push(station.river.clone());
        }
    }
    options
}
