use serde::{Deserialize, Serialize};

use super::{Alert, FishingReport, Station, StationReadings, WeatherReport};

/// Payload stored in the cache, one variant per API endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Resource {
    Stations(Vec<Station>),
    Station(StationReadings),
    Weather(WeatherReport),
    Alerts(Vec<Alert>),
    FishingReports(Vec<FishingReport>),
}

impl Resource {
    pub fn as_stations(&self) -> Option<&[Station]> {
        match self {
            Resource::Stations(stations) => Some(stations),
            _ => None,
        }
    }

    pub fn as_readings(&self) -> Option<&StationReadings> {
        match self {
            Resource::Station(readings) => Some(readings),
            _ => None,
        }
    }

    pub fn as_weather(&self) -> Option<&WeatherReport> {
        match self {
            Resource::Weather(report) => Some(report),
            _ => None,
        }
    }

    pub fn as_alerts(&self) -> Option<&[Alert]> {
        match self {
            Resource::Alerts(alerts) => Some(alerts),
            _ => None,
        }
    }

    pub fn as_fishing_reports(&self) -> Option<&[FishingReport]> {
        match self {
            Resource::FishingReports(reports) => Some(reports),
            _ => None,
        }
    }
}
