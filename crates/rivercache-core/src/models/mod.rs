//! Data models for river dashboard resources.
//!
//! - `Station`: a monitoring gauge and the river it sits on
//! - `StationReadings`: live and historical gauge values for one station
//! - `WeatherReport`: current conditions and a short forecast
//! - `Alert`: release schedules, weather warnings, river conditions
//! - `FishingReport`: per-section reports with recommended flies
//! - `Resource`: one payload variant per API endpoint, stored in the cache

pub mod alert;
pub mod fishing;
pub mod resource;
pub mod station;
pub mod weather;

pub use alert::{active_alerts, Alert, Severity};
pub use fishing::FishingReport;
pub use resource::Resource;
pub use station::{
    river_options, CurrentReading, HistoricalReading, ReadingStatus, Station, StationReadings,
    StationStatus,
};
pub use weather::{condition_icon, CurrentWeather, ForecastDay, WeatherReport};
