use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// A latitude/longitude pair used to key weather lookups.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl Default for Coordinates {
    /// Upper Delaware region
    fn default() -> Self {
        Self::new(41.6, -75.0)
    }
}

// Bitwise equality so coordinates can key a HashMap.
impl PartialEq for Coordinates {
    fn eq(&self, other: &Self) -> bool {
        self.lat.to_bits() == other.lat.to_bits() && self.lng.to_bits() == other.lng.to_bits()
    }
}

impl Eq for Coordinates {}

impl Hash for Coordinates {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.lat.to_bits().hash(state);
        self.lng.to_bits().hash(state);
    }
}

/// Identifies one cacheable, fetchable unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceKey {
    Stations,
    Station(String),
    Weather(Coordinates),
    Alerts,
    FishingReports,
}

impl ResourceKey {
    pub fn station(id: impl Into<String>) -> Self {
        ResourceKey::Station(id.into())
    }

    /// API path this key resolves to.
    pub fn path(&self) -> String {
        match self {
            ResourceKey::Stations => "/api/stations".to_string(),
            ResourceKey::Station(id) => format!("/api/station/{}", urlencoding::encode(id)),
            ResourceKey::Weather(c) => format!("/api/weather/{}/{}", c.lat, c.lng),
            ResourceKey::Alerts => "/api/alerts".to_string(),
            ResourceKey::FishingReports => "/api/fishing-reports".to_string(),
        }
    }

    /// File-safe name used for on-disk snapshots.
    pub fn cache_name(&self) -> String {
        match self {
            ResourceKey::Stations => "stations".to_string(),
            ResourceKey::Station(id) => {
                let safe: String = id
                    .chars()
                    .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
                    .collect();
                format!("station_{}", safe)
            }
            ResourceKey::Weather(c) => format!("weather_{:.4}_{:.4}", c.lat, c.lng),
            ResourceKey::Alerts => "alerts".to_string(),
            ResourceKey::FishingReports => "fishing_reports".to_string(),
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}
