//! Mock data served when the API has never answered for a resource.
//!
//! These are adopted by the cache as `fallback_data` only when a fetch fails
//! and nothing was fetched before.

use chrono::{Duration, Utc};
use rand::Rng;

use crate::models::{
    Alert, CurrentReading, CurrentWeather, FishingReport, ForecastDay, HistoricalReading,
    ReadingStatus, Severity, Station, StationReadings, StationStatus, WeatherReport,
};

/// Gauges of the Upper Delaware basin: (id, name, lat, lng, river).
const STATIONS: [(&str, &str, f64, f64, &str); 8] = [
    ("01427510", "Delaware River at Callicoon, NY", 41.76056, -75.05833, UPPER_DELAWARE),
    ("01428500", "Delaware River at Barryville, NY", 41.50822, -74.91306, UPPER_DELAWARE),
    ("01434000", "Delaware River at Port Jervis, NY", 41.37128, -74.69757, UPPER_DELAWARE),
    ("01417500", "East Branch Delaware River at Harvard, NY", 42.0201, -75.1035, EAST_BRANCH),
    ("01423000", "West Branch Delaware River at Hancock, NY", 41.9551, -75.2829, WEST_BRANCH),
    ("01437500", "Neversink River at Godeffroy, NY", 41.44056, -74.60056, "Neversink River"),
    ("01420500", "Beaver Kill at Cooks Falls, NY", 41.94611, -74.97639, "Beaverkill"),
    ("01365000", "Willowemoc Creek near Livingston Manor, NY", 41.9026, -74.8004, "Willowemoc"),
];

const UPPER_DELAWARE: &str = "Upper Delaware River";
const EAST_BRANCH: &str = "East Branch Delaware River";
const WEST_BRANCH: &str = "West Branch Delaware River";

/// Days of history in a generated readings series, today included.
const MOCK_HISTORY_DAYS: i64 = 7;

pub fn mock_stations() -> Vec<Station> {
    STATIONS
        .iter()
        .map(|&(id, name, lat, lng, river)| Station {
            id: id.to_string(),
            name: name.to_string(),
            lat,
            lng,
            river: river.to_string(),
        })
        .collect()
}

/// Display name of a known gauge, or a generic label.
pub fn station_name(station_id: &str) -> String {
    STATIONS
        .iter()
        .find(|(id, ..)| *id == station_id)
        .map(|(_, name, ..)| name.to_string())
        .unwrap_or_else(|| format!("Station {}", station_id))
}

/// Alerts relative to now so they stay active for one to three days.
pub fn mock_alerts() -> Vec<Alert> {
    let now = Utc::now();
    vec![
        Alert {
            kind: "release".to_string(),
            river: "Delaware River".to_string(),
            message: "Scheduled water release from Cannonsville Reservoir, 6:00 AM - 12:00 PM. \
                      Expect rising water levels."
                .to_string(),
            severity: Severity::Moderate,
            expires: now + Duration::hours(24),
        },
        Alert {
            kind: "weather".to_string(),
            river: "All Areas".to_string(),
            message: "Heavy rainfall expected. Flash flood watch in effect for smaller tributaries."
                .to_string(),
            severity: Severity::High,
            expires: now + Duration::hours(48),
        },
        Alert {
            kind: "condition".to_string(),
            river: "Beaverkill".to_string(),
            message: "Unusually high water temperatures near Cooks Falls. Fishing not \
                      recommended during mid-day hours."
                .to_string(),
            severity: Severity::Moderate,
            expires: now + Duration::hours(72),
        },
    ]
}

fn report(river: &str, section: &str, date: &str, report: &str, flies: &[&str]) -> FishingReport {
    FishingReport {
        river: river.to_string(),
        section: section.to_string(),
        report: report.to_string(),
        date: date.to_string(),
        flies: flies.iter().map(|f| f.to_string()).collect(),
    }
}

pub fn mock_fishing_reports() -> Vec<FishingReport> {
    vec![
        report(
            UPPER_DELAWARE,
            "Callicoon",
            "April 10, 2025",
            "Fishing has been excellent with the recent water levels. Sulphur hatches in the \
             evenings. Most success with size 16-18 dry flies.",
            &["Sulphur Dun #16", "Light Cahill #16", "Blue Winged Olive #18"],
        ),
        report(
            "Neversink River",
            "Main Stem",
            "April 9, 2025",
            "Water running clear. Good numbers of rainbow and brown trout being caught. \
             Nymphing most effective in deeper pools.",
            &["Pheasant Tail Nymph #16", "Hare's Ear #14", "Prince Nymph #16"],
        ),
        report(
            "Beaverkill",
            "Cooks Falls",
            "April 7, 2025",
            "Good action in the riffles and runs. Water temperatures in the optimal range. \
             Caddis hatches in the evenings.",
            &["Elk Hair Caddis #16", "Woolly Bugger #10", "Adams #16"],
        ),
        report(
            "Willowemoc",
            "Main Stem",
            "April 8, 2025",
            "Consistent action in the early mornings. Medium-sized browns responding well to \
             nymphs fished in riffle-pool transitions.",
            &["Copper John #16", "Parachute Adams #16", "CDC Caddis #14"],
        ),
        report(
            EAST_BRANCH,
            "Harvard",
            "April 8, 2025",
            "Excellent dry fly fishing in the afternoon with good hatches of March Browns and \
             Blue Winged Olives. Water levels stable and clear.",
            &["March Brown #12", "Blue Winged Olive #18", "Isonychia #12"],
        ),
    ]
}

fn forecast(day: &str, high: f64, low: f64, condition: &str, precipitation: &str) -> ForecastDay {
    ForecastDay {
        day: day.to_string(),
        high,
        low,
        condition: condition.to_string(),
        precipitation: precipitation.to_string(),
    }
}

/// A mild spring outlook for the basin.
pub fn mock_weather() -> WeatherReport {
    WeatherReport {
        current: CurrentWeather {
            temp: 58.0,
            condition: "Partly Cloudy".to_string(),
            precipitation: "0%".to_string(),
            wind: "SW 5 mph".to_string(),
        },
        forecast: vec![
            forecast("Today", 62.0, 45.0, "Partly Cloudy", "10%"),
            forecast("Thu", 64.0, 48.0, "Mostly Sunny", "5%"),
            forecast("Fri", 59.0, 52.0, "Rain", "70%"),
            forecast("Sat", 55.0, 45.0, "Showers", "40%"),
            forecast("Sun", 60.0, 44.0, "Partly Cloudy", "20%"),
        ],
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

fn classify(value: f64, low: f64, high: f64) -> ReadingStatus {
    if value > high {
        ReadingStatus::High
    } else if value < low {
        ReadingStatus::Low
    } else {
        ReadingStatus::Normal
    }
}

/// Plausible readings for a gauge: a random baseline with a week of jittered
/// daily values around it.
pub fn mock_station_readings(station_id: &str) -> StationReadings {
    let mut rng = rand::thread_rng();
    let base_height = rng.gen_range(2.0..5.0);
    let base_flow = rng.gen_range(1000.0..3000.0);
    let base_temp = rng.gen_range(50.0..55.0);

    let mut jitter = |h: f64, f: f64, t: f64| {
        (
            round_to(h + rng.gen_range(-0.25..0.25), 2),
            (f + rng.gen_range(-200.0..200.0_f64)).round(),
            round_to(t + rng.gen_range(-1.0..1.0), 1),
        )
    };

    let (height, flow, temperature) = jitter(base_height, base_flow, base_temp);
    let today = Utc::now().date_naive();
    let historical = (0..MOCK_HISTORY_DAYS)
        .rev()
        .map(|days_ago| {
            let (height, flow, temperature) = jitter(base_height, base_flow, base_temp);
            HistoricalReading {
                date: (today - Duration::days(days_ago)).format("%b %-d").to_string(),
                height: Some(height),
                flow: Some(flow),
                temperature: Some(temperature),
            }
        })
        .collect();

    StationReadings {
        id: station_id.to_string(),
        name: station_name(station_id),
        current: CurrentReading {
            height: Some(height),
            flow: Some(flow),
            temperature: Some(temperature),
            updated: Some(Utc::now()),
        },
        status: StationStatus {
            height: classify(height, 3.0, 4.0),
            flow: classify(flow, 1500.0, 2500.0),
            temperature: classify(temperature, 51.0, 53.0),
        },
        historical,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{active_alerts, river_options};

    #[test]
    fn test_mock_stations_cover_basin() {
        let stations = mock_stations();
        assert_eq!(stations.len(), 8);
        assert_eq!(
            river_options(&stations),
            vec![
                "all",
                "Upper Delaware River",
                "East Branch Delaware River",
                "West Branch Delaware River",
                "Neversink River",
                "Beaverkill",
                "Willowemoc"
            ]
        );
    }

    #[test]
    fn test_station_name_lookup() {
        assert_eq!(station_name("01437500"), "Neversink River at Godeffroy, NY");
        assert_eq!(station_name("99999999"), "Station 99999999");
    }

    #[test]
    fn test_mock_alerts_are_active() {
        let alerts = mock_alerts();
        let active = active_alerts(&alerts, Utc::now());
        assert_eq!(active.len(), 3);
        assert_eq!(active[0].severity, Severity::High);
    }

    #[test]
    fn test_mock_readings_shape() {
        let readings = mock_station_readings("01427510");
        assert_eq!(readings.name, "Delaware River at Callicoon, NY");
        assert_eq!(readings.historical.len(), MOCK_HISTORY_DAYS as usize);

        let flow = readings.current.flow.unwrap();
        assert!((800.0..=3200.0).contains(&flow));
        assert_eq!(readings.status.flow, classify(flow, 1500.0, 2500.0));
        assert_eq!(readings.flow_series().len(), MOCK_HISTORY_DAYS as usize);
    }

    #[test]
    fn test_mock_fishing_reports() {
        let reports = mock_fishing_reports();
        assert_eq!(reports.len(), 5);
        assert!(reports.iter().all(|r| !r.flies.is_empty()));
    }

    #[test]
    fn test_mock_weather_has_five_day_forecast() {
        let weather = mock_weather();
        assert_eq!(weather.current.condition, "Partly Cloudy");
        assert_eq!(weather.forecast.len(), 5);
        assert!(weather.forecast.iter().all(|day| day.high >= day.low));
    }
}
