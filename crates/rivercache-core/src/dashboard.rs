//! Dashboard orchestration: the single consumer of the cache.
//!
//! `Dashboard` subscribes to the stations list, alerts, fishing reports,
//! weather for the configured coordinates, and the readings of every station
//! in the current river filter. Cache notifications arrive on a channel and
//! are applied by `process_updates`, which the UI loop drains each tick.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::api::Fetcher;
use crate::cache::{
    CacheEntry, Coordinates, FetchConfig, ResourceKey, SchedulerState, SnapshotStore,
    Subscription, SwrCache,
};
use crate::config::{Config, RefreshIntervals};
use crate::fallback;
use crate::models::{river_options, Resource, Station};
use crate::utils::format_age;

/// Which stations are shown.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RiverFilter {
    #[default]
    All,
    River(String),
}

impl RiverFilter {
    /// Parse a filter choice; "all" (any case) or an empty value shows everything.
    pub fn from_choice(choice: &str) -> Self {
        let choice = choice.trim();
        if choice.is_empty() || choice.eq_ignore_ascii_case("all") {
            RiverFilter::All
        } else {
            RiverFilter::River(choice.to_string())
        }
    }

    pub fn from_option(river: Option<&str>) -> Self {
        river.map_or(RiverFilter::All, Self::from_choice)
    }

    /// Value persisted in the config.
    pub fn as_option(&self) -> Option<String> {
        match self {
            RiverFilter::All => None,
            RiverFilter::River(name) => Some(name.clone()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            RiverFilter::All => "All Rivers",
            RiverFilter::River(name) => name,
        }
    }

    pub fn matches(&self, station: &Station) -> bool {
        match self {
            RiverFilter::All => true,
            RiverFilter::River(name) => station.river == *name,
        }
    }
}

/// Stations visible under `filter`, in list order.
pub fn filter_stations(stations: &[Station], filter: &RiverFilter) -> Vec<Station> {
    stations
        .iter()
        .filter(|station| filter.matches(station))
        .cloned()
        .collect()
}

pub struct Dashboard {
    cache: SwrCache<Resource>,
    snapshots: Option<SnapshotStore>,
    updates_tx: mpsc::UnboundedSender<CacheEntry<Resource>>,
    updates_rx: mpsc::UnboundedReceiver<CacheEntry<Resource>>,
    subscriptions: HashMap<ResourceKey, Subscription>,
    /// Fetch time of the last snapshot written per key.
    persisted: HashMap<ResourceKey, DateTime<Utc>>,
    /// Keys seeded from a stale snapshot, with that snapshot's fetch time,
    /// until a newer fetch lands.
    stale_seeds: HashMap<ResourceKey, DateTime<Utc>>,
    filter: RiverFilter,
    coordinates: Coordinates,
    intervals: RefreshIntervals,
    visible: Vec<Station>,
}

impl Dashboard {
    pub fn new(
        fetcher: Arc<dyn Fetcher<Resource>>,
        config: &Config,
        snapshots: Option<SnapshotStore>,
    ) -> Self {
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        Self {
            cache: SwrCache::new(fetcher),
            snapshots,
            updates_tx,
            updates_rx,
            subscriptions: HashMap::new(),
            persisted: HashMap::new(),
            stale_seeds: HashMap::new(),
            filter: RiverFilter::from_option(config.selected_river.as_deref()),
            coordinates: config.coordinates,
            intervals: config.refresh,
            visible: Vec::new(),
        }
    }

    pub fn cache(&self) -> &SwrCache<Resource> {
        &self.cache
    }

    pub fn weather_key(&self) -> ResourceKey {
        ResourceKey::Weather(self.coordinates)
    }

    /// Seed snapshots, subscribe to every top-level resource and to the
    /// readings of the visible stations. Must run inside a tokio runtime.
    pub fn mount(&mut self) {
        let keys = [
            ResourceKey::Stations,
            ResourceKey::Alerts,
            ResourceKey::FishingReports,
            self.weather_key(),
        ];
        for key in &keys {
            self.seed_from_snapshot(key);
        }
        for key in keys {
            self.subscribe(key);
        }
        self.refresh_visible();
        info!(
            subscriptions = self.subscriptions.len(),
            filter = %self.filter.label(),
            "Dashboard mounted"
        );
    }

    fn config_for(&self, key: &ResourceKey) -> FetchConfig<Resource> {
        let (refresh_interval, fallback_data) = match key {
            ResourceKey::Stations => (
                self.intervals.stations(),
                Some(Resource::Stations(fallback::mock_stations())),
            ),
            ResourceKey::Station(id) => (
                self.intervals.readings(),
                Some(Resource::Station(fallback::mock_station_readings(id))),
            ),
            ResourceKey::Weather(_) => (
                self.intervals.weather(),
                Some(Resource::Weather(fallback::mock_weather())),
            ),
            ResourceKey::Alerts => (
                self.intervals.alerts(),
                Some(Resource::Alerts(fallback::mock_alerts())),
            ),
            ResourceKey::FishingReports => (
                self.intervals.fishing(),
                Some(Resource::FishingReports(fallback::mock_fishing_reports())),
            ),
        };
        FetchConfig {
            refresh_interval,
            fallback_data,
            ..FetchConfig::default()
        }
    }

    fn subscribe(&mut self, key: ResourceKey) {
        if self.subscriptions.contains_key(&key) {
            return;
        }
        let tx = self.updates_tx.clone();
        let config = self.config_for(&key);
        let subscription = self.cache.subscribe(key.clone(), config, move |entry| {
            // Receiver lives as long as the dashboard; a closed channel means shutdown.
            let _ = tx.send(entry.clone());
        });
        self.subscriptions.insert(key, subscription);
    }

    fn seed_from_snapshot(&mut self, key: &ResourceKey) {
        let Some(ref snapshots) = self.snapshots else {
            return;
        };
        match snapshots.load::<Resource>(key) {
            Ok(Some(cached)) => {
                let stale = cached.is_stale();
                debug!(key = %key, age = %cached.age_display(), stale, "Seeding from snapshot");
                if stale {
                    self.stale_seeds.insert(key.clone(), cached.cached_at);
                }
                self.cache.seed(key, cached.data, cached.cached_at);
            }
            Ok(None) => {}
            Err(e) => warn!(key = %key, error = %e, "Ignoring unreadable snapshot"),
        }
    }

    /// Apply every queued cache notification. Returns how many were applied.
    ///
    /// Successful payloads are persisted; a change to the stations list
    /// recomputes the visible set and its readings subscriptions.
    pub fn process_updates(&mut self) -> usize {
        let mut applied = 0;
        let mut stations_changed = false;
        while let Ok(entry) = self.updates_rx.try_recv() {
            applied += 1;
            if entry.key == ResourceKey::Stations {
                stations_changed = true;
            }
            self.clear_stale_seed(&entry);
            self.persist(&entry);
        }
        if stations_changed {
            self.refresh_visible();
        }
        applied
    }

    fn clear_stale_seed(&mut self, entry: &CacheEntry<Resource>) {
        let Some(&seeded_at) = self.stale_seeds.get(&entry.key) else {
            return;
        };
        if entry.last_fetched_at.is_some_and(|at| at > seeded_at) {
            self.stale_seeds.remove(&entry.key);
        }
    }

    fn persist(&mut self, entry: &CacheEntry<Resource>) {
        let (Some(snapshots), Some(data), Some(fetched_at)) =
            (self.snapshots.as_ref(), entry.data.as_ref(), entry.last_fetched_at)
        else {
            return;
        };
        // Fallback data always carries an error; only live data is saved.
        if entry.error.is_some() || self.persisted.get(&entry.key) == Some(&fetched_at) {
            return;
        }
        match snapshots.save(&entry.key, data, fetched_at) {
            Ok(()) => {
                self.persisted.insert(entry.key.clone(), fetched_at);
            }
            Err(e) => warn!(key = %entry.key, error = %e, "Failed to save snapshot"),
        }
    }

    /// Recompute the visible stations and make the readings subscriptions
    /// follow them.
    fn refresh_visible(&mut self) {
        self.visible = match self.stations().data {
            Some(Resource::Stations(ref stations)) => filter_stations(stations, &self.filter),
            _ => Vec::new(),
        };

        let wanted: HashSet<ResourceKey> = self
            .visible
            .iter()
            .map(|station| ResourceKey::station(&station.id))
            .collect();
        self.subscriptions.retain(|key, _| match key {
            ResourceKey::Station(_) => wanted.contains(key),
            _ => true,
        });
        for station in self.visible.clone() {
            let key = ResourceKey::station(station.id);
            if !self.subscriptions.contains_key(&key) {
                self.seed_from_snapshot(&key);
                self.subscribe(key);
            }
        }
        debug!(visible = self.visible.len(), "Visible stations updated");
    }

    pub fn set_filter(&mut self, filter: RiverFilter) {
        if filter == self.filter {
            return;
        }
        info!(filter = %filter.label(), "River filter changed");
        self.filter = filter;
        self.refresh_visible();
    }

    /// Move the weather subscription to new coordinates.
    pub fn set_coordinates(&mut self, coordinates: Coordinates) {
        if coordinates == self.coordinates {
            return;
        }
        self.subscriptions.remove(&self.weather_key());
        self.coordinates = coordinates;
        let key = self.weather_key();
        self.seed_from_snapshot(&key);
        self.subscribe(key);
    }

    /// Invalidate every subscribed key. Returns how many were invalidated.
    pub fn refresh_all(&self) -> usize {
        let keys: Vec<&ResourceKey> = self.subscriptions.keys().collect();
        info!(keys = keys.len(), "Refreshing all resources");
        for key in &keys {
            self.cache.invalidate(key);
        }
        keys.len()
    }

    /// Retry a single resource, typically one showing an error.
    pub fn retry(&self, key: &ResourceKey) {
        info!(key = %key, "Retrying");
        self.cache.invalidate(key);
    }

    /// Wait until no subscribed key has a fetch in flight, applying
    /// notifications along the way. New readings subscriptions created by a
    /// stations update are waited for too.
    pub async fn settle(&mut self) {
        loop {
            self.process_updates();
            let pending: Vec<ResourceKey> = self
                .subscriptions
                .keys()
                .filter(|key| self.cache.state(key) == SchedulerState::Fetching)
                .cloned()
                .collect();
            if pending.is_empty() {
                break;
            }
            join_all(pending.iter().map(|key| self.cache.settled(key))).await;
        }
        self.process_updates();
    }

    pub fn entry(&self, key: &ResourceKey) -> CacheEntry<Resource> {
        self.cache.get(key)
    }

    pub fn stations(&self) -> CacheEntry<Resource> {
        self.cache.get(&ResourceKey::Stations)
    }

    pub fn readings(&self, station_id: &str) -> CacheEntry<Resource> {
        self.cache.get(&ResourceKey::station(station_id))
    }

    pub fn weather(&self) -> CacheEntry<Resource> {
        self.cache.get(&self.weather_key())
    }

    pub fn alerts(&self) -> CacheEntry<Resource> {
        self.cache.get(&ResourceKey::Alerts)
    }

    pub fn fishing_reports(&self) -> CacheEntry<Resource> {
        self.cache.get(&ResourceKey::FishingReports)
    }

    /// True while `key` still shows data from a snapshot older than the
    /// staleness limit.
    pub fn is_stale_snapshot(&self, key: &ResourceKey) -> bool {
        self.stale_seeds.contains_key(key)
    }

    pub fn visible_stations(&self) -> &[Station] {
        &self.visible
    }

    pub fn filter(&self) -> &RiverFilter {
        &self.filter
    }

    pub fn coordinates(&self) -> Coordinates {
        self.coordinates
    }

    /// Filter choices from the current stations list.
    pub fn river_options(&self) -> Vec<String> {
        match self.stations().data {
            Some(Resource::Stations(ref stations)) => river_options(stations),
            _ => vec!["all".to_string()],
        }
    }

    pub fn is_loading(&self) -> bool {
        self.subscriptions
            .keys()
            .any(|key| self.cache.state(key) == SchedulerState::Fetching)
    }

    /// Age of the most recent successful fetch across subscribed keys.
    pub fn last_updated(&self) -> String {
        self.subscriptions
            .keys()
            .filter_map(|key| self.cache.get(key).last_fetched_at)
            .max()
            .map(|at| format_age((Utc::now() - at).num_minutes()))
            .unwrap_or_else(|| "never".to_string())
    }

    /// Every subscribed entry as JSON, keyed by API path.
    pub fn to_json(&self) -> serde_json::Value {
        let mut keys: Vec<&ResourceKey> = self.subscriptions.keys().collect();
        keys.sort_by_key(|key| key.path());

        let entries: serde_json::Map<String, serde_json::Value> = keys
            .into_iter()
            .map(|key| {
                let entry = self.cache.get(key);
                let value = json!({
                    "data": entry.data,
                    "error": entry.error.as_ref().map(|e| e.to_string()),
                    "last_fetched_at": entry.last_fetched_at,
                    "age": entry.age_display(),
                });
                (key.path(), value)
            })
            .collect();
        serde_json::Value::Object(entries)
    }
}
