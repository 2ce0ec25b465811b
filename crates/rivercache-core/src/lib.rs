//! rivercache-core - data layer for the river conditions dashboard.
//!
//! This crate contains everything below the terminal UI:
//!
//! - `api`: HTTP client for the dashboard JSON API and the `Fetcher` seam
//! - `cache`: stale-while-revalidate cache (store, scheduler, subscriptions)
//! - `dashboard`: the orchestrator composing all resources into one view
//! - `models`: stations, readings, weather, alerts, fishing reports
//! - `fallback`: mock data served when the API has never answered
//! - `config`: user configuration persisted under the config directory

pub mod api;
pub mod cache;
pub mod config;
pub mod dashboard;
pub mod fallback;
pub mod models;
pub mod utils;

pub use api::{ApiClient, FetchError, Fetcher};
pub use cache::{
    CacheEntry, Coordinates, FetchConfig, ResourceKey, SchedulerState, SnapshotStore, Subscription,
    SwrCache,
};
pub use config::Config;
pub use dashboard::{Dashboard, RiverFilter};
