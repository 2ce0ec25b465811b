//! Stale-while-revalidate caching for dashboard resources.
//!
//! Every resource is addressed by a `ResourceKey` and held in one
//! process-wide `CacheStore`. Consumers never fetch directly: they subscribe
//! through `SwrCache`, which serves whatever is cached, deduplicates
//! concurrent fetches, keeps stale data visible when a refresh fails, and
//! polls keys that have a refresh interval while anyone is subscribed.
//!
//! `SnapshotStore` persists last-known-good data as JSON so a new session
//! can show something before its first fetch completes.

mod entry;
mod hub;
mod key;
mod scheduler;
mod snapshot;
mod store;
mod swr;

pub use entry::{
    CacheEntry, FetchConfig, DEFAULT_DEDUPE_WINDOW, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_BACKOFF,
};
pub use hub::{Listener, SubscriberId, SubscriptionHub};
pub use key::{Coordinates, ResourceKey};
pub use scheduler::{RevalidationScheduler, SchedulerState};
pub use snapshot::{CachedData, SnapshotStore};
pub use store::{CacheStore, Claim, InFlight};
pub use swr::{Revalidation, Subscription, SwrCache};
