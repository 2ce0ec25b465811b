use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, Shared};
use tokio::time::Instant;

use super::{CacheEntry, ResourceKey};
use crate::api::FetchError;

/// Handle to a fetch in progress. Cloning it lets more callers await the
/// same completion.
pub type InFlight = Shared<BoxFuture<'static, ()>>;

/// Outcome of asking the store for permission to fetch a key.
pub enum Claim {
    /// The last fetch completed within the dedupe window.
    Fresh,
    /// A fetch is already running; await this handle to see it settle.
    Joined(InFlight),
    /// The caller's fetch was installed and must now be driven.
    Started(InFlight),
}

struct Slot<T> {
    entry: CacheEntry<T>,
    in_flight: Option<InFlight>,
    /// Monotonic completion time of the last fetch, success or failure.
    completed_at: Option<Instant>,
}

impl<T> Slot<T> {
    fn new(key: ResourceKey) -> Self {
        Self {
            entry: CacheEntry::new(key),
            in_flight: None,
            completed_at: None,
        }
    }
}

/// Process-wide map from resource key to its cache entry.
///
/// Every read-modify-write of a key happens under one short lock that is
/// never held across an await. Entries are never evicted.
pub struct CacheStore<T> {
    slots: Mutex<HashMap<ResourceKey, Slot<T>>>,
}

impl<T> Default for CacheStore<T> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<T: Clone> CacheStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ResourceKey, Slot<T>>> {
        // A listener panicking cannot leave a slot half-written: recover.
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current entry for `key`; an empty entry when the key was never seen.
    pub fn get(&self, key: &ResourceKey) -> CacheEntry<T> {
        self.lock()
            .get(key)
            .map(|slot| slot.entry.clone())
            .unwrap_or_else(|| CacheEntry::new(key.clone()))
    }

    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.lock().contains_key(key)
    }

    pub fn keys(&self) -> Vec<ResourceKey> {
        self.lock().keys().cloned().collect()
    }

    /// Apply `mutator` to the entry, creating it if needed, and return the
    /// result. `is_validating` always reflects the in-flight slot afterwards.
    pub fn set<F>(&self, key: &ResourceKey, mutator: F) -> CacheEntry<T>
    where
        F: FnOnce(&mut CacheEntry<T>),
    {
        let mut slots = self.lock();
        let slot = slots
            .entry(key.clone())
            .or_insert_with(|| Slot::new(key.clone()));
        mutator(&mut slot.entry);
        slot.entry.key = key.clone();
        slot.entry.is_validating = slot.in_flight.is_some();
        slot.entry.clone()
    }

    /// Install last-known-good data loaded from disk.
    ///
    /// Seeded data is shown immediately but does not count as a completed
    /// fetch, so the first subscriber still revalidates it. Live data is
    /// never replaced by a seed.
    pub fn seed(&self, key: &ResourceKey, data: T, fetched_at: DateTime<Utc>) -> CacheEntry<T> {
        self.set(key, |entry| {
            if entry.data.is_none() {
                entry.data = Some(data);
                entry.last_fetched_at = Some(fetched_at);
            }
        })
    }

    /// Claim the right to fetch `key`.
    ///
    /// At most one fetch per key is ever installed: a second claim while one
    /// is running joins it. With `dedupe_window` set, a claim arriving within
    /// that window of the last completion is answered `Fresh`. `make` is only
    /// invoked when a new fetch is installed and must not touch the store.
    pub fn claim<F>(&self, key: &ResourceKey, dedupe_window: Option<Duration>, make: F) -> Claim
    where
        F: FnOnce() -> InFlight,
    {
        let mut slots = self.lock();
        let slot = slots
            .entry(key.clone())
            .or_insert_with(|| Slot::new(key.clone()));

        if let Some(ref handle) = slot.in_flight {
            return Claim::Joined(handle.clone());
        }

        if let (Some(window), Some(completed_at)) = (dedupe_window, slot.completed_at) {
            if completed_at.elapsed() < window {
                return Claim::Fresh;
            }
        }

        let handle = make();
        slot.in_flight = Some(handle.clone());
        slot.entry.is_validating = true;
        Claim::Started(handle)
    }

    /// Record a fetch outcome and release the in-flight slot.
    ///
    /// Success replaces data and clears the error. Failure keeps existing
    /// data and only records the error; with no data ever fetched, `fallback`
    /// is adopted as data alongside the error.
    pub fn complete(
        &self,
        key: &ResourceKey,
        outcome: Result<T, FetchError>,
        fallback: Option<T>,
    ) -> CacheEntry<T> {
        let mut slots = self.lock();
        let slot = slots
            .entry(key.clone())
            .or_insert_with(|| Slot::new(key.clone()));

        slot.in_flight = None;
        slot.completed_at = Some(Instant::now());

        let entry = &mut slot.entry;
        entry.is_validating = false;
        match outcome {
            Ok(data) => {
                entry.data = Some(data);
                entry.error = None;
                entry.last_fetched_at = Some(Utc::now());
            }
            Err(error) => {
                if entry.data.is_none() {
                    entry.data = fallback;
                }
                entry.error = Some(error);
            }
        }
        entry.clone()
    }

    /// Handle to the running fetch for `key`, if any.
    pub fn in_flight(&self, key: &ResourceKey) -> Option<InFlight> {
        self.lock().get(key).and_then(|slot| slot.in_flight.clone())
    }

    pub fn is_validating(&self, key: &ResourceKey) -> bool {
        self.lock()
            .get(key)
            .is_some_and(|slot| slot.in_flight.is_some())
    }

    /// Time since the last completed fetch, if any.
    pub fn since_completion(&self, key: &ResourceKey) -> Option<Duration> {
        self.lock()
            .get(key)
            .and_then(|slot| slot.completed_at)
            .map(|at| at.elapsed())
    }
}
