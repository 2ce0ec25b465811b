use std::time::Duration;

use chrono::{DateTime, Utc};

use super::ResourceKey;
use crate::api::FetchError;
use crate::utils::format_age;

/// Default window after a completed fetch in which revalidation is skipped.
pub const DEFAULT_DEDUPE_WINDOW: Duration = Duration::from_secs(10);

/// Default number of retries for a transient failure.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default first retry delay; doubled on every further attempt.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Snapshot of one key's cache state, as handed to subscribers.
///
/// `data` and `error` are both `None` until the first fetch settles. Once set
/// they persist until a newer outcome supersedes them: a failed fetch never
/// clears `data`.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub key: ResourceKey,
    pub data: Option<T>,
    pub error: Option<FetchError>,
    /// Time of the last successful fetch (seeded snapshots carry their own).
    pub last_fetched_at: Option<DateTime<Utc>>,
    /// True exactly while a fetch for this key is in flight.
    pub is_validating: bool,
}

impl<T> CacheEntry<T> {
    pub fn new(key: ResourceKey) -> Self {
        Self {
            key,
            data: None,
            error: None,
            last_fetched_at: None,
            is_validating: false,
        }
    }

    /// Nothing to show yet: no data and no error.
    pub fn is_loading(&self) -> bool {
        self.data.is_none() && self.error.is_none()
    }

    /// Only an error is available; consumers should render a retry affordance.
    pub fn is_failed(&self) -> bool {
        self.data.is_none() && self.error.is_some()
    }

    /// Data is shown but the last fetch failed.
    pub fn is_stale_with_error(&self) -> bool {
        self.data.is_some() && self.error.is_some()
    }

    pub fn age_display(&self) -> String {
        match self.last_fetched_at {
            Some(at) => format_age((Utc::now() - at).num_minutes()),
            None => "never".to_string(),
        }
    }
}

/// Per-key fetch policy, attached when a subscriber registers.
///
/// When several subscribers register different configs for the same key, the
/// most recently registered one governs.
#[derive(Debug, Clone)]
pub struct FetchConfig<T> {
    /// Background refetch period; `None` disables polling.
    pub refresh_interval: Option<Duration>,
    pub dedupe_window: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
    /// Substitute data adopted when a fetch fails and nothing was ever fetched.
    pub fallback_data: Option<T>,
}

impl<T> Default for FetchConfig<T> {
    fn default() -> Self {
        Self {
            refresh_interval: None,
            dedupe_window: DEFAULT_DEDUPE_WINDOW,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            fallback_data: None,
        }
    }
}

impl<T> FetchConfig<T> {
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = Some(interval);
        self
    }

    pub fn with_dedupe_window(mut self, window: Duration) -> Self {
        self.dedupe_window = window;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn with_fallback(mut self, data: T) -> Self {
        self.fallback_data = Some(data);
        self
    }
}
