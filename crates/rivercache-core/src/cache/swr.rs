//! Stale-while-revalidate cache facade.
//!
//! `SwrCache` ties the store, the scheduler and the subscription hub
//! together around a single `Fetcher`. Consumers subscribe to a key, get the
//! current entry immediately, and are notified every time a background fetch
//! settles.

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::hub::SubscriberId;
use super::store::{Claim, InFlight};
use super::{
    CacheEntry, CacheStore, FetchConfig, ResourceKey, RevalidationScheduler, SchedulerState,
    SubscriptionHub,
};
use crate::api::{FetchError, Fetcher};

/// Why a fetch is being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    /// Subscription or plain revalidation; honours the dedupe window.
    Mount,
    /// The key's refresh timer fired.
    Timer,
    /// Explicit invalidation; bypasses dedupe and cancels the pending timer.
    Manual,
}

/// Handle returned by `revalidate`/`invalidate`.
///
/// Dropping it does not cancel anything; awaiting `finished` waits for the
/// fetch it started or joined.
pub struct Revalidation {
    handle: Option<InFlight>,
    started: bool,
}

impl Revalidation {
    fn deduped() -> Self {
        Self {
            handle: None,
            started: false,
        }
    }

    /// No fetch was needed: the entry is within its dedupe window.
    pub fn is_deduped(&self) -> bool {
        self.handle.is_none()
    }

    /// This call issued a new fetch rather than joining one in flight.
    pub fn started(&self) -> bool {
        self.started
    }

    pub async fn finished(self) {
        if let Some(handle) = self.handle {
            handle.await;
        }
    }
}

/// Registration returned by `SwrCache::subscribe`.
///
/// Unsubscribes when dropped. When the last subscriber of a key leaves, the
/// key's refresh timer is cancelled; its entry stays cached.
pub struct Subscription {
    key: ResourceKey,
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn key(&self) -> &ResourceKey {
        &self.key
    }

    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .field("active", &self.release.is_some())
            .finish()
    }
}

struct Inner<T> {
    store: CacheStore<T>,
    scheduler: RevalidationScheduler,
    hub: SubscriptionHub<T>,
    fetcher: Arc<dyn Fetcher<T>>,
}

/// Process-wide stale-while-revalidate cache. Clone is cheap and shares state.
pub struct SwrCache<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for SwrCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> SwrCache<T> {
    pub fn new(fetcher: Arc<dyn Fetcher<T>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                store: CacheStore::new(),
                scheduler: RevalidationScheduler::new(),
                hub: SubscriptionHub::new(),
                fetcher,
            }),
        }
    }

    pub fn get(&self, key: &ResourceKey) -> CacheEntry<T> {
        self.inner.store.get(key)
    }

    /// Every key the cache has ever seen.
    pub fn keys(&self) -> Vec<ResourceKey> {
        self.inner.store.keys()
    }

    /// Register `listener` for `key`.
    ///
    /// The listener receives the current entry before this returns, then
    /// every later change. A fetch starts right away unless the entry is
    /// within its dedupe window or one is already in flight. `config`
    /// becomes the governing config for the key.
    pub fn subscribe<F>(
        &self,
        key: ResourceKey,
        config: FetchConfig<T>,
        listener: F,
    ) -> Subscription
    where
        F: Fn(&CacheEntry<T>) + Send + Sync + 'static,
    {
        let inner = &self.inner;
        inner.hub.configure(&key, config);
        let id = inner.hub.register(&key, Arc::new(listener));

        let revalidation = inner.start(&key, Trigger::Mount);
        if !revalidation.started() {
            // A started fetch already notified every listener, this one included.
            inner.hub.deliver(&key, id, &inner.store.get(&key));
        }
        if revalidation.is_deduped() && !inner.scheduler.is_scheduled(&key) {
            let elapsed = inner.store.since_completion(&key).unwrap_or_default();
            inner.rearm(&key, elapsed);
        }

        debug!(key = %key, subscribers = inner.hub.subscriber_count(&key), "Subscribed");
        Subscription {
            key: key.clone(),
            release: Some(Box::new(release_fn(Arc::downgrade(inner), key, id))),
        }
    }

    /// Fetch `key` unless it is fresh or already being fetched.
    pub fn revalidate(&self, key: &ResourceKey) -> Revalidation {
        self.inner.start(key, Trigger::Mount)
    }

    /// Force a fetch of `key`, cancelling its pending timer. Joins the
    /// in-flight fetch instead of issuing a second one.
    pub fn invalidate(&self, key: &ResourceKey) -> Revalidation {
        self.inner.start(key, Trigger::Manual)
    }

    /// Wait for the fetch currently running for `key`, without starting one.
    pub async fn settled(&self, key: &ResourceKey) {
        if let Some(handle) = self.inner.store.in_flight(key) {
            handle.await;
        }
    }

    /// Mutate an entry in place and notify its subscribers.
    pub fn mutate<F>(&self, key: &ResourceKey, mutator: F) -> CacheEntry<T>
    where
        F: FnOnce(&mut CacheEntry<T>),
    {
        let entry = self.inner.store.set(key, mutator);
        self.inner.hub.notify(&entry);
        entry
    }

    /// Install last-known-good data without a network call.
    pub fn seed(&self, key: &ResourceKey, data: T, fetched_at: DateTime<Utc>) -> CacheEntry<T> {
        let entry = self.inner.store.seed(key, data, fetched_at);
        self.inner.hub.notify(&entry);
        entry
    }

    pub fn state(&self, key: &ResourceKey) -> SchedulerState {
        if self.inner.store.is_validating(key) {
            SchedulerState::Fetching
        } else if self.inner.scheduler.is_scheduled(key) {
            SchedulerState::Scheduled
        } else {
            SchedulerState::Idle
        }
    }

    /// Time until the key's next background refresh.
    pub fn due_in(&self, key: &ResourceKey) -> Option<Duration> {
        self.inner.scheduler.due_in(key)
    }

    /// Keys that currently have at least one subscriber.
    pub fn subscribed_keys(&self) -> Vec<ResourceKey> {
        self.inner.hub.keys()
    }

    pub fn subscriber_count(&self, key: &ResourceKey) -> usize {
        self.inner.hub.subscriber_count(key)
    }
}

fn release_fn<T: Clone + Send + Sync + 'static>(
    inner: Weak<Inner<T>>,
    key: ResourceKey,
    id: SubscriberId,
) -> impl FnOnce() + Send + Sync {
    move || {
        if let Some(inner) = inner.upgrade() {
            inner.release(&key, id);
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Inner<T> {
    fn start(self: &Arc<Self>, key: &ResourceKey, trigger: Trigger) -> Revalidation {
        let window = match trigger {
            Trigger::Mount => Some(self.hub.config(key).dedupe_window),
            Trigger::Timer | Trigger::Manual => None,
        };
        if trigger == Trigger::Manual {
            self.scheduler.cancel(key);
        }

        let this = Arc::clone(self);
        let fetch_key = key.clone();
        let (announced_tx, announced_rx) = oneshot::channel();
        match self.store.claim(key, window, move || {
            this.run(fetch_key, announced_rx).boxed().shared()
        }) {
            Claim::Fresh => {
                debug!(key = %key, "Within dedupe window, serving cached entry");
                Revalidation::deduped()
            }
            Claim::Joined(handle) => {
                debug!(key = %key, ?trigger, "Joining in-flight fetch");
                Revalidation {
                    handle: Some(handle),
                    started: false,
                }
            }
            Claim::Started(handle) => {
                debug!(key = %key, ?trigger, "Fetch started");
                // Listeners must see the validating entry before the outcome.
                self.hub.notify(&self.store.get(key));
                let _ = announced_tx.send(());
                tokio::spawn(handle.clone());
                Revalidation {
                    handle: Some(handle),
                    started: true,
                }
            }
        }
    }

    async fn run(self: Arc<Self>, key: ResourceKey, announced: oneshot::Receiver<()>) {
        // A joiner may poll this future before the starter has notified.
        let _ = announced.await;
        let config = self.hub.config(&key);
        let outcome = fetch_with_retry(self.fetcher.as_ref(), &key, &config).await;
        match outcome {
            Ok(_) => debug!(key = %key, "Fetch succeeded"),
            Err(ref e) => warn!(key = %key, error = %e, "Fetch failed"),
        }

        // Re-read: a subscriber may have mounted a different config meanwhile.
        let fallback = self.hub.config(&key).fallback_data;
        let entry = self.store.complete(&key, outcome, fallback);
        self.hub.notify(&entry);
        self.rearm(&key, Duration::ZERO);
    }

    /// Arm the refresh timer for the remainder of the interval, or tear it
    /// down when nobody is watching the key.
    fn rearm(self: &Arc<Self>, key: &ResourceKey, elapsed: Duration) {
        let interval = match self.hub.config(key).refresh_interval {
            Some(interval) if self.hub.subscriber_count(key) > 0 => interval,
            _ => {
                self.scheduler.cancel(key);
                return;
            }
        };

        let weak = Arc::downgrade(self);
        let timer_key = key.clone();
        self.scheduler
            .schedule(key, interval.saturating_sub(elapsed), move || {
                if let Some(inner) = weak.upgrade() {
                    inner.start(&timer_key, Trigger::Timer);
                }
            });
    }

    fn release(&self, key: &ResourceKey, id: SubscriberId) {
        let remaining = self.hub.unregister(key, id);
        if remaining == 0 {
            self.scheduler.cancel(key);
        }
        debug!(key = %key, remaining, "Unsubscribed");
    }
}

/// Call the fetcher, retrying transient failures with exponential backoff.
/// The last attempt's outcome is returned.
async fn fetch_with_retry<T>(
    fetcher: &dyn Fetcher<T>,
    key: &ResourceKey,
    config: &FetchConfig<T>,
) -> Result<T, FetchError> {
    let mut retries = 0;
    let mut backoff = config.retry_backoff;

    loop {
        match fetcher.fetch(key).await {
            Ok(data) => return Ok(data),
            Err(e) if e.is_retryable() && retries < config.max_retries => {
                retries += 1;
                warn!(
                    key = %key,
                    retry = retries,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %e,
                    "Fetch failed, backing off"
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
            Err(e) => return Err(e),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use futures::future::BoxFuture;

    use crate::cache::DEFAULT_DEDUPE_WINDOW;
    use crate::models::Station;

    /// Fetcher replaying a script of outcomes; repeats the last one when
    /// the script runs out.
    struct ScriptedFetcher<T> {
        script: Mutex<VecDeque<Result<T, FetchError>>>,
        last: Mutex<Option<Result<T, FetchError>>>,
        delay: Duration,
        calls: AtomicUsize,
        active: AtomicUsize,
        max_active: AtomicUsize,
    }

    impl<T: Clone + Send + Sync> ScriptedFetcher<T> {
        fn new(script: Vec<Result<T, FetchError>>) -> Arc<Self> {
            Self::with_delay(script, Duration::ZERO)
        }

        fn with_delay(script: Vec<Result<T, FetchError>>, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                last: Mutex::new(None),
                delay,
                calls: AtomicUsize::new(0),
                active: AtomicUsize::new(0),
                max_active: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn max_active(&self) -> usize {
            self.max_active.load(Ordering::SeqCst)
        }

        fn next_outcome(&self) -> Result<T, FetchError> {
            let next = self.script.lock().unwrap().pop_front();
            let mut last = self.last.lock().unwrap();
            match next {
                Some(outcome) => {
                    *last = Some(outcome.clone());
                    outcome
                }
                None => last
                    .clone()
                    .unwrap_or_else(|| Err(FetchError::network("script exhausted"))),
            }
        }
    }

    impl<T: Clone + Send + Sync> Fetcher<T> for ScriptedFetcher<T> {
        fn fetch<'a>(&'a self, _key: &'a ResourceKey) -> BoxFuture<'a, Result<T, FetchError>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_active.fetch_max(now, Ordering::SeqCst);
                if !self.delay.is_zero() {
                    tokio::time::sleep(self.delay).await;
                }
                self.active.fetch_sub(1, Ordering::SeqCst);
                self.next_outcome()
            })
        }
    }

    fn cache_for<T>(fetcher: &Arc<ScriptedFetcher<T>>) -> SwrCache<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        SwrCache::new(fetcher.clone())
    }

    type Seen<T> = Arc<Mutex<Vec<CacheEntry<T>>>>;

    fn recorder<T: Clone + Send + 'static>() -> (Seen<T>, impl Fn(&CacheEntry<T>) + Send + Sync) {
        let seen: Seen<T> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |entry: &CacheEntry<T>| {
            sink.lock().unwrap().push(entry.clone())
        })
    }

    fn last_seen<T: Clone>(seen: &Seen<T>) -> CacheEntry<T> {
        seen.lock().unwrap().last().cloned().expect("no entry delivered")
    }

    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    fn no_retry<T>() -> FetchConfig<T> {
        FetchConfig::default().with_max_retries(0)
    }

    fn station(id: &str, river: &str) -> Station {
        Station {
            id: id.to_string(),
            name: format!("{} at {}", river, id),
            lat: 41.76056,
            lng: -75.05833,
            river: river.to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_requests_share_one_fetch() {
        let fetcher = ScriptedFetcher::with_delay(vec![Ok(vec![1u32])], Duration::from_secs(1));
        let cache = cache_for(&fetcher);
        let key = ResourceKey::Stations;

        let first = cache.revalidate(&key);
        assert!(first.started());
        let second = cache.revalidate(&key);
        let forced = cache.invalidate(&key);
        assert!(!second.started());
        assert!(!forced.started());

        let (_, listener) = recorder();
        let _a = cache.subscribe(key.clone(), FetchConfig::default(), listener);
        let (_, listener) = recorder();
        let _b = cache.subscribe(key.clone(), FetchConfig::default(), listener);
        assert_eq!(cache.state(&key), SchedulerState::Fetching);

        first.finished().await;
        second.finished().await;
        forced.finished().await;

        assert_eq!(fetcher.calls(), 1);
        assert_eq!(fetcher.max_active(), 1);
        assert_eq!(cache.get(&key).data, Some(vec![1]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_subscription_starts_fetch_and_delivers_synchronously() {
        let fetcher = ScriptedFetcher::new(vec![Ok(vec![3u32])]);
        let cache = cache_for(&fetcher);
        let key = ResourceKey::Alerts;
        let (seen, listener) = recorder();

        let _sub = cache.subscribe(key.clone(), FetchConfig::default(), listener);

        // Delivered before any await: nothing fetched yet, fetch in flight.
        {
            let seen = seen.lock().unwrap();
            assert_eq!(seen.len(), 1);
            assert!(seen[0].is_loading());
            assert!(seen[0].is_validating);
        }

        cache.revalidate(&key).finished().await;
        let entry = last_seen(&seen);
        assert_eq!(entry.data, Some(vec![3]));
        assert!(!entry.is_validating);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_validating_entry_never_arrives_after_outcome() {
        for i in 0..500u32 {
            let fetcher = ScriptedFetcher::new(vec![Ok(vec![i])]);
            let cache = cache_for(&fetcher);
            let key = ResourceKey::station(format!("{:08}", i));
            let (seen, listener) = recorder();

            let _sub = cache.subscribe(key.clone(), no_retry(), listener);
            cache.settled(&key).await;

            let has_outcome = || seen.lock().unwrap().iter().any(|e| e.data.is_some());
            let delivered = tokio::time::timeout(Duration::from_secs(5), async {
                while !has_outcome() {
                    tokio::task::yield_now().await;
                }
            })
            .await;
            assert!(delivered.is_ok(), "outcome never delivered for {}", key);

            let entry = last_seen(&seen);
            assert_eq!(entry.data, Some(vec![i]), "stale final entry for {}", key);
            assert!(!entry.is_validating);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_existing_entry_delivered_before_revalidation() {
        let fetcher = ScriptedFetcher::with_delay(
            vec![Ok(vec![1u32]), Ok(vec![2])],
            Duration::from_secs(1),
        );
        let cache = cache_for(&fetcher);
        let key = ResourceKey::FishingReports;

        cache.revalidate(&key).finished().await;
        // Leave the dedupe window so the new subscriber triggers a refetch.
        tokio::time::sleep(DEFAULT_DEDUPE_WINDOW + Duration::from_secs(1)).await;

        let (seen, listener) = recorder();
        let _sub = cache.subscribe(key.clone(), FetchConfig::default(), listener);
        {
            let seen = seen.lock().unwrap();
            assert_eq!(seen.len(), 1);
            assert_eq!(seen[0].data, Some(vec![1]));
            assert!(seen[0].is_validating);
        }

        cache.revalidate(&key).finished().await;
        assert_eq!(last_seen(&seen).data, Some(vec![2]));
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_http_500_without_fallback_surfaces_error() {
        let fetcher: Arc<ScriptedFetcher<Vec<Station>>> =
            ScriptedFetcher::new(vec![Err(FetchError::Http {
                status: 500,
                info: "Failed to fetch station data".to_string(),
            })]);
        let cache = cache_for(&fetcher);
        let key = ResourceKey::Stations;
        let (seen, listener) = recorder();

        let _sub = cache.subscribe(key.clone(), FetchConfig::default(), listener);
        cache.revalidate(&key).finished().await;

        let entry = last_seen(&seen);
        assert!(entry.data.is_none());
        assert_eq!(entry.error.as_ref().and_then(|e| e.status()), Some(500));
        assert!(entry.is_failed());
        // One attempt plus the default retries, all failing with 500.
        assert_eq!(fetcher.calls(), 1 + crate::cache::entry::DEFAULT_MAX_RETRIES as usize);
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_failure_keeps_previous_station_list() {
        let stations = vec![station("01427510", "Upper Delaware River")];
        let fetcher = ScriptedFetcher::new(vec![
            Ok(stations.clone()),
            Err(FetchError::network("connection reset")),
        ]);
        let cache = cache_for(&fetcher);
        let key = ResourceKey::Stations;
        let (seen, listener) = recorder();

        let _sub = cache.subscribe(key.clone(), no_retry(), listener);
        cache.revalidate(&key).finished().await;
        assert_eq!(last_seen(&seen).data, Some(stations.clone()));

        cache.invalidate(&key).finished().await;

        let entry = last_seen(&seen);
        assert_eq!(entry.data, Some(stations));
        assert_eq!(entry.error, Some(FetchError::network("connection reset")));
        assert!(entry.is_stale_with_error());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fallback_adopted_when_nothing_fetched() {
        let fetcher = ScriptedFetcher::new(vec![Err(FetchError::network("dns failure"))]);
        let cache = cache_for(&fetcher);
        let key = ResourceKey::Alerts;
        let (seen, listener) = recorder();

        let _sub = cache.subscribe(key.clone(), no_retry().with_fallback(vec![9u32]), listener);
        cache.revalidate(&key).finished().await;

        let entry = last_seen(&seen);
        assert_eq!(entry.data, Some(vec![9]));
        assert_eq!(entry.error, Some(FetchError::network("dns failure")));
        assert!(entry.last_fetched_at.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_latest_subscriber_config_governs_fallback() {
        let fetcher = ScriptedFetcher::with_delay(
            vec![Err(FetchError::network("down"))],
            Duration::from_secs(1),
        );
        let cache = cache_for(&fetcher);
        let key = ResourceKey::Alerts;

        let (_, listener) = recorder();
        let _first = cache.subscribe(key.clone(), no_retry().with_fallback(vec![1u32]), listener);
        let (_, listener) = recorder();
        let _second = cache.subscribe(key.clone(), no_retry().with_fallback(vec![2u32]), listener);

        cache.revalidate(&key).finished().await;
        assert_eq!(cache.get(&key).data, Some(vec![2]));
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_are_retried() {
        let fetcher = ScriptedFetcher::new(vec![
            Err(FetchError::network("timeout")),
            Err(FetchError::Http {
                status: 503,
                info: "busy".to_string(),
            }),
            Ok(vec![5u32]),
        ]);
        let cache = cache_for(&fetcher);
        let key = ResourceKey::station("01438500");

        cache.revalidate(&key).finished().await;

        let entry = cache.get(&key);
        assert_eq!(entry.data, Some(vec![5]));
        assert!(entry.error.is_none());
        assert_eq!(fetcher.calls(), 3);
        assert_eq!(fetcher.max_active(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_errors_are_not_retried() {
        let not_found = FetchError::Http {
            status: 404,
            info: "Station not found".to_string(),
        };
        let fetcher: Arc<ScriptedFetcher<Vec<u32>>> = ScriptedFetcher::new(vec![Err(not_found)]);
        let cache = cache_for(&fetcher);
        let key = ResourceKey::station("00000000");

        cache.revalidate(&key).finished().await;
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(cache.get(&key).error.and_then(|e| e.status()), Some(404));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_interval_polls_while_subscribed() {
        let fetcher = ScriptedFetcher::new(vec![Ok(vec![1u32]), Ok(vec![2]), Ok(vec![3])]);
        let cache = cache_for(&fetcher);
        let key = ResourceKey::Stations;
        let config = FetchConfig::default().with_refresh_interval(Duration::from_secs(60));

        let (seen, listener) = recorder();
        let _sub = cache.subscribe(key.clone(), config, listener);
        cache.revalidate(&key).finished().await;
        assert_eq!(cache.state(&key), SchedulerState::Scheduled);

        tokio::time::sleep(Duration::from_secs(61)).await;
        settle().await;
        assert_eq!(fetcher.calls(), 2);

        tokio::time::sleep(Duration::from_secs(60)).await;
        settle().await;
        assert_eq!(fetcher.calls(), 3);
        assert_eq!(last_seen(&seen).data, Some(vec![3]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_unsubscribe_cancels_timer_and_resubscribe_reuses_entry() {
        let fetcher = ScriptedFetcher::new(vec![Ok(vec![1u32])]);
        let cache = cache_for(&fetcher);
        let key = ResourceKey::FishingReports;
        let config = FetchConfig::default()
            .with_refresh_interval(Duration::from_secs(10 * 60))
            .with_dedupe_window(Duration::from_secs(5 * 60));

        let (_, listener) = recorder();
        let first = cache.subscribe(key.clone(), config.clone(), listener);
        let (_, listener) = recorder();
        let second = cache.subscribe(key.clone(), config.clone(), listener);
        cache.revalidate(&key).finished().await;
        assert_eq!(cache.state(&key), SchedulerState::Scheduled);

        first.unsubscribe();
        assert_eq!(cache.state(&key), SchedulerState::Scheduled);
        drop(second);
        assert_eq!(cache.state(&key), SchedulerState::Idle);
        assert!(cache.subscribed_keys().is_empty());

        tokio::time::sleep(Duration::from_secs(2 * 60)).await;
        settle().await;
        assert_eq!(fetcher.calls(), 1);

        let (seen, listener) = recorder();
        let _again = cache.subscribe(key.clone(), config, listener);
        assert_eq!(seen.lock().unwrap()[0].data, Some(vec![1]));
        settle().await;
        assert_eq!(fetcher.calls(), 1);

        // Timer re-armed for what is left of the interval.
        assert_eq!(cache.state(&key), SchedulerState::Scheduled);
        let due = cache.due_in(&key).unwrap();
        assert!(due <= Duration::from_secs(8 * 60) && due > Duration::from_secs(7 * 60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_while_timer_pending_reschedules() {
        let fetcher = ScriptedFetcher::new(vec![Ok(vec![1u32]), Ok(vec![2]), Ok(vec![3])]);
        let cache = cache_for(&fetcher);
        let key = ResourceKey::Stations;
        let interval = Duration::from_secs(30 * 60);

        let (_, listener) = recorder();
        let _sub = cache.subscribe(
            key.clone(),
            FetchConfig::default().with_refresh_interval(interval),
            listener,
        );
        cache.revalidate(&key).finished().await;
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(cache.state(&key), SchedulerState::Scheduled);

        tokio::time::sleep(Duration::from_secs(20 * 60)).await;
        let forced = cache.invalidate(&key);
        assert!(forced.started());
        assert_eq!(cache.state(&key), SchedulerState::Fetching);
        forced.finished().await;

        assert_eq!(fetcher.calls(), 2);
        assert_eq!(cache.state(&key), SchedulerState::Scheduled);
        assert!(cache.due_in(&key).unwrap() > Duration::from_secs(29 * 60));

        // The first timer (due at 30 min) must not fire.
        tokio::time::sleep(Duration::from_secs(15 * 60)).await;
        settle().await;
        assert_eq!(fetcher.calls(), 2);

        // The rescheduled one (due at 50 min) does.
        tokio::time::sleep(Duration::from_secs(20 * 60)).await;
        settle().await;
        assert_eq!(fetcher.calls(), 3);
        assert_eq!(fetcher.max_active(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_orphaned_fetch_is_still_applied() {
        let fetcher = ScriptedFetcher::with_delay(vec![Ok(vec![4u32])], Duration::from_secs(1));
        let cache = cache_for(&fetcher);
        let key = ResourceKey::Alerts;

        let (_, listener) = recorder();
        let sub = cache.subscribe(
            key.clone(),
            FetchConfig::default().with_refresh_interval(Duration::from_secs(60)),
            listener,
        );
        drop(sub);

        tokio::time::sleep(Duration::from_secs(2)).await;
        settle().await;

        assert_eq!(cache.get(&key).data, Some(vec![4]));
        assert_eq!(cache.state(&key), SchedulerState::Idle);

        tokio::time::sleep(Duration::from_secs(120)).await;
        settle().await;
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_seeded_entry_is_served_then_revalidated() {
        let fetcher = ScriptedFetcher::new(vec![Ok(vec![2u32])]);
        let cache = cache_for(&fetcher);
        let key = ResourceKey::Stations;
        let yesterday = Utc::now() - chrono::Duration::days(1);

        cache.seed(&key, vec![1], yesterday);
        let (seen, listener) = recorder();
        let _sub = cache.subscribe(key.clone(), FetchConfig::default(), listener);

        {
            let seen = seen.lock().unwrap();
            assert_eq!(seen[0].data, Some(vec![1]));
            assert_eq!(seen[0].last_fetched_at, Some(yesterday));
            assert!(seen[0].is_validating);
        }

        cache.revalidate(&key).finished().await;
        assert_eq!(last_seen(&seen).data, Some(vec![2]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_mutate_notifies_subscribers() {
        let fetcher = ScriptedFetcher::new(vec![Ok(vec![1u32])]);
        let cache = cache_for(&fetcher);
        let key = ResourceKey::Alerts;
        let (seen, listener) = recorder();

        let _sub = cache.subscribe(key.clone(), FetchConfig::default(), listener);
        cache.revalidate(&key).finished().await;

        cache.mutate(&key, |entry| {
            if let Some(ref mut data) = entry.data {
                data.push(2);
            }
        });
        assert_eq!(last_seen(&seen).data, Some(vec![1, 2]));
    }
}
