use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use super::{CacheEntry, FetchConfig, ResourceKey};

/// Callback invoked with the new entry every time a key changes.
pub type Listener<T> = Arc<dyn Fn(&CacheEntry<T>) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

struct Topic<T> {
    listeners: Vec<(SubscriberId, Listener<T>)>,
    /// Config of the most recently registered subscriber. Kept after the
    /// last listener leaves so an orphaned in-flight fetch still knows its
    /// fallback.
    config: FetchConfig<T>,
}

/// Maps each key to its active listeners and delivers change notifications.
pub struct SubscriptionHub<T> {
    topics: Mutex<HashMap<ResourceKey, Topic<T>>>,
    next_id: AtomicU64,
}

impl<T> Default for SubscriptionHub<T> {
    fn default() -> Self {
        Self {
            topics: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl<T: Clone> SubscriptionHub<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ResourceKey, Topic<T>>> {
        self.topics.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make `config` the governing config for `key` without adding a listener.
    pub fn configure(&self, key: &ResourceKey, config: FetchConfig<T>) {
        match self.lock().entry(key.clone()) {
            Entry::Occupied(mut topic) => topic.get_mut().config = config,
            Entry::Vacant(slot) => {
                slot.insert(Topic {
                    listeners: Vec::new(),
                    config,
                });
            }
        }
    }

    pub fn register(&self, key: &ResourceKey, listener: Listener<T>) -> SubscriberId {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock()
            .entry(key.clone())
            .or_insert_with(|| Topic {
                listeners: Vec::new(),
                config: FetchConfig::default(),
            })
            .listeners
            .push((id, listener));
        id
    }

    /// Remove a listener. Returns how many remain for `key`.
    pub fn unregister(&self, key: &ResourceKey, id: SubscriberId) -> usize {
        match self.lock().get_mut(key) {
            Some(topic) => {
                topic.listeners.retain(|(existing, _)| *existing != id);
                topic.listeners.len()
            }
            None => 0,
        }
    }

    pub fn subscriber_count(&self, key: &ResourceKey) -> usize {
        self.lock().get(key).map_or(0, |topic| topic.listeners.len())
    }

    pub fn config(&self, key: &ResourceKey) -> FetchConfig<T> {
        self.lock()
            .get(key)
            .map(|topic| topic.config.clone())
            .unwrap_or_default()
    }

    /// Keys with at least one listener.
    pub fn keys(&self) -> Vec<ResourceKey> {
        self.lock()
            .iter()
            .filter(|(_, topic)| !topic.listeners.is_empty())
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Deliver `entry` to every listener of its key.
    ///
    /// Listeners are called outside the lock so they may subscribe,
    /// unsubscribe or read the cache themselves.
    pub fn notify(&self, entry: &CacheEntry<T>) {
        let listeners: Vec<Listener<T>> = match self.lock().get(&entry.key) {
            Some(topic) => topic.listeners.iter().map(|(_, l)| Arc::clone(l)).collect(),
            None => return,
        };
        for listener in listeners {
            listener(entry);
        }
    }

    /// Deliver `entry` to a single listener.
    pub fn deliver(&self, key: &ResourceKey, id: SubscriberId, entry: &CacheEntry<T>) {
        let listener = self.lock().get(key).and_then(|topic| {
            topic
                .listeners
                .iter()
                .find(|(existing, _)| *existing == id)
                .map(|(_, l)| Arc::clone(l))
        });
        if let Some(listener) = listener {
            listener(entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn counting_listener(counter: &Arc<AtomicUsize>) -> Listener<u32> {
        let counter = Arc::clone(counter);
        Arc::new(move |_entry: &CacheEntry<u32>| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_notify_reaches_only_key_listeners() {
        let hub: SubscriptionHub<u32> = SubscriptionHub::new();
        let alerts = Arc::new(AtomicUsize::new(0));
        let stations = Arc::new(AtomicUsize::new(0));

        hub.register(&ResourceKey::Alerts, counting_listener(&alerts));
        hub.register(&ResourceKey::Alerts, counting_listener(&alerts));
        hub.register(&ResourceKey::Stations, counting_listener(&stations));

        hub.notify(&CacheEntry::new(ResourceKey::Alerts));
        assert_eq!(alerts.load(Ordering::SeqCst), 2);
        assert_eq!(stations.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unregister_counts_remaining() {
        let hub: SubscriptionHub<u32> = SubscriptionHub::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let key = ResourceKey::station("01431500");

        let first = hub.register(&key, counting_listener(&counter));
        let second = hub.register(&key, counting_listener(&counter));
        assert_eq!(hub.keys(), vec![key.clone()]);

        assert_eq!(hub.unregister(&key, first), 1);
        assert_eq!(hub.unregister(&key, second), 0);
        assert_eq!(hub.subscriber_count(&key), 0);
        assert!(hub.keys().is_empty());

        hub.notify(&CacheEntry::new(key));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_latest_config_governs_and_survives_unsubscribe() {
        let hub: SubscriptionHub<u32> = SubscriptionHub::new();
        let key = ResourceKey::Stations;
        let counter = Arc::new(AtomicUsize::new(0));

        hub.configure(&key, FetchConfig::default().with_refresh_interval(Duration::from_secs(60)));
        hub.configure(&key, FetchConfig::default().with_fallback(4));
        let id = hub.register(&key, counting_listener(&counter));
        hub.unregister(&key, id);

        let config = hub.config(&key);
        assert_eq!(config.refresh_interval, None);
        assert_eq!(config.fallback_data, Some(4));
    }

    #[test]
    fn test_deliver_targets_one_listener() {
        let hub: SubscriptionHub<u32> = SubscriptionHub::new();
        let a = Arc::new(AtomicUsize::new(0));
        let b = Arc::new(AtomicUsize::new(0));
        let key = ResourceKey::Alerts;

        let id = hub.register(&key, counting_listener(&a));
        hub.register(&key, counting_listener(&b));
        hub.deliver(&key, id, &CacheEntry::new(key.clone()));

        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(b.load(Ordering::SeqCst), 0);
    }
}
