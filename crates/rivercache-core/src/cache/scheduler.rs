use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use super::ResourceKey;

/// Revalidation state of one key: `Idle -> Scheduled -> Fetching -> Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Scheduled,
    Fetching,
}

struct Timer {
    handle: JoinHandle<()>,
    due: Instant,
}

/// One cancellable background timer per key.
///
/// Timers only trigger work; the triggered fetch runs in its own task and
/// re-arms the timer when it completes.
#[derive(Default)]
pub struct RevalidationScheduler {
    timers: Mutex<HashMap<ResourceKey, Timer>>,
}

impl RevalidationScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ResourceKey, Timer>> {
        self.timers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run `trigger` after `delay`, replacing any pending timer for `key`.
    pub fn schedule<F>(&self, key: &ResourceKey, delay: Duration, trigger: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            trigger();
        });
        let timer = Timer {
            handle,
            due: Instant::now() + delay,
        };

        if let Some(previous) = self.lock().insert(key.clone(), timer) {
            previous.handle.abort();
        }
        debug!(key = %key, delay_secs = delay.as_secs(), "Revalidation scheduled");
    }

    /// Cancel the pending timer for `key`. Returns true if one was pending.
    pub fn cancel(&self, key: &ResourceKey) -> bool {
        match self.lock().remove(key) {
            Some(timer) => {
                let pending = !timer.handle.is_finished();
                timer.handle.abort();
                if pending {
                    debug!(key = %key, "Revalidation timer cancelled");
                }
                pending
            }
            None => false,
        }
    }

    pub fn cancel_all(&self) {
        for (_, timer) in self.lock().drain() {
            timer.handle.abort();
        }
    }

    pub fn is_scheduled(&self, key: &ResourceKey) -> bool {
        self.lock()
            .get(key)
            .is_some_and(|timer| !timer.handle.is_finished())
    }

    /// Time left until the pending timer fires.
    pub fn due_in(&self, key: &ResourceKey) -> Option<Duration> {
        self.lock()
            .get(key)
            .filter(|timer| !timer.handle.is_finished())
            .map(|timer| timer.due.saturating_duration_since(Instant::now()))
    }
}

impl Drop for RevalidationScheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
