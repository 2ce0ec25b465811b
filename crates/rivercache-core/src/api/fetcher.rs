use futures::future::BoxFuture;

use super::FetchError;
use crate::cache::ResourceKey;

/// Performs exactly one network call for one resource key.
///
/// Implementations never mutate the cache; they hand the outcome back to the
/// caller. Returning a boxed future keeps the trait object-safe so the cache
/// can hold an `Arc<dyn Fetcher<T>>`.
pub trait Fetcher<T>: Send + Sync {
    fn fetch<'a>(&'a self, key: &'a ResourceKey) -> BoxFuture<'a, Result<T, FetchError>>;
}
