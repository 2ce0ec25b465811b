//! HTTP access to the river dashboard API.
//!
//! `ApiClient` performs one GET per resource key against the dashboard's
//! JSON endpoints. Every failure is normalized into a `FetchError` at this
//! boundary; nothing above it ever sees a raw `reqwest::Error`.
//!
//! The cache layer only depends on the `Fetcher` trait, so any endpoint can
//! be swapped for another implementation.

pub mod client;
pub mod error;
pub mod fetcher;

pub use client::ApiClient;
pub use error::FetchError;
pub use fetcher::Fetcher;
