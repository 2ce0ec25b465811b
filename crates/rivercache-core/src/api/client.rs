//! API client for the river dashboard JSON endpoints.
//!
//! Each resource key maps to one GET request. The client owns the request
//! timeout; retries and fallbacks belong to the cache layer.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures::future::BoxFuture;
use reqwest::{header, Client};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{FetchError, Fetcher};
use crate::cache::{Coordinates, ResourceKey};
use crate::models::{Alert, FishingReport, Resource, Station, StationReadings, WeatherReport};

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds when none is configured.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Identifies the dashboard to upstream services.
const USER_AGENT: &str = concat!("rivercache/", env!("CARGO_PKG_VERSION"));

/// API client for the dashboard endpoints.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Arc<str>,
}

impl ApiClient {
    /// Create a client for `base_url` (e.g. `http://localhost:3000`).
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: Arc::from(base_url.trim_end_matches('/')),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL for a resource key.
    pub fn url_for(&self, key: &ResourceKey) -> String {
        format!("{}{}", self.base_url, key.path())
    }

    async fn get<T: DeserializeOwned>(&self, key: &ResourceKey) -> Result<T, FetchError> {
        let url = self.url_for(key);
        debug!(url = %url, "GET");

        let response = self
            .client
            .get(&url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::from_status(status, &body));
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body)
            .map_err(|e| FetchError::parse(format!("{} from {}", e, url)))
    }

    pub async fn fetch_stations(&self) -> Result<Vec<Station>, FetchError> {
        self.get(&ResourceKey::Stations).await
    }

    pub async fn fetch_station(&self, station_id: &str) -> Result<StationReadings, FetchError> {
        self.get(&ResourceKey::station(station_id)).await
    }

    pub async fn fetch_weather(
        &self,
        coordinates: Coordinates,
    ) -> Result<WeatherReport, FetchError> {
        self.get(&ResourceKey::Weather(coordinates)).await
    }

    pub async fn fetch_alerts(&self) -> Result<Vec<Alert>, FetchError> {
        self.get(&ResourceKey::Alerts).await
    }

    pub async fn fetch_fishing_reports(&self) -> Result<Vec<FishingReport>, FetchError> {
        self.get(&ResourceKey::FishingReports).await
    }
}

impl Fetcher<Resource> for ApiClient {
    fn fetch<'a>(&'a self, key: &'a ResourceKey) -> BoxFuture<'a, Result<Resource, FetchError>> {
        Box::pin(async move {
            match key {
                ResourceKey::Stations => self.fetch_stations().await.map(Resource::Stations),
                ResourceKey::Station(id) => self.fetch_station(id).await.map(Resource::Station),
                ResourceKey::Weather(coordinates) => {
                    self.fetch_weather(*coordinates).await.map(Resource::Weather)
                }
                ResourceKey::Alerts => self.fetch_alerts().await.map(Resource::Alerts),
                ResourceKey::FishingReports => {
                    self.fetch_fishing_reports().await.map(Resource::FishingReports)
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response on a local port and return its base URL.
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 2048];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        });
        format!("http://{}", addr)
    }

    fn client(base_url: &str) -> ApiClient {
        ApiClient::new(base_url, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_url_for_keys() {
        let api = client("http://localhost:3000/");
        assert_eq!(api.url_for(&ResourceKey::Stations), "http://localhost:3000/api/stations");
        assert_eq!(
            api.url_for(&ResourceKey::station("01437500")),
            "http://localhost:3000/api/station/01437500"
        );
        assert_eq!(
            api.url_for(&ResourceKey::Weather(Coordinates::new(41.6, -75.0))),
            "http://localhost:3000/api/weather/41.6/-75"
        );
        assert_eq!(
            api.url_for(&ResourceKey::FishingReports),
            "http://localhost:3000/api/fishing-reports"
        );
    }

    #[tokio::test]
    async fn test_fetch_stations_success() {
        let base = serve_once(
            "200 OK",
            r#"[{"id":"01437500","name":"Neversink River at Godeffroy, NY","lat":41.44056,"lng":-74.60056,"river":"Neversink River"}]"#,
        )
        .await;

        let resource = client(&base).fetch(&ResourceKey::Stations).await.unwrap();
        let stations = resource.as_stations().unwrap();
        assert_eq!(stations.len(), 1);
        assert_eq!(stations[0].river, "Neversink River");
    }

    #[tokio::test]
    async fn test_fetch_http_error_carries_status_and_info() {
        let base = serve_once(
            "500 Internal Server Error",
            r#"{"error":"Failed to fetch station data"}"#,
        )
        .await;

        let err = client(&base).fetch_stations().await.unwrap_err();
        assert_eq!(
            err,
            FetchError::Http {
                status: 500,
                info: "Failed to fetch station data".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_fetch_malformed_body_is_parse_error() {
        let base = serve_once("200 OK", r#"{"not":"a list"}"#).await;

        let err = client(&base).fetch_alerts().await.unwrap_err();
        assert!(matches!(err, FetchError::Parse { .. }), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_fetch_connection_refused_is_network_error() {
        // Bind then drop to obtain a port nothing listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client(&format!("http://{}", addr))
            .fetch_fishing_reports()
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Network { .. }), "got {:?}", err);
        assert!(err.is_retryable());
    }
}
