//! Best-effort reverse geocoding.
//!
//! Lookups are fire-and-forget: a failure keeps the previous place name and
//! never blocks or fails the session. The session rate-limits calls; this
//! module only knows how to turn a coordinate into a display name.

use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use log::debug;
use reqwest::Client;

use crate::error::EngineError;

/// Seam for place-name resolution so tests can stub the network.
pub trait PlaceNameProvider: Send + Sync + 'static {
    /// Resolve a coordinate to a display name. `None` on any failure.
    fn resolve(&self, lat: f64, lon: f64) -> BoxFuture<'static, Option<String>>;
}

/// Nominatim-style reverse geocoder over HTTP.
#[derive(Debug, Clone)]
pub struct ReverseGeocoder {
    client: Client,
    endpoint: String,
}

impl ReverseGeocoder {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, EngineError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .user_agent(concat!("journeyrs/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| EngineError::Geocode(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    async fn reverse(&self, lat: f64, lon: f64) -> Result<String, EngineError> {
        let url = format!("{}/reverse", self.endpoint.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .query(&[
                ("format", "jsonv2"),
                ("lat", &lat.to_string()),
                ("lon", &lon.to_string()),
            ])
            .send()
            .await
            .map_err(|e| EngineError::Geocode(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EngineError::Geocode(format!(
                "status {}",
                response.status()
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| EngineError::Geocode(e.to_string()))?;

        body.get("display_name")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| EngineError::Geocode("missing display_name".into()))
    }
}

impl PlaceNameProvider for ReverseGeocoder {
    fn resolve(&self, lat: f64, lon: f64) -> BoxFuture<'static, Option<String>> {
        let geocoder = self.clone();
        async move {
            match geocoder.reverse(lat, lon).await {
                Ok(name) => Some(name),
                Err(e) => {
                    debug!("[ReverseGeocoder] lookup failed: {}", e);
                    None
                }
            }
        }
        .boxed()
    }
}
