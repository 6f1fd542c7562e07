//! Google Geocoding API client
//!
//! `GET {base}/maps/api/geocode/json?address=…&key=…`. The API reports
//! failures in a `status` field of a 200 response; `ZERO_RESULTS` is mapped to
//! an empty result list, every other non-`OK` status to
//! [`GeocodingError::Provider`].

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::{GeoPoint, Geocoder, GeocodingError, http_client, http_error, parse_base_url};

pub const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com";

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: Location,
}

#[derive(Debug, Deserialize)]
struct Location {
    lat: f64,
    lng: f64,
}

/// Google Geocoding API client
#[derive(Debug, Clone)]
pub struct GoogleGeocoder {
    client: reqwest::Client,
    endpoint: Url,
    api_key: String,
}

impl GoogleGeocoder {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self, GeocodingError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL, timeout)
    }

    /// Create a client against an alternative host (proxies, mock servers)
    pub fn with_base_url(
        api_key: String,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, GeocodingError> {
        let endpoint = parse_base_url(base_url)?
            .join("maps/api/geocode/json")
            .map_err(|err| GeocodingError::Config(err.to_string()))?;
        Ok(Self {
            client: http_client(timeout)?,
            endpoint,
            api_key,
        })
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    async fn geocode(&self, query: &str) -> Result<Vec<GeoPoint>, GeocodingError> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[("address", query), ("key", self.api_key.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(http_error(response).await);
        }

        let payload: GeocodeResponse = response
            .json()
            .await
            .map_err(|err| GeocodingError::Malformed(err.to_string()))?;

        match payload.status.as_str() {
            "OK" => {
                debug!(query, results = payload.results.len(), "google geocode ok");
                Ok(payload
                    .results
                    .into_iter()
                    .map(|r| GeoPoint {
                        latitude: r.geometry.location.lat,
                        longitude: r.geometry.location.lng,
                    })
                    .collect())
            }
            "ZERO_RESULTS" => Ok(Vec::new()),
            _ => Err(GeocodingError::Provider {
                status: payload.status,
                message: payload.error_message.unwrap_or_default(),
            }),
        }
    }
}
