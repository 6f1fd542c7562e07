//! Nominatim (OpenStreetMap) search client
//!
//! `GET {base}/search?q=…&format=jsonv2&limit=1`. Coordinates come back as
//! strings and are parsed here.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use super::{GeoPoint, Geocoder, GeocodingError, http_client, http_error, parse_base_url};

pub const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org";

#[derive(Debug, Deserialize)]
struct SearchResult {
    lat: String,
    lon: String,
}

/// Nominatim search client
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    client: reqwest::Client,
    endpoint: Url,
}

impl NominatimGeocoder {
    pub fn new(timeout: Duration) -> Result<Self, GeocodingError> {
        Self::with_base_url(DEFAULT_BASE_URL, timeout)
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, GeocodingError> {
        let endpoint = parse_base_url(base_url)?
            .join("search")
            .map_err(|err| GeocodingError::Config(err.to_string()))?;
        Ok(Self {
            client: http_client(timeout)?,
            endpoint,
        })
    }
}

fn parse_coordinate(field: &str, value: &str) -> Result<f64, GeocodingError> {
    value
        .parse::<f64>()
        .map_err(|_| GeocodingError::Malformed(format!("{} is not a number: {}", field, value)))
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, query: &str) -> Result<Vec<GeoPoint>, GeocodingError> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[("q", query), ("format", "jsonv2"), ("limit", "1")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(http_error(response).await);
        }

        let results: Vec<SearchResult> = response
            .json()
            .await
            .map_err(|err| GeocodingError::Malformed(err.to_string()))?;

        results
            .into_iter()
            .map(|r| {
                Ok(GeoPoint {
                    latitude: parse_coordinate("lat", &r.lat)?,
                    longitude: parse_coordinate("lon", &r.lon)?,
                })
            })
            .collect()
    }
}
