//! Geocoding clients
//!
//! Resolves a free-text address into coordinates. The importer only sees the
//! [`Geocoder`] trait; concrete HTTP clients live in the provider modules and
//! are selected from configuration by [`from_config`].

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::config::{AppConfig, GeocoderProvider};

pub mod google;
pub mod nominatim;

pub use google::GoogleGeocoder;
pub use nominatim::NominatimGeocoder;

/// A resolved coordinate pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Geocoding failures
#[derive(Debug, Error)]
pub enum GeocodingError {
    #[error("no results for '{query}'")]
    NoResults { query: String },

    #[error("geocoder returned HTTP {status}")]
    Http { status: u16, body: Option<String> },

    #[error("geocoder rejected the request ({status}): {message}")]
    Provider { status: String, message: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("malformed geocoder response: {0}")]
    Malformed(String),

    #[error("invalid geocoder configuration: {0}")]
    Config(String),
}

/// Address → coordinates lookup.
///
/// Implementations return every candidate the provider offers, best match
/// first. An empty vector means the provider found nothing; callers decide
/// whether that is an error.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, query: &str) -> Result<Vec<GeoPoint>, GeocodingError>;
}

/// Builds the geocoder selected by `geocoder_provider`.
pub fn from_config(config: &AppConfig) -> Result<Arc<dyn Geocoder>, GeocodingError> {
    let timeout = Duration::from_millis(config.geocoder_timeout_ms);
    match config.geocoder_provider {
        GeocoderProvider::Google => {
            let api_key = config.geocoder_api_key.clone().ok_or_else(|| {
                GeocodingError::Config(
                    "Google geocoding requires LISTINGS_GEOCODER_API_KEY".to_string(),
                )
            })?;
            let base_url = config
                .geocoder_base_url
                .as_deref()
                .unwrap_or(google::DEFAULT_BASE_URL);
            Ok(Arc::new(GoogleGeocoder::with_base_url(
                api_key, base_url, timeout,
            )?))
        }
        GeocoderProvider::Nominatim => {
            let base_url = config
                .geocoder_base_url
                .as_deref()
                .unwrap_or(nominatim::DEFAULT_BASE_URL);
            Ok(Arc::new(NominatimGeocoder::with_base_url(base_url, timeout)?))
        }
    }
}

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, GeocodingError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("listings/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(GeocodingError::Network)
}

/// Parses a base URL so that relative joins append to its path.
pub(crate) fn parse_base_url(base_url: &str) -> Result<Url, GeocodingError> {
    let normalized = if base_url.ends_with('/') {
        base_url.to_string()
    } else {
        format!("{}/", base_url)
    };
    Url::parse(&normalized)
        .map_err(|err| GeocodingError::Config(format!("invalid base url '{}': {}", base_url, err)))
}

/// Reads an error response into a `GeocodingError::Http`, keeping at most 200
/// characters of the body.
pub(crate) async fn http_error(response: reqwest::Response) -> GeocodingError {
    let status = response.status().as_u16();
    let body = response.text().await.ok().map(|b| {
        if b.chars().count() > 200 {
            let truncated: String = b.chars().take(200).collect();
            format!("{}...", truncated)
        } else {
            b
        }
    });
    GeocodingError::Http { status, body }
}
