//! Reverse geocoding.
//!
//! Google's geocoding API is tried first when a key is configured; the free
//! Nominatim reverse endpoint is the fallback. Only the city, state and a
//! display address are kept.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use crate::config::GeocodingConfig;

const GOOGLE_GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// Nominatim's usage policy requires an identifying agent.
const USER_AGENT: &str = "AhmedMart/1.0";

/// Errors from geocoding providers.
#[derive(Debug, Error)]
pub enum GeocodingError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider returned a non-OK status.
    #[error("geocoding provider error: {0}")]
    Provider(String),

    /// Provider had nothing for these coordinates.
    #[error("no geocoding results")]
    NoResults,
}

/// A reverse-geocoded place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeocodedPlace {
    pub city: String,
    pub state: String,
    pub full_address: String,
}

impl GeocodedPlace {
    /// Placeholder when every provider failed: names empty, coordinates as
    /// the display address.
    #[must_use]
    pub fn coordinates_only(lat: f64, lng: f64) -> Self {
        Self {
            city: String::new(),
            state: String::new(),
            full_address: format!("{lat:.5}, {lng:.5}"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GoogleResponse {
    status: String,
    #[serde(default)]
    results: Vec<GoogleResult>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleResult {
    formatted_address: String,
    #[serde(default)]
    address_components: Vec<GoogleComponent>,
}

#[derive(Debug, Deserialize)]
struct GoogleComponent {
    long_name: String,
    #[serde(default)]
    types: Vec<String>,
}

impl GoogleResult {
    fn component(&self, kind: &str) -> Option<&str> {
        self.address_components
            .iter()
            .find(|c| c.types.iter().any(|t| t == kind))
            .map(|c| c.long_name.as_str())
    }

    fn into_place(self) -> GeocodedPlace {
        let city = ["locality", "administrative_area_level_2", "sublocality"]
            .iter()
            .find_map(|kind| self.component(kind))
            .unwrap_or_default()
            .to_string();
        let state = self
            .component("administrative_area_level_1")
            .unwrap_or_default()
            .to_string();

        GeocodedPlace {
            city,
            state,
            full_address: self.formatted_address,
        }
    }
}

#[derive(Debug, Deserialize)]
struct NominatimResponse {
    display_name: Option<String>,
    #[serde(default)]
    address: NominatimAddress,
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct NominatimAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    suburb: Option<String>,
    county: Option<String>,
    state: Option<String>,
}

impl NominatimResponse {
    fn into_place(self) -> Result<GeocodedPlace, GeocodingError> {
        if let Some(error) = self.error {
            return Err(GeocodingError::Provider(error));
        }
        let full_address = self.display_name.ok_or(GeocodingError::NoResults)?;

        let NominatimAddress {
            city,
            town,
            village,
            suburb,
            county,
            state,
        } = self.address;

        Ok(GeocodedPlace {
            city: city
                .or(town)
                .or(village)
                .or(suburb)
                .or(county)
                .unwrap_or_default(),
            state: state.unwrap_or_default(),
            full_address,
        })
    }
}

/// Reverse geocoder with a primary and a fallback provider.
#[derive(Clone)]
pub struct Geocoder {
    inner: Arc<GeocoderInner>,
}

struct GeocoderInner {
    client: reqwest::Client,
    google_api_key: Option<SecretString>,
    nominatim_url: String,
}

impl Geocoder {
    /// Create a new geocoder.
    ///
    /// Every provider request is bounded by `config.timeout`.
    ///
    /// # Errors
    ///
    /// Returns `GeocodingError::Http` if the HTTP client cannot be built.
    pub fn new(config: &GeocodingConfig) -> Result<Self, GeocodingError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(GeocoderInner {
                client,
                google_api_key: config.google_api_key.clone(),
                nominatim_url: config.nominatim_url.trim_end_matches('/').to_string(),
            }),
        })
    }

    /// Resolve coordinates to a place.
    ///
    /// # Errors
    ///
    /// Returns the fallback provider's error when both providers fail.
    #[instrument(skip(self))]
    pub async fn reverse(&self, lat: f64, lng: f64) -> Result<GeocodedPlace, GeocodingError> {
        if let Some(key) = &self.inner.google_api_key {
            match self.reverse_google(key, lat, lng).await {
                Ok(place) => return Ok(place),
                Err(e) => tracing::warn!(error = %e, "Primary geocoder failed, falling back"),
            }
        }

        self.reverse_nominatim(lat, lng).await
    }

    async fn reverse_google(
        &self,
        key: &SecretString,
        lat: f64,
        lng: f64,
    ) -> Result<GeocodedPlace, GeocodingError> {
        let latlng = format!("{lat},{lng}");
        let response: GoogleResponse = self
            .inner
            .client
            .get(GOOGLE_GEOCODE_URL)
            .query(&[("latlng", latlng.as_str()), ("key", key.expose_secret())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match response.status.as_str() {
            "OK" => response
                .results
                .into_iter()
                .next()
                .map(GoogleResult::into_place)
                .ok_or(GeocodingError::NoResults),
            "ZERO_RESULTS" => Err(GeocodingError::NoResults),
            other => Err(GeocodingError::Provider(
                response
                    .error_message
                    .unwrap_or_else(|| other.to_string()),
            )),
        }
    }

    async fn reverse_nominatim(&self, lat: f64, lng: f64) -> Result<GeocodedPlace, GeocodingError> {
        let response: NominatimResponse = self
            .inner
            .client
            .get(format!("{}/reverse", self.inner.nominatim_url))
            .query(&[
                ("format", "json".to_string()),
                ("lat", lat.to_string()),
                ("lon", lng.to_string()),
            ])
            .header("User-Agent", USER_AGENT)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response.into_place()
    }
}
