//! Google Geocoding API client

use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use super::{GeocodeLookup, Geocoder, normalize};
use crate::config::GeocodingConfig;
use crate::{AwayError, Result};

/// Geocoder backed by the Google Geocoding API
pub struct GoogleGeocoder {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    formatted_address: String,
    geometry: Geometry,
    place_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

impl GoogleGeocoder {
    pub fn new(config: &GeocodingConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| AwayError::config("Missing geocoding API key"))?;

        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("away/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AwayError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.clone(),
        })
    }

    fn request_url(&self, name: &str) -> String {
        format!(
            "{}?address={}&key={}",
            self.base_url,
            urlencoding::encode(name),
            urlencoding::encode(&self.api_key)
        )
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    #[instrument(name = "geocode", skip(self))]
    async fn geocode(&self, name: &str) -> Result<GeocodeLookup> {
        let start_time = Instant::now();

        let response = self
            .client
            .get(self.request_url(name))
            .send()
            .await
            .map_err(|e| AwayError::geocoding_unavailable(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AwayError::geocoding_unavailable(format!(
                "provider returned HTTP {status}"
            )));
        }

        let body: GeocodeResponse = response
            .json()
            .await
            .map_err(|e| AwayError::geocoding_unavailable(e.without_url().to_string()))?;

        let lookup = lookup_from_response(name, body);
        match &lookup {
            GeocodeLookup::Found(location) => info!(
                "Geocoded '{}' to '{}' in {:.3}s",
                name,
                location.address,
                start_time.elapsed().as_secs_f64()
            ),
            GeocodeLookup::NoMatch { status } => {
                debug!("No geocoding match for '{}': {}", name, status);
            }
        }
        Ok(lookup)
    }
}

fn lookup_from_response(name: &str, response: GeocodeResponse) -> GeocodeLookup {
    if let Some(message) = &response.error_message {
        warn!(status = %response.status, "Geocoding provider message: {}", message);
    }

    if response.status != "OK" {
        return GeocodeLookup::NoMatch {
            status: response.status,
        };
    }

    match response.results.into_iter().next() {
        Some(place) => GeocodeLookup::Found(normalize(
            name,
            &place.formatted_address,
            place.geometry.location.lat,
            place.geometry.location.lng,
            place.place_id,
        )),
        None => GeocodeLookup::NoMatch {
            status: "ZERO_RESULTS".to_string(),
        },
    }
}
