//! Geocoding of place names
//!
//! [`Geocoder`] is the narrow seam to the external provider. Whatever the
//! provider, results are normalized the same way: the formatted address is
//! split on commas, the last part becomes the country and the part before
//! it the city, minus any leading postal code.

pub mod google;

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use crate::Result;
use crate::models::GeocodedLocation;

pub use google::GoogleGeocoder;

static POSTAL_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\s*").expect("postal prefix pattern is valid"));

/// Outcome of one geocoding request that reached the provider
#[derive(Debug, Clone, PartialEq)]
pub enum GeocodeLookup {
    Found(GeocodedLocation),
    /// Provider answered with a non-OK status or no results
    NoMatch { status: String },
}

impl GeocodeLookup {
    /// The record, if there was one
    #[must_use]
    pub fn into_location(self) -> Option<GeocodedLocation> {
        match self {
            GeocodeLookup::Found(location) => Some(location),
            GeocodeLookup::NoMatch { .. } => None,
        }
    }
}

/// Resolves a place name through an external provider.
///
/// Transport failures are errors; "nothing found" is a [`GeocodeLookup::NoMatch`].
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, name: &str) -> Result<GeocodeLookup>;
}

/// Split a formatted address into `(city, country)`.
#[must_use]
pub fn split_address(formatted_address: &str) -> (String, String) {
    let parts: Vec<&str> = formatted_address.split(',').map(str::trim).collect();
    let country = parts.last().copied().unwrap_or_default();
    let city_raw = if parts.len() >= 2 {
        parts[parts.len() - 2]
    } else {
        ""
    };
    let city = POSTAL_PREFIX_RE.replace(city_raw, "");
    (city.into_owned(), country.to_string())
}

/// Build a record from a provider result; `name` keeps the original query.
#[must_use]
pub fn normalize(
    query: &str,
    formatted_address: &str,
    lat: f64,
    lng: f64,
    place_id: Option<String>,
) -> GeocodedLocation {
    let (city, country) = split_address(formatted_address);
    GeocodedLocation {
        name: query.to_string(),
        address: formatted_address.to_string(),
        city,
        country,
        lat,
        lng,
        place_id,
    }
}
