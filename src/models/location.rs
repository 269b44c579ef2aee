//! Geocoded place record

use serde::{Deserialize, Serialize};

/// A place name resolved to an address and coordinates
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GeocodedLocation {
    /// The query string that produced this record
    pub name: String,
    /// Provider's formatted address
    pub address: String,
    /// Second-to-last address component, postal code stripped
    pub city: String,
    /// Last address component
    pub country: String,
    /// Latitude in decimal degrees
    pub lat: f64,
    /// Longitude in decimal degrees
    pub lng: f64,
    /// Provider place identifier, when one was returned
    pub place_id: Option<String>,
}

impl GeocodedLocation {
    /// Key used to detect the same place mentioned twice
    #[must_use]
    pub fn dedup_key(&self) -> (String, String) {
        (self.name.to_lowercase(), self.address.to_lowercase())
    }

    /// Whether the name carries hashtag or separator noise
    #[must_use]
    pub fn has_invalid_name(&self) -> bool {
        self.name.contains(['#', '|'])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(name: &str, address: &str) -> GeocodedLocation {
        GeocodedLocation {
            name: name.to_string(),
            address: address.to_string(),
            city: String::new(),
            country: String::new(),
            lat: 48.8566,
            lng: 2.3522,
            place_id: None,
        }
    }

    #[test]
    fn test_dedup_key_is_case_insensitive() {
        let a = location("Paris", "Paris, France");
        let b = location("PARIS", "paris, france");
        assert_eq!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn test_invalid_name() {
        assert!(location("#travel", "x").has_invalid_name());
        assert!(location("Rome | Italy", "x").has_invalid_name());
        assert!(!location("Rome", "x").has_invalid_name());
    }

    #[test]
    fn test_serializes_null_place_id() {
        let json = serde_json::to_value(location("Paris", "Paris, France")).unwrap();
        assert!(json["place_id"].is_null());
        assert_eq!(json["name"], "Paris");
    }
}
