//! Removal of repeated or noisy geocoded records

use std::collections::HashSet;

use tracing::debug;

use crate::models::GeocodedLocation;

/// Drop records with `#`/`|` in their name and repeats of the same
/// case-insensitive `(name, address)` pair, keeping first occurrences.
#[must_use]
pub fn dedupe_locations(locations: Vec<GeocodedLocation>) -> Vec<GeocodedLocation> {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut filtered = Vec::with_capacity(locations.len());

    for location in locations {
        if location.has_invalid_name() {
            debug!(name = %location.name, "Skipping location with invalid characters");
            continue;
        }
        if !seen.insert(location.dedup_key()) {
            debug!(
                name = %location.name,
                address = %location.address,
                "Skipping duplicate location"
            );
            continue;
        }
        filtered.push(location);
    }

    filtered
}
