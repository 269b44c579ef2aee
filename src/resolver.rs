//! Location Resolution Module
//!
//! This module turns user input (an Instagram post URL or a free-form
//! address) into geocoded locations by chaining the caption fetcher, the
//! NER service, the entity grouper, the geocoder and the deduplicator.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::caption::CaptionFetcher;
use crate::dedup::dedupe_locations;
use crate::geocoding::{GeocodeLookup, Geocoder};
use crate::grouper::extract_place_candidates;
use crate::models::GeocodedLocation;
use crate::ner::EntityExtractor;
use crate::{AwayError, Result};

/// Caption of a post and the places mentioned in it
#[derive(Debug, Clone, Serialize)]
pub struct ParsedPost {
    pub caption: String,
    pub locations: Vec<GeocodedLocation>,
}

/// Service for resolving posts and addresses into locations
pub struct LocationResolver {
    captions: CaptionFetcher,
    entities: Arc<dyn EntityExtractor>,
    geocoder: Arc<dyn Geocoder>,
}

impl LocationResolver {
    pub fn new(
        captions: CaptionFetcher,
        entities: Arc<dyn EntityExtractor>,
        geocoder: Arc<dyn Geocoder>,
    ) -> Self {
        Self {
            captions,
            entities,
            geocoder,
        }
    }

    /// Fetch a post's caption and geocode every place it mentions
    #[instrument(skip(self))]
    pub async fn parse_post(&self, url: &str) -> Result<ParsedPost> {
        let caption = self.captions.fetch_caption(url).await?;
        debug!("Parsed caption: {:?}", caption);

        let spans = self.entities.extract_entities(&caption).await?;
        let names = extract_place_candidates(&caption, spans);
        info!("Extracted {} place candidates", names.len());

        let mut geocoded = Vec::with_capacity(names.len());
        for name in &names {
            if let Some(location) = self.geocoder.geocode(name).await?.into_location() {
                geocoded.push(location);
            }
        }
        debug!("Geocoded {} of {} candidates", geocoded.len(), names.len());

        let locations = dedupe_locations(geocoded);
        info!("Resolved {} unique locations", locations.len());

        Ok(ParsedPost { caption, locations })
    }

    /// Geocode a single free-form address
    #[instrument(skip(self))]
    pub async fn geocode_address(&self, address: &str) -> Result<GeocodedLocation> {
        let query = address.trim();
        match self.geocoder.geocode(query).await? {
            GeocodeLookup::Found(location) => Ok(location),
            GeocodeLookup::NoMatch { status } => Err(AwayError::GeocodingNoMatch {
                query: query.to_string(),
                status,
            }),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::caption::RetryPolicy;
    use crate::caption::tests::{RecordingSleeper, ScriptedProvider};
    use crate::geocoding::normalize;
    use crate::models::LabeledSpan;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Entity extractor that finds every known place name by substring search
    pub(crate) struct GazetteerExtractor {
        places: Vec<&'static str>,
    }

    impl GazetteerExtractor {
        pub(crate) fn new(places: Vec<&'static str>) -> Self {
            Self { places }
        }
    }

    #[async_trait]
    impl EntityExtractor for GazetteerExtractor {
        async fn extract_entities(&self, text: &str) -> Result<Vec<LabeledSpan>> {
            let mut spans = Vec::new();
            for place in &self.places {
                for (byte_idx, _) in text.match_indices(place) {
                    let start = text[..byte_idx].chars().count();
                    let end = start + place.chars().count();
                    spans.push(LabeledSpan::new(*place, "GPE", start, end));
                }
            }
            Ok(spans)
        }
    }

    /// Geocoder answering from a fixed table of query -> formatted address
    pub(crate) struct TableGeocoder {
        table: HashMap<&'static str, &'static str>,
        unavailable: bool,
        pub(crate) queries: Mutex<Vec<String>>,
    }

    impl TableGeocoder {
        pub(crate) fn new(table: Vec<(&'static str, &'static str)>) -> Self {
            Self {
                table: table.into_iter().collect(),
                unavailable: false,
                queries: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn unavailable() -> Self {
            Self {
                unavailable: true,
                ..Self::new(Vec::new())
            }
        }
    }

    #[async_trait]
    impl Geocoder for TableGeocoder {
        async fn geocode(&self, name: &str) -> Result<GeocodeLookup> {
            self.queries.lock().unwrap().push(name.to_string());
            if self.unavailable {
                return Err(AwayError::geocoding_unavailable("connection refused"));
            }
            Ok(match self.table.get(name) {
                Some(address) => GeocodeLookup::Found(normalize(
                    name,
                    address,
                    10.0,
                    20.0,
                    Some(format!("place-{name}")),
                )),
                None => GeocodeLookup::NoMatch {
                    status: "ZERO_RESULTS".to_string(),
                },
            })
        }
    }

    fn resolver(
        caption: &str,
        places: Vec<&'static str>,
        geocoder: Arc<TableGeocoder>,
    ) -> LocationResolver {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(Some(caption.to_string()))]));
        let captions = CaptionFetcher::new(provider, RetryPolicy::new(3, Duration::ZERO))
            .with_sleeper(Arc::new(RecordingSleeper::default()));
        LocationResolver::new(captions, Arc::new(GazetteerExtractor::new(places)), geocoder)
    }

    const POST_URL: &str = "https://www.instagram.com/p/CxYz123AbC/";

    #[tokio::test]
    async fn test_parse_post_end_to_end() {
        let geocoder = Arc::new(TableGeocoder::new(vec![
            ("Paris, France", "Paris, France"),
            ("Lyon", "Lyon, France"),
        ]));
        let resolver = resolver(
            "Weekend in Paris, France and then a long train ride to Lyon",
            vec!["Paris", "France", "Lyon"],
            geocoder.clone(),
        );

        let parsed = resolver.parse_post(POST_URL).await.unwrap();
        assert_eq!(
            parsed.caption,
            "Weekend in Paris, France and then a long train ride to Lyon"
        );
        let names: Vec<&str> = parsed.locations.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["Paris, France", "Lyon"]);
        assert_eq!(
            *geocoder.queries.lock().unwrap(),
            vec!["Paris, France".to_string(), "Lyon".to_string()]
        );
    }

    #[tokio::test]
    async fn test_unmatched_candidates_are_dropped() {
        let geocoder = Arc::new(TableGeocoder::new(vec![("Lyon", "Lyon, France")]));
        let resolver = resolver(
            "From Narnia all the way to Lyon",
            vec!["Narnia", "Lyon"],
            geocoder,
        );

        let parsed = resolver.parse_post(POST_URL).await.unwrap();
        assert_eq!(parsed.locations.len(), 1);
        assert_eq!(parsed.locations[0].city, "Lyon");
    }

    #[tokio::test]
    async fn test_empty_caption_yields_no_locations() {
        let geocoder = Arc::new(TableGeocoder::new(Vec::new()));
        let resolver = resolver("", vec!["Paris"], geocoder.clone());

        let parsed = resolver.parse_post(POST_URL).await.unwrap();
        assert_eq!(parsed.caption, "");
        assert!(parsed.locations.is_empty());
        assert!(geocoder.queries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_geocoding_outage_propagates() {
        let resolver = resolver(
            "Greetings from Lisbon",
            vec!["Lisbon"],
            Arc::new(TableGeocoder::unavailable()),
        );

        let err = resolver.parse_post(POST_URL).await.unwrap_err();
        assert!(matches!(err, AwayError::GeocodingUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_geocode_address_found() {
        let geocoder = Arc::new(TableGeocoder::new(vec![(
            "1600 Amphitheatre Pkwy",
            "1600 Amphitheatre Pkwy, Mountain View, CA 94043, USA",
        )]));
        let resolver = resolver("", Vec::new(), geocoder);

        let location = resolver
            .geocode_address("  1600 Amphitheatre Pkwy ")
            .await
            .unwrap();
        assert_eq!(location.name, "1600 Amphitheatre Pkwy");
        assert_eq!(location.city, "CA 94043");
        assert_eq!(location.country, "USA");
        assert_eq!(location.place_id.as_deref(), Some("place-1600 Amphitheatre Pkwy"));
    }

    #[tokio::test]
    async fn test_geocode_address_no_match() {
        let resolver = resolver("", Vec::new(), Arc::new(TableGeocoder::new(Vec::new())));

        let err = resolver.geocode_address("Atlantis").await.unwrap_err();
        assert!(matches!(
            err,
            AwayError::GeocodingNoMatch { ref status, .. } if status == "ZERO_RESULTS"
        ));
    }
}
