//! `Away` - place extraction for Instagram posts
//!
//! This library fetches a post's caption, finds the places it mentions
//! with an external NER model, and geocodes them into structured records.

pub mod api;
pub mod caption;
pub mod config;
pub mod dedup;
pub mod error;
pub mod geocoding;
pub mod grouper;
pub mod logging;
pub mod models;
pub mod ner;
pub mod resolver;
pub mod shortcode;
pub mod web;

// Re-export core types for public API
pub use api::AppState;
pub use caption::{CaptionFetcher, CaptionProvider, ProviderError, RetryPolicy, Sleeper};
pub use config::AwayConfig;
pub use error::AwayError;
pub use geocoding::{GeocodeLookup, Geocoder, GoogleGeocoder};
pub use models::{EntityLabel, GeocodedLocation, LabeledSpan};
pub use ner::{EntityExtractor, HttpEntityExtractor};
pub use resolver::{LocationResolver, ParsedPost};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, AwayError>;
