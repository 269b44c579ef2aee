//! Data models for the Away service
//!
//! This module contains the request-scoped domain models:
//! - Entity: labeled text spans produced by the NER service
//! - Location: geocoded place records returned to clients

pub mod entity;
pub mod location;

// Re-export all public types for convenient access
pub use entity::{EntityLabel, LabeledSpan};
pub use location::GeocodedLocation;
