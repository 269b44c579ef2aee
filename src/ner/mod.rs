//! Named-entity recognition seam
//!
//! The model itself runs out of process; this module only defines the
//! narrow interface the pipeline needs plus an HTTP client for it.

pub mod http;

use async_trait::async_trait;

use crate::Result;
use crate::models::LabeledSpan;

pub use http::HttpEntityExtractor;

/// Produces labeled spans for a piece of text
#[async_trait]
pub trait EntityExtractor: Send + Sync {
    async fn extract_entities(&self, text: &str) -> Result<Vec<LabeledSpan>>;
}
