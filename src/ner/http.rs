//! Client for a spaCy-style NER service

use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::EntityExtractor;
use crate::config::NerConfig;
use crate::models::LabeledSpan;
use crate::{AwayError, Result};

/// Posts caption text to the NER service and reads back its entities
pub struct HttpEntityExtractor {
    client: Client,
    url: String,
    model: Option<String>,
}

#[derive(Debug, Serialize)]
struct NerRequest<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct NerResponse {
    #[serde(alias = "ents")]
    entities: Vec<LabeledSpan>,
}

impl HttpEntityExtractor {
    pub fn new(config: &NerConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AwayError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: config.url.clone(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl EntityExtractor for HttpEntityExtractor {
    #[instrument(name = "extract_entities", skip(self, text), fields(bytes = text.len()))]
    async fn extract_entities(&self, text: &str) -> Result<Vec<LabeledSpan>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let start_time = Instant::now();
        let request = NerRequest {
            text,
            model: self.model.as_deref(),
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AwayError::entity_extraction(format!("NER request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "NER service returned an error");
            return Err(AwayError::entity_extraction(format!(
                "NER service error {status}: {body}"
            )));
        }

        let parsed: NerResponse = response.json().await.map_err(|e| {
            AwayError::entity_extraction(format!("Failed to parse NER response: {e}"))
        })?;

        debug!(
            "NER returned {} entities in {:.3}s",
            parsed.entities.len(),
            start_time.elapsed().as_secs_f64()
        );
        Ok(parsed.entities)
    }
}
