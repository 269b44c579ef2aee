//! Caption provider backed by an Apify Instagram scraper actor

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{CaptionProvider, ProviderError};
use crate::config::CaptionConfig;
use crate::shortcode::canonical_post_url;
use crate::{AwayError, Result};

/// Runs the actor synchronously for a single post URL
pub struct ApifyCaptionProvider {
    client: Client,
    token: String,
    actor: String,
    base_url: String,
}

/// Actor input for scraping one post
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PostScraperInput {
    direct_urls: Vec<String>,
    results_type: &'static str,
    results_limit: u32,
}

/// The fields we need from a dataset item
#[derive(Debug, Deserialize)]
struct ScrapedPost {
    caption: Option<String>,
    #[serde(rename = "shortCode")]
    short_code: Option<String>,
    error: Option<String>,
    #[serde(rename = "errorDescription")]
    error_description: Option<String>,
}

impl ApifyCaptionProvider {
    pub fn new(
        token: impl Into<String>,
        actor: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("away/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AwayError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            token: token.into(),
            actor: actor.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &CaptionConfig) -> Result<Self> {
        let token = config
            .apify_token
            .clone()
            .ok_or_else(|| AwayError::config("Missing Apify token"))?;
        Self::new(
            token,
            config.apify_actor.clone(),
            config.apify_base_url.clone(),
            config.timeout(),
        )
    }

    fn run_url(&self) -> String {
        format!(
            "{}/acts/{}/run-sync-get-dataset-items",
            self.base_url, self.actor
        )
    }
}

#[async_trait]
impl CaptionProvider for ApifyCaptionProvider {
    #[instrument(name = "apify_fetch_caption", skip(self))]
    async fn fetch_caption(
        &self,
        shortcode: &str,
    ) -> std::result::Result<Option<String>, ProviderError> {
        let input = PostScraperInput {
            direct_urls: vec![canonical_post_url(shortcode)],
            results_type: "posts",
            results_limit: 1,
        };

        let response = self
            .client
            .post(self.run_url())
            .bearer_auth(&self.token)
            .json(&input)
            .send()
            .await
            .map_err(|e| ProviderError::Failed(format!("Apify request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status("Apify", status, &body));
        }

        let posts: Vec<ScrapedPost> = response
            .json()
            .await
            .map_err(|e| ProviderError::Failed(format!("Failed to parse Apify response: {e}")))?;

        caption_from_items(posts)
    }
}

fn caption_from_items(
    posts: Vec<ScrapedPost>,
) -> std::result::Result<Option<String>, ProviderError> {
    let Some(post) = posts.into_iter().next() else {
        return Err(ProviderError::Failed(
            "Apify returned no data for this post".to_string(),
        ));
    };

    if let Some(error) = post.error {
        let detail = post.error_description.unwrap_or(error);
        return Err(ProviderError::Failed(format!("Apify could not scrape post: {detail}")));
    }

    debug!(short_code = ?post.short_code, "Apify returned post");
    Ok(post.caption)
}
