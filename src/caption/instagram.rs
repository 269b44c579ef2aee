//! Caption provider that reads Instagram's web JSON with a logged-in session

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{COOKIE, HeaderMap, HeaderValue};
use serde_json::Value;
use tracing::{debug, instrument};

use super::{CaptionProvider, ProviderError};
use crate::config::CaptionConfig;
use crate::{AwayError, Result};

/// App id the Instagram web client sends with its JSON requests
const WEB_APP_ID: &str = "936619743392459";

/// Text Instagram serves instead of data when it throttles a session
const THROTTLE_MARKER: &str = "Please wait a few minutes";

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

pub struct InstagramCaptionProvider {
    client: Client,
    base_url: String,
}

impl InstagramCaptionProvider {
    pub fn new(session_id: &str, base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, session_cookie(session_id)?);
        headers.insert("X-IG-App-ID", HeaderValue::from_static(WEB_APP_ID));

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(|e| AwayError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &CaptionConfig) -> Result<Self> {
        let session_id = config
            .session_id
            .as_deref()
            .ok_or_else(|| AwayError::config("Missing Instagram session id"))?;
        Self::new(session_id, config.instagram_base_url.clone(), config.timeout())
    }

    fn post_url(&self, shortcode: &str) -> String {
        format!("{}/p/{}/?__a=1&__d=dis", self.base_url, shortcode)
    }
}

/// `sessionid` cookie, marked sensitive so it never shows up in debug output
fn session_cookie(session_id: &str) -> Result<HeaderValue> {
    let mut cookie = HeaderValue::from_str(&format!("sessionid={session_id}"))
        .map_err(|_| AwayError::config("Instagram session id contains invalid characters"))?;
    cookie.set_sensitive(true);
    Ok(cookie)
}

#[async_trait]
impl CaptionProvider for InstagramCaptionProvider {
    #[instrument(name = "instagram_fetch_caption", skip(self))]
    async fn fetch_caption(
        &self,
        shortcode: &str,
    ) -> std::result::Result<Option<String>, ProviderError> {
        let response = self
            .client
            .get(self.post_url(shortcode))
            .send()
            .await
            .map_err(|e| ProviderError::Failed(format!("Instagram request failed: {e}")))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        debug!(%status, bytes = body.len(), "Instagram responded");

        if body.contains(THROTTLE_MARKER) {
            return Err(ProviderError::RateLimited(
                "Instagram asked us to wait".to_string(),
            ));
        }
        if !status.is_success() {
            return Err(ProviderError::from_status("Instagram", status, &body));
        }

        let payload: Value = serde_json::from_str(&body).map_err(|_| {
            ProviderError::Failed(
                "Instagram did not return JSON; the session may have expired".to_string(),
            )
        })?;

        caption_from_payload(&payload)
    }
}

/// Read the caption from either the current `items` shape or the legacy
/// `graphql.shortcode_media` shape.
fn caption_from_payload(payload: &Value) -> std::result::Result<Option<String>, ProviderError> {
    if let Some(items) = payload.get("items").and_then(Value::as_array) {
        let Some(item) = items.first() else {
            return Err(ProviderError::Failed("Instagram post not found".to_string()));
        };
        return Ok(item
            .pointer("/caption/text")
            .and_then(Value::as_str)
            .map(str::to_string));
    }

    if let Some(media) = payload.pointer("/graphql/shortcode_media") {
        return Ok(media
            .pointer("/edge_media_to_caption/edges/0/node/text")
            .and_then(Value::as_str)
            .map(str::to_string));
    }

    Err(ProviderError::Failed(
        "Unexpected Instagram response shape".to_string(),
    ))
}
