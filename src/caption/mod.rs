//! Caption fetching
//!
//! A [`CaptionProvider`] knows how to get the caption for one shortcode from
//! some backend (a scraping API, Instagram's own web endpoints, ...). The
//! [`CaptionFetcher`] sits in front of it: it validates the post URL, and
//! retries rate-limited providers with bounded exponential backoff.

pub mod apify;
pub mod instagram;
pub mod retry;

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::config::{CaptionConfig, CaptionProviderKind};
use crate::shortcode::extract_shortcode;
use crate::{AwayError, Result};

pub use apify::ApifyCaptionProvider;
pub use instagram::InstagramCaptionProvider;
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};

/// Failure reported by a caption backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Rate limit error: {0}")]
    RateLimited(String),

    #[error("{0}")]
    Failed(String),
}

impl ProviderError {
    /// Classify a non-success HTTP response
    #[must_use]
    pub fn from_status(provider: &str, status: StatusCode, body: &str) -> Self {
        if status == StatusCode::TOO_MANY_REQUESTS {
            ProviderError::RateLimited(format!("{provider} rate limit exceeded"))
        } else {
            ProviderError::Failed(format!("{provider} error {status}: {}", snippet(body)))
        }
    }
}

fn snippet(body: &str) -> &str {
    match body.char_indices().nth(300) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

/// Backend able to return the caption of a post
#[async_trait]
pub trait CaptionProvider: Send + Sync {
    /// `Ok(None)` means the post exists but has no caption.
    async fn fetch_caption(
        &self,
        shortcode: &str,
    ) -> std::result::Result<Option<String>, ProviderError>;
}

/// Builds the provider selected in configuration
pub fn provider_from_config(config: &CaptionConfig) -> Result<Arc<dyn CaptionProvider>> {
    let provider: Arc<dyn CaptionProvider> = match config.provider {
        CaptionProviderKind::Apify => Arc::new(ApifyCaptionProvider::from_config(config)?),
        CaptionProviderKind::Instagram => {
            Arc::new(InstagramCaptionProvider::from_config(config)?)
        }
    };
    info!(provider = ?config.provider, "Caption provider ready");
    Ok(provider)
}

/// Fetches captions for post URLs, retrying on rate limits
pub struct CaptionFetcher {
    provider: Arc<dyn CaptionProvider>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl CaptionFetcher {
    pub fn new(provider: Arc<dyn CaptionProvider>, policy: RetryPolicy) -> Self {
        Self {
            provider,
            policy,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    pub fn from_config(config: &CaptionConfig) -> Result<Self> {
        let policy = RetryPolicy::new(config.max_attempts, config.base_delay());
        Ok(Self::new(provider_from_config(config)?, policy))
    }

    /// Replace the delay implementation used between attempts
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Caption text for a post URL; empty when the post has no caption.
    #[instrument(skip(self))]
    pub async fn fetch_caption(&self, url: &str) -> Result<String> {
        let shortcode = extract_shortcode(url).ok_or_else(|| {
            AwayError::invalid_url("Invalid Instagram URL. Could not extract shortcode.")
        })?;

        let mut attempt = 1;
        loop {
            debug!(
                "Fetching caption for {} (attempt {}/{})",
                shortcode, attempt, self.policy.max_attempts
            );

            match self.provider.fetch_caption(shortcode).await {
                Ok(caption) => {
                    let caption = caption.unwrap_or_default();
                    debug!(chars = caption.chars().count(), "Caption fetched");
                    return Ok(caption);
                }
                Err(ProviderError::RateLimited(message)) if attempt < self.policy.max_attempts => {
                    let backoff = self.policy.delay_after(attempt);
                    warn!(
                        "{} on attempt {}, backing off {:.1}s",
                        message,
                        attempt,
                        backoff.as_secs_f64()
                    );
                    self.sleeper.sleep(backoff).await;
                    attempt += 1;
                }
                Err(ProviderError::RateLimited(message)) => {
                    return Err(AwayError::caption_fetch(format!(
                        "{message}; gave up after {attempt} attempts"
                    )));
                }
                Err(ProviderError::Failed(message)) => {
                    return Err(AwayError::caption_fetch(message));
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    type Reply = std::result::Result<Option<String>, ProviderError>;

    /// Provider that plays back canned replies, repeating the last one
    pub(crate) struct ScriptedProvider {
        replies: Mutex<VecDeque<Reply>>,
        pub(crate) calls: AtomicUsize,
    }

    impl ScriptedProvider {
        pub(crate) fn new(replies: Vec<Reply>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CaptionProvider for ScriptedProvider {
        async fn fetch_caption(&self, _shortcode: &str) -> Reply {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut replies = self.replies.lock().unwrap();
            if replies.len() > 1 {
                replies.pop_front().unwrap()
            } else {
                replies.front().cloned().unwrap()
            }
        }
    }

    /// Records requested delays without waiting
    #[derive(Default)]
    pub(crate) struct RecordingSleeper {
        pub(crate) delays: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.delays.lock().unwrap().push(duration);
        }
    }

    const POST_URL: &str = "https://www.instagram.com/p/CxYz123AbC/";

    fn fetcher(
        provider: Arc<ScriptedProvider>,
        sleeper: Arc<RecordingSleeper>,
    ) -> CaptionFetcher {
        CaptionFetcher::new(provider, RetryPolicy::new(3, Duration::from_millis(100)))
            .with_sleeper(sleeper)
    }

    fn rate_limited() -> Reply {
        Err(ProviderError::RateLimited("Instagram rate limit exceeded".to_string()))
    }

    #[tokio::test]
    async fn test_returns_caption_on_first_success() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(Some("Hello Lisbon".into()))]));
        let sleeper = Arc::new(RecordingSleeper::default());
        let caption = fetcher(provider.clone(), sleeper.clone())
            .fetch_caption(POST_URL)
            .await
            .unwrap();

        assert_eq!(caption, "Hello Lisbon");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert!(sleeper.delays.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_caption_is_empty_string() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(None)]));
        let sleeper = Arc::new(RecordingSleeper::default());
        let caption = fetcher(provider, sleeper).fetch_caption(POST_URL).await.unwrap();
        assert_eq!(caption, "");
    }

    #[tokio::test]
    async fn test_rate_limit_retries_with_doubling_backoff() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            rate_limited(),
            rate_limited(),
            Ok(Some("Finally".into())),
        ]));
        let sleeper = Arc::new(RecordingSleeper::default());
        let caption = fetcher(provider.clone(), sleeper.clone())
            .fetch_caption(POST_URL)
            .await
            .unwrap();

        assert_eq!(caption, "Finally");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            *sleeper.delays.lock().unwrap(),
            vec![Duration::from_millis(100), Duration::from_millis(200)]
        );
    }

    #[tokio::test]
    async fn test_rate_limit_exhaustion_propagates() {
        let provider = Arc::new(ScriptedProvider::new(vec![rate_limited()]));
        let sleeper = Arc::new(RecordingSleeper::default());
        let err = fetcher(provider.clone(), sleeper.clone())
            .fetch_caption(POST_URL)
            .await
            .unwrap_err();

        assert!(matches!(err, AwayError::CaptionFetch { .. }));
        assert!(err.to_string().contains("gave up after 3 attempts"));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
        assert_eq!(sleeper.delays.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_other_provider_errors_are_not_retried() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Err(ProviderError::Failed("post not found".into())),
            Ok(Some("never reached".into())),
        ]));
        let sleeper = Arc::new(RecordingSleeper::default());
        let err = fetcher(provider.clone(), sleeper.clone())
            .fetch_caption(POST_URL)
            .await
            .unwrap_err();

        assert!(matches!(err, AwayError::CaptionFetch { .. }));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert!(sleeper.delays.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_url_never_reaches_provider() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(Some("x".into()))]));
        let sleeper = Arc::new(RecordingSleeper::default());
        let err = fetcher(provider.clone(), sleeper)
            .fetch_caption("https://www.instagram.com/someone/")
            .await
            .unwrap_err();

        assert!(matches!(err, AwayError::InvalidUrl { .. }));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            ProviderError::from_status("Apify", StatusCode::TOO_MANY_REQUESTS, ""),
            ProviderError::RateLimited(_)
        ));
        let failed = ProviderError::from_status("Apify", StatusCode::NOT_FOUND, "missing");
        assert!(matches!(failed, ProviderError::Failed(ref m) if m.contains("missing")));
    }
}
