//! Instagram post shortcode extraction

use std::sync::LazyLock;

use regex::Regex;

static SHORTCODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:/reel/|/p/|/tv/)([A-Za-z0-9_-]{5,})").expect("shortcode pattern is valid")
});

/// Pull the post identifier out of a `/p/`, `/reel/` or `/tv/` URL.
#[must_use]
pub fn extract_shortcode(url: &str) -> Option<&str> {
    SHORTCODE_RE
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Canonical post URL for providers that want a full link rather than a shortcode
#[must_use]
pub fn canonical_post_url(shortcode: &str) -> String {
    format!("https://www.instagram.com/p/{shortcode}/")
}
