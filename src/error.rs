//! Error types and handling for the Away service

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// Longest message echoed back to clients for server-side failures
const MAX_CLIENT_DETAIL: usize = 200;

/// Main error type for the Away service
#[derive(Error, Debug)]
pub enum AwayError {
    /// Malformed or missing request fields
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// Request body exceeded the configured size limit
    #[error("{message}")]
    PayloadTooLarge { message: String },

    /// No shortcode could be extracted from the post URL
    #[error("{message}")]
    InvalidUrl { message: String },

    /// The caption provider failed, or kept rate-limiting until retries ran out
    #[error("Caption fetch failed: {message}")]
    CaptionFetch { message: String },

    /// The NER service could not be reached or returned garbage
    #[error("Entity extraction failed: {message}")]
    EntityExtraction { message: String },

    /// Transport-level failure talking to the geocoding provider
    #[error("Geocoding request failed: {message}")]
    GeocodingUnavailable { message: String },

    /// The geocoding provider answered but had nothing for the query
    #[error("Geocoding failed: {status}")]
    GeocodingNoMatch { query: String, status: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Anything else; the message is logged but never sent to clients
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AwayError {
    /// Create a new invalid request error
    pub fn invalid_request<S: Into<String>>(message: S) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create a new payload too large error
    pub fn payload_too_large<S: Into<String>>(message: S) -> Self {
        Self::PayloadTooLarge {
            message: message.into(),
        }
    }

    /// Create a new invalid URL error
    pub fn invalid_url<S: Into<String>>(message: S) -> Self {
        Self::InvalidUrl {
            message: message.into(),
        }
    }

    /// Create a new caption fetch error
    pub fn caption_fetch<S: Into<String>>(message: S) -> Self {
        Self::CaptionFetch {
            message: message.into(),
        }
    }

    /// Create a new entity extraction error
    pub fn entity_extraction<S: Into<String>>(message: S) -> Self {
        Self::EntityExtraction {
            message: message.into(),
        }
    }

    /// Create a new geocoding transport error
    pub fn geocoding_unavailable<S: Into<String>>(message: S) -> Self {
        Self::GeocodingUnavailable {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// HTTP status this error is reported with
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            AwayError::InvalidRequest { .. }
            | AwayError::InvalidUrl { .. }
            | AwayError::GeocodingNoMatch { .. } => StatusCode::BAD_REQUEST,
            AwayError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AwayError::GeocodingUnavailable { .. } => StatusCode::BAD_GATEWAY,
            AwayError::CaptionFetch { .. }
            | AwayError::EntityExtraction { .. }
            | AwayError::Config { .. }
            | AwayError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to hand back to an API client
    #[must_use]
    pub fn client_detail(&self) -> String {
        match self {
            AwayError::InvalidRequest { message }
            | AwayError::InvalidUrl { message }
            | AwayError::PayloadTooLarge { message } => message.clone(),
            AwayError::GeocodingNoMatch { .. } | AwayError::GeocodingUnavailable { .. } => {
                self.to_string()
            }
            AwayError::Internal { .. } => "Internal Server Error".to_string(),
            _ => format!(
                "Internal Server Error: {}",
                truncate(&self.to_string(), MAX_CLIENT_DETAIL)
            ),
        }
    }
}

fn truncate(message: &str, max_chars: usize) -> String {
    match message.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &message[..idx]),
        None => message.to_string(),
    }
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for AwayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = ?self, "{}", self);
        } else {
            tracing::warn!(%status, "{}", self);
        }

        let body = ErrorBody {
            detail: self.client_detail(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let config_err = AwayError::config("missing API key");
        assert!(matches!(config_err, AwayError::Config { .. }));

        let url_err = AwayError::invalid_url("no shortcode");
        assert!(matches!(url_err, AwayError::InvalidUrl { .. }));

        let geo_err = AwayError::geocoding_unavailable("timed out");
        assert!(matches!(geo_err, AwayError::GeocodingUnavailable { .. }));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AwayError::invalid_request("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AwayError::invalid_url("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AwayError::GeocodingNoMatch {
                query: "nowhere".to_string(),
                status: "ZERO_RESULTS".to_string(),
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AwayError::geocoding_unavailable("x").status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AwayError::caption_fetch("x").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_client_detail_truncates_server_errors() {
        let err = AwayError::entity_extraction("x".repeat(500));
        let detail = err.client_detail();
        assert!(detail.starts_with("Internal Server Error: Entity extraction failed: "));
        assert!(detail.ends_with("..."));
        assert!(detail.chars().count() < 260);
    }

    #[test]
    fn test_internal_detail_is_generic() {
        let err = AwayError::internal("handler panicked: secret stack detail");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.client_detail(), "Internal Server Error");
    }

    #[test]
    fn test_payload_too_large() {
        let err = AwayError::payload_too_large("Request body is too large");
        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(err.client_detail(), "Request body is too large");
    }

    #[test]
    fn test_client_detail_keeps_validation_message() {
        let err = AwayError::invalid_request("Body must include a non-empty 'address'");
        assert_eq!(err.client_detail(), "Body must include a non-empty 'address'");
    }

    #[test]
    fn test_no_match_detail_mentions_status() {
        let err = AwayError::GeocodingNoMatch {
            query: "Atlantis".to_string(),
            status: "ZERO_RESULTS".to_string(),
        };
        assert_eq!(err.client_detail(), "Geocoding failed: ZERO_RESULTS");
    }
}
