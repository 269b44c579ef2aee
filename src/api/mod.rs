//! JSON endpoints under `/api`

use std::sync::Arc;

use axum::{
    Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::Json,
    routing::post,
};
use serde::{Deserialize, Serialize};

use crate::{
    AwayError, Result,
    models::GeocodedLocation,
    resolver::{LocationResolver, ParsedPost},
};

const MISSING_URL_DETAIL: &str = "Body must include 'url' (Instagram link). For address geocoding, call POST /api/geocode_address with {'address': '...'}";

const MISSING_ADDRESS_DETAIL: &str = "Body must include a non-empty 'address'";

const PAYLOAD_TOO_LARGE_DETAIL: &str = "Request body is too large";

/// State shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<LocationResolver>,
}

impl AppState {
    pub fn new(resolver: LocationResolver) -> Self {
        Self {
            resolver: Arc::new(resolver),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ParseRequest {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GeocodeRequest {
    #[serde(default)]
    pub address: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/parse_instagram_post", post(parse_instagram_post))
        .route("/geocode_address", post(geocode_address))
        .route("/manual_geocode", post(geocode_address))
}

async fn parse_instagram_post(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ParseRequest>, JsonRejection>,
) -> Result<Json<ParsedPost>> {
    let Json(request) =
        payload.map_err(|rejection| rejection_error(&rejection, MISSING_URL_DETAIL))?;
    let url = validated_post_url(&request)?;

    let parsed = state.resolver.parse_post(url).await?;
    Ok(Json(parsed))
}

async fn geocode_address(
    State(state): State<AppState>,
    payload: std::result::Result<Json<GeocodeRequest>, JsonRejection>,
) -> Result<Json<GeocodedLocation>> {
    let Json(request) =
        payload.map_err(|rejection| rejection_error(&rejection, MISSING_ADDRESS_DETAIL))?;
    let address = validated_address(&request)?;

    let location = state.resolver.geocode_address(address).await?;
    Ok(Json(location))
}

/// Oversized bodies are reported as such; anything else gets the field guard message
fn rejection_error(rejection: &JsonRejection, guard: &str) -> AwayError {
    match rejection {
        JsonRejection::BytesRejection(err) if err.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            AwayError::payload_too_large(PAYLOAD_TOO_LARGE_DETAIL)
        }
        JsonRejection::BytesRejection(err) => AwayError::invalid_request(err.body_text()),
        _ => AwayError::invalid_request(guard),
    }
}

/// The URL must be present and look like an HTTP(S) link
fn validated_post_url(request: &ParseRequest) -> Result<&str> {
    match request.url.as_deref() {
        Some(url) if url.starts_with("http://") || url.starts_with("https://") => Ok(url),
        _ => Err(AwayError::invalid_request(MISSING_URL_DETAIL)),
    }
}

fn validated_address(request: &GeocodeRequest) -> Result<&str> {
    match request.address.as_deref() {
        Some(address) if !address.trim().is_empty() => Ok(address),
        _ => Err(AwayError::invalid_request(MISSING_ADDRESS_DETAIL)),
    }
}
