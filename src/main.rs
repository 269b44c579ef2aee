use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use away::{
    AppState, AwayConfig, CaptionFetcher, GoogleGeocoder, HttpEntityExtractor, LocationResolver,
    logging, web,
};

#[derive(Parser, Debug)]
#[command(name = "away")]
#[command(about = "Extracts place mentions from Instagram posts and geocodes them")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "AWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on, overriding configuration
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Local .env for development; deployed environments set variables directly
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut config =
        AwayConfig::load_from_path(args.config).context("Failed to load configuration")?;
    if let Some(port) = args.port {
        config.server.port = port;
    }

    logging::init(&config.logging)?;
    tracing::info!("Starting Away API v{}", away::VERSION);
    tracing::info!(
        caption_provider = ?config.caption.provider,
        ner_url = %config.ner.url,
        ner_model = ?config.ner.model,
        "Configuration loaded"
    );

    let geocoder = GoogleGeocoder::new(&config.geocoding)?;
    let entities = HttpEntityExtractor::new(&config.ner)?;
    let captions = CaptionFetcher::from_config(&config.caption)?;

    let resolver = LocationResolver::new(captions, Arc::new(entities), Arc::new(geocoder));
    let state = AppState::new(resolver);

    web::run(&config.server, state).await
}
