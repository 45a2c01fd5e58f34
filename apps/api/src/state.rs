use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::extraction::oracle::QuoteExtractor;
use crate::scrape::ScraperClient;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// None when DATABASE_URL is unset; extraction still works, nothing is stored.
    pub db: Option<PgPool>,
    /// Pluggable extraction oracle. Default: LlmQuoteExtractor over OpenAI.
    pub extractor: Arc<dyn QuoteExtractor>,
    pub scraper: ScraperClient,
    /// Runtime settings, kept on state for handlers that need them.
    #[allow(dead_code)]
    pub config: Config,
}
