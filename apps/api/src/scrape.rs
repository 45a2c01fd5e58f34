/// Firecrawl scrape client — resolves proposal URLs to markdown text.
///
/// Scraping is an optional integration. Without `FIRECRAWL_API_KEY` the
/// client still constructs (so `AppState` stays simple), but every scrape
/// fails fast with `ScrapeError::Disabled`.
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const FIRECRAWL_API_URL: &str = "https://api.firecrawl.dev/v1/scrape";
/// Upper bound Firecrawl spends rendering a page, in milliseconds.
const SCRAPE_TIMEOUT_MS: u32 = 60_000;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Scraping is not configured (FIRECRAWL_API_KEY not set)")]
    Disabled,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Scrape API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Scrape returned no markdown content")]
    EmptyContent,
}

#[derive(Debug, Serialize)]
struct ScrapeRequest<'a> {
    url: &'a str,
    formats: [&'a str; 1],
    #[serde(rename = "onlyMainContent")]
    only_main_content: bool,
    timeout: u32,
}

#[derive(Debug, Deserialize)]
struct ScrapeResponse {
    success: bool,
    data: Option<ScrapeData>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ScrapeData {
    markdown: Option<String>,
}

#[derive(Clone)]
pub struct ScraperClient {
    client: Client,
    api_key: Option<String>,
}

impl ScraperClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: Client::builder()
                // Slightly above the scrape timeout so Firecrawl answers first
                .timeout(std::time::Duration::from_secs(70))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    /// Fetches a URL through Firecrawl and returns the main content as markdown.
    pub async fn scrape_markdown(&self, url: &str) -> Result<String, ScrapeError> {
        let api_key = self.api_key.as_deref().ok_or(ScrapeError::Disabled)?;

        let request_body = ScrapeRequest {
            url,
            formats: ["markdown"],
            only_main_content: true,
            timeout: SCRAPE_TIMEOUT_MS,
        };

        let response = self
            .client
            .post(FIRECRAWL_API_URL)
            .bearer_auth(api_key)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScrapeError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let scrape: ScrapeResponse = response.json().await?;
        if !scrape.success {
            return Err(ScrapeError::Api {
                status: status.as_u16(),
                message: scrape
                    .error
                    .unwrap_or_else(|| "scrape reported failure".to_string()),
            });
        }

        let markdown = scrape
            .data
            .and_then(|d| d.markdown)
            .filter(|m| !m.trim().is_empty())
            .ok_or(ScrapeError::EmptyContent)?;

        debug!("Scraped {url}: {} chars of markdown", markdown.len());
        Ok(markdown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scrape_disabled_without_key() {
        let client = ScraperClient::new(None);
        assert!(!client.is_enabled());
        let err = client
            .scrape_markdown("https://example.com/proposal/1")
            .await
            .unwrap_err();
        assert!(matches!(err, ScrapeError::Disabled));
    }
}
