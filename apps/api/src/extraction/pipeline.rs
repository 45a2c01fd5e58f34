//! Extraction pipeline — resolves inputs to text, runs the extractor, and
//! merges the results.
//!
//! The email side and the proposal side are extracted independently and then
//! merged with proposal precedence. A proposal can arrive as an uploaded
//! file, an explicit URL, or a URL discovered inside the email; URLs are only
//! chased when no proposal document was uploaded. Persistence is best-effort
//! and never fails the request.

use sqlx::PgPool;
use tracing::{error, warn};

use crate::errors::AppError;
use crate::extraction::content::{resolve_document, DocumentKind, UploadedDocument};
use crate::extraction::merge::merge_quotes;
use crate::extraction::oracle::QuoteExtractor;
use crate::extraction::quote::QuoteRecord;
use crate::extraction::store::{store_completed_request, RequestMeta};
use crate::extraction::urls::{dedup_preserving_order, extract_urls};
use crate::scrape::{ScrapeError, ScraperClient};

/// Everything a caller can hand the pipeline. All fields optional; at least
/// one must be present.
#[derive(Debug, Default)]
pub struct ExtractionInput {
    pub email_content: Option<String>,
    pub email_file: Option<UploadedDocument>,
    pub proposal_file: Option<UploadedDocument>,
    pub proposal_url: Option<String>,
}

impl ExtractionInput {
    /// Blank strings count as absent.
    pub fn is_empty(&self) -> bool {
        let blank = |s: &Option<String>| s.as_deref().map_or(true, |v| v.trim().is_empty());
        blank(&self.email_content)
            && blank(&self.proposal_url)
            && self.email_file.is_none()
            && self.proposal_file.is_none()
    }
}

/// The merged record plus the envelope fields reported alongside it.
#[derive(Debug)]
pub struct ExtractionOutcome {
    pub record: QuoteRecord,
    pub sources: Vec<String>,
    pub urls_found: Vec<String>,
}

/// Runs the full extraction flow for one request.
pub async fn run_extraction(
    extractor: &dyn QuoteExtractor,
    scraper: &ScraperClient,
    db: Option<&PgPool>,
    input: ExtractionInput,
) -> Result<ExtractionOutcome, AppError> {
    if input.is_empty() {
        return Err(AppError::NoContent);
    }

    // Captured up front so the stored row reflects the raw submission.
    let meta = RequestMeta {
        email_content: input
            .email_content
            .clone()
            .filter(|c| !c.trim().is_empty()),
        email_file_name: input.email_file.as_ref().map(|d| d.filename.clone()),
        email_file_size: input.email_file.as_ref().map(|d| d.size() as i64),
        proposal_file_name: input.proposal_file.as_ref().map(|d| d.filename.clone()),
        proposal_file_size: input.proposal_file.as_ref().map(|d| d.size() as i64),
        proposal_url: input.proposal_url.clone().filter(|u| !u.trim().is_empty()),
    };

    // An explicit proposal URL is chased first, then anything spotted in the
    // email body.
    let mut urls: Vec<String> = Vec::new();
    if let Some(url) = &meta.proposal_url {
        urls.push(url.trim().to_string());
    }
    if let Some(content) = &input.email_content {
        urls.extend(extract_urls(content));
    }

    // An uploaded email file supersedes pasted email text; both feed the URL
    // harvest.
    let (email_text, email_label) = match input.email_file {
        Some(doc) => {
            let text = resolve_upload(doc).await?;
            urls.extend(extract_urls(&text));
            (Some(text), "email_file")
        }
        None => (meta.email_content.clone(), "email"),
    };

    // PDFs rarely carry usable links once flattened to text, so only scan
    // the other formats.
    let proposal_text = match input.proposal_file {
        Some(doc) => {
            let kind = doc.kind();
            let text = resolve_upload(doc).await?;
            if kind != DocumentKind::Pdf {
                urls.extend(extract_urls(&text));
            }
            Some(text)
        }
        None => None,
    };

    let mut urls = dedup_preserving_order(urls);

    let mut sources: Vec<String> = Vec::new();
    let (email_record, mut proposal_record) = match (&email_text, &proposal_text) {
        (Some(email), Some(proposal)) => {
            let (email_result, proposal_result) =
                tokio::join!(extractor.extract(email), extractor.extract(proposal));
            (Some(email_result?), Some(proposal_result?))
        }
        (Some(email), None) => (Some(extractor.extract(email).await?), None),
        (None, Some(proposal)) => (None, Some(extractor.extract(proposal).await?)),
        (None, None) => (None, None),
    };
    if email_record.is_some() {
        sources.push(email_label.to_string());
    }
    if proposal_record.is_some() {
        sources.push("proposal_file".to_string());
    }

    // The model sometimes finds a proposal link the regexes missed.
    if proposal_record.is_none() && urls.is_empty() {
        if let Some(url) = email_record
            .as_ref()
            .and_then(|r| r.extras.proposal_url.as_deref())
        {
            let url = url.trim();
            if !url.is_empty() {
                urls.push(url.to_string());
            }
        }
    }

    if proposal_record.is_none() && !urls.is_empty() {
        let mut last_error = None;
        for url in &urls {
            match extract_from_url(extractor, scraper, url).await {
                Ok(mut record) => {
                    record.extras.proposal_url = Some(url.clone());
                    sources.push("proposal_url".to_string());
                    proposal_record = Some(record);
                    break;
                }
                Err(err) => {
                    warn!("Extraction from {url} failed: {err}");
                    last_error = Some(err);
                }
            }
        }
        // With no email record to fall back on, a failed chase is fatal.
        if proposal_record.is_none() && email_record.is_none() {
            if let Some(err) = last_error {
                return Err(err);
            }
        }
    }

    let mut record = merge_quotes(email_record, proposal_record).ok_or_else(|| {
        AppError::Extraction("no quote data could be extracted from the provided input".to_string())
    })?;
    record.sources = sources.clone();

    if let Some(pool) = db {
        if let Err(err) = store_completed_request(pool, &meta, &record, &urls).await {
            error!("Failed to persist extraction: {err:#}");
        }
    }

    Ok(ExtractionOutcome {
        record,
        sources,
        urls_found: urls,
    })
}

/// PDF and HTML resolution is CPU-bound, so it runs off the async runtime.
async fn resolve_upload(doc: UploadedDocument) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || resolve_document(&doc))
        .await
        .map_err(anyhow::Error::new)?
}

async fn extract_from_url(
    extractor: &dyn QuoteExtractor,
    scraper: &ScraperClient,
    url: &str,
) -> Result<QuoteRecord, AppError> {
    let markdown = scraper.scrape_markdown(url).await.map_err(|e| match e {
        ScrapeError::Disabled => AppError::Resolution(
            "a proposal URL was found but scraping is not configured (FIRECRAWL_API_KEY not set)"
                .to_string(),
        ),
        other => AppError::Resolution(format!("failed to scrape {url}: {other}")),
    })?;
    extractor.extract(&markdown).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::quote::MoneyField;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FakeExtractor {
        record: QuoteRecord,
        calls: AtomicUsize,
        seen: Mutex<Vec<String>>,
    }

    impl FakeExtractor {
        fn returning(record: QuoteRecord) -> Self {
            Self {
                record,
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl QuoteExtractor for FakeExtractor {
        async fn extract(&self, text: &str) -> Result<QuoteRecord, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(text.to_string());
            Ok(self.record.clone())
        }
    }

    fn sample_record() -> QuoteRecord {
        let mut record = QuoteRecord::default();
        record.totals.guestroom_total = MoneyField::explicit(50000.0);
        record
    }

    fn disabled_scraper() -> ScraperClient {
        ScraperClient::new(None)
    }

    fn text_upload(filename: &str, body: &str) -> UploadedDocument {
        UploadedDocument {
            filename: filename.to_string(),
            content_type: Some("text/plain".to_string()),
            bytes: Bytes::from(body.to_string()),
        }
    }

    #[tokio::test]
    async fn test_rejects_empty_input() {
        let extractor = FakeExtractor::returning(sample_record());
        let result = run_extraction(
            &extractor,
            &disabled_scraper(),
            None,
            ExtractionInput::default(),
        )
        .await;
        assert!(matches!(result, Err(AppError::NoContent)));
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_blank_strings_count_as_absent() {
        let extractor = FakeExtractor::returning(sample_record());
        let input = ExtractionInput {
            email_content: Some("   \n".to_string()),
            proposal_url: Some(String::new()),
            ..Default::default()
        };
        let result = run_extraction(&extractor, &disabled_scraper(), None, input).await;
        assert!(matches!(result, Err(AppError::NoContent)));
    }

    #[tokio::test]
    async fn test_email_only_reports_email_source() {
        let extractor = FakeExtractor::returning(sample_record());
        let input = ExtractionInput {
            email_content: Some("Attached is our quote for the sales summit.".to_string()),
            ..Default::default()
        };
        let outcome = run_extraction(&extractor, &disabled_scraper(), None, input)
            .await
            .unwrap();
        assert_eq!(outcome.sources, vec!["email"]);
        assert_eq!(outcome.record.sources, vec!["email"]);
        assert!(outcome.urls_found.is_empty());
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_email_and_proposal_file_both_extracted() {
        let extractor = FakeExtractor::returning(sample_record());
        let input = ExtractionInput {
            email_content: Some("Quote details in the attached proposal.".to_string()),
            proposal_file: Some(text_upload("proposal.txt", "F&B minimum: $10,000")),
            ..Default::default()
        };
        let outcome = run_extraction(&extractor, &disabled_scraper(), None, input)
            .await
            .unwrap();
        assert_eq!(outcome.sources, vec!["email", "proposal_file"]);
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_email_file_supersedes_pasted_text() {
        let extractor = FakeExtractor::returning(sample_record());
        let input = ExtractionInput {
            email_content: Some(
                "Pasted body, see https://book.example.com/proposal/88".to_string(),
            ),
            email_file: Some(text_upload("thread.txt", "Forwarded quote from the file")),
            ..Default::default()
        };
        let outcome = run_extraction(&extractor, &disabled_scraper(), None, input)
            .await
            .unwrap();
        assert_eq!(outcome.sources, vec!["email_file"]);
        // The URL from the pasted body is still harvested.
        assert_eq!(
            outcome.urls_found,
            vec!["https://book.example.com/proposal/88"]
        );
        let seen = extractor.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].contains("from the file"));
        assert!(!seen[0].contains("Pasted body"));
    }

    #[tokio::test]
    async fn test_url_only_with_scraping_disabled_fails() {
        let extractor = FakeExtractor::returning(sample_record());
        let input = ExtractionInput {
            proposal_url: Some("https://events.example.com/proposal/123".to_string()),
            ..Default::default()
        };
        let result = run_extraction(&extractor, &disabled_scraper(), None, input).await;
        assert!(matches!(result, Err(AppError::Resolution(_))));
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_discovered_url_failure_is_tolerated() {
        let extractor = FakeExtractor::returning(sample_record());
        let input = ExtractionInput {
            email_content: Some(
                "Full pricing at https://book.example.com/proposal/88 per our call.".to_string(),
            ),
            ..Default::default()
        };
        let outcome = run_extraction(&extractor, &disabled_scraper(), None, input)
            .await
            .unwrap();
        assert_eq!(outcome.sources, vec!["email"]);
        assert_eq!(
            outcome.urls_found,
            vec!["https://book.example.com/proposal/88"]
        );
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_model_found_url_becomes_candidate() {
        let mut record = sample_record();
        record.extras.proposal_url = Some("https://fallback.example.com/proposal/1".to_string());
        let extractor = FakeExtractor::returning(record);
        let input = ExtractionInput {
            email_content: Some("Quote below, link was in the signature image.".to_string()),
            ..Default::default()
        };
        let outcome = run_extraction(&extractor, &disabled_scraper(), None, input)
            .await
            .unwrap();
        // The chase fails (scraping disabled) but the URL is still reported.
        assert_eq!(outcome.sources, vec!["email"]);
        assert_eq!(
            outcome.urls_found,
            vec!["https://fallback.example.com/proposal/1"]
        );
    }
}
