//! Extraction Oracle — the seam between the pipeline and the LLM.
//!
//! The pipeline depends on the `QuoteExtractor` trait, not on `LlmClient`,
//! so tests drive the whole request flow with a canned extractor and no
//! network. `AppState` carries an `Arc<dyn QuoteExtractor>`.

use async_trait::async_trait;
use tracing::debug;

use crate::errors::AppError;
use crate::extraction::prompts::{extraction_system_prompt, extraction_user_prompt};
use crate::extraction::quote::QuoteRecord;
use crate::llm_client::{truncate_chars, LlmClient, LlmError, MAX_CONTENT_CHARS};

/// The extraction oracle: raw document text in, one partial QuoteRecord out.
#[async_trait]
pub trait QuoteExtractor: Send + Sync {
    async fn extract(&self, text: &str) -> Result<QuoteRecord, AppError>;
}

/// Production extractor backed by the OpenAI chat client.
pub struct LlmQuoteExtractor {
    llm: LlmClient,
}

impl LlmQuoteExtractor {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl QuoteExtractor for LlmQuoteExtractor {
    async fn extract(&self, text: &str) -> Result<QuoteRecord, AppError> {
        let document = truncate_chars(text, MAX_CONTENT_CHARS);
        if document.len() < text.len() {
            debug!(
                "Document truncated from {} to {} bytes before extraction",
                text.len(),
                document.len()
            );
        }

        let system = extraction_system_prompt();
        let user = extraction_user_prompt(document);

        let mut record: QuoteRecord = self
            .llm
            .call_json(&system, &user)
            .await
            .map_err(map_llm_error)?;

        record.reconcile();
        // The model never decides input provenance; the pipeline owns sources
        record.sources.clear();
        Ok(record)
    }
}

/// Transport-level trouble is `Upstream` (the caller may retry later);
/// unusable model output is `Extraction` (retrying won't help).
fn map_llm_error(err: LlmError) -> AppError {
    match err {
        LlmError::Http(_) | LlmError::Api { .. } | LlmError::RetriesExhausted { .. } => {
            AppError::Upstream(err.to_string())
        }
        LlmError::Parse(_) | LlmError::EmptyContent => AppError::Extraction(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_errors_map_to_extraction() {
        let parse_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let mapped = map_llm_error(LlmError::Parse(parse_err));
        assert!(matches!(mapped, AppError::Extraction(_)));

        let mapped = map_llm_error(LlmError::EmptyContent);
        assert!(matches!(mapped, AppError::Extraction(_)));
    }

    #[test]
    fn test_transport_errors_map_to_upstream() {
        let mapped = map_llm_error(LlmError::Api {
            status: 500,
            message: "internal".to_string(),
        });
        assert!(matches!(mapped, AppError::Upstream(_)));

        let mapped = map_llm_error(LlmError::RetriesExhausted { retries: 3 });
        assert!(matches!(mapped, AppError::Upstream(_)));
    }
}
