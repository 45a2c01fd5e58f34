//! HTTP handlers for the extraction endpoints.

use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{Multipart, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::AppError;
use crate::extraction::content::UploadedDocument;
use crate::extraction::merge::normalize;
use crate::extraction::pipeline::{run_extraction, ExtractionInput, ExtractionOutcome};
use crate::extraction::quote::QuoteRecord;
use crate::extraction::store::fetch_recent_requests;
use crate::models::quote::QuoteRequestRow;
use crate::state::AppState;

/// Response envelope shared by `/extract` and `/extract-text`.
#[derive(Debug, Serialize)]
pub struct ExtractionResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<QuoteRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub sources: Vec<String>,
    pub urls_found: Vec<String>,
}

impl ExtractionResponse {
    fn from_outcome(outcome: ExtractionOutcome) -> Self {
        Self {
            success: true,
            data: Some(outcome.record),
            error: None,
            sources: outcome.sources,
            urls_found: outcome.urls_found,
        }
    }
}

/// POST /extract — multipart form with any mix of email text, email file,
/// proposal file, and proposal URL.
pub async fn handle_extract(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ExtractionResponse>, AppError> {
    let mut input = ExtractionInput::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_err)? {
        let Some(name) = field.name().map(|n| n.to_string()) else {
            continue;
        };
        match name.as_str() {
            "email_content" => {
                input.email_content = Some(field.text().await.map_err(multipart_err)?);
            }
            "proposal_url" => {
                input.proposal_url = Some(field.text().await.map_err(multipart_err)?);
            }
            "email_file" => {
                if let Some(doc) = read_upload(field).await? {
                    input.email_file = Some(doc);
                }
            }
            "proposal_file" => {
                if let Some(doc) = read_upload(field).await? {
                    input.proposal_file = Some(doc);
                }
            }
            other => debug!("Ignoring unknown multipart field '{other}'"),
        }
    }

    let outcome = run_extraction(
        state.extractor.as_ref(),
        &state.scraper,
        state.db.as_ref(),
        input,
    )
    .await?;
    Ok(Json(ExtractionResponse::from_outcome(outcome)))
}

fn multipart_err(err: MultipartError) -> AppError {
    AppError::Validation(format!("invalid multipart payload: {err}"))
}

/// A browser submits an unfilled `<input type="file">` as a part with no
/// filename and no body. Such parts carry nothing to extract from.
fn is_unfilled_file_part(filename: Option<&str>, bytes: &[u8]) -> bool {
    filename.map_or(true, |f| f.is_empty()) && bytes.is_empty()
}

/// Reads a file part into memory. Returns `None` for an unfilled part so
/// the caller can fall back to whichever other inputs were provided.
async fn read_upload(field: Field<'_>) -> Result<Option<UploadedDocument>, AppError> {
    let filename = field.file_name().map(|f| f.to_string());
    let content_type = field.content_type().map(|c| c.to_string());
    let bytes = field.bytes().await.map_err(|e| {
        AppError::Validation(format!(
            "failed to read upload '{}': {e}",
            filename.as_deref().unwrap_or("upload")
        ))
    })?;
    if is_unfilled_file_part(filename.as_deref(), &bytes) {
        return Ok(None);
    }
    Ok(Some(UploadedDocument {
        filename: filename
            .filter(|f| !f.is_empty())
            .unwrap_or_else(|| "upload".to_string()),
        content_type,
        bytes,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ExtractTextRequest {
    pub content: String,
}

/// POST /extract-text — extraction from a raw text body, no file handling
/// and no URL chasing.
pub async fn handle_extract_text(
    State(state): State<AppState>,
    Json(body): Json<ExtractTextRequest>,
) -> Result<Json<ExtractionResponse>, AppError> {
    if body.content.trim().is_empty() {
        return Err(AppError::Validation(
            "'content' must not be empty".to_string(),
        ));
    }
    let mut record = state.extractor.extract(&body.content).await?;
    normalize(&mut record);
    record.sources = vec!["text".to_string()];

    Ok(Json(ExtractionResponse {
        success: true,
        sources: record.sources.clone(),
        data: Some(record),
        error: None,
        urls_found: Vec::new(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    10
}

#[derive(Debug, Serialize)]
pub struct RecentRequestsResponse {
    pub success: bool,
    pub data: Vec<QuoteRequestRow>,
}

/// GET /recent-requests — the latest stored extractions, newest first.
/// Returns an empty list when persistence is disabled.
pub async fn handle_recent_requests(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<RecentRequestsResponse>, AppError> {
    let Some(pool) = state.db.as_ref() else {
        return Ok(Json(RecentRequestsResponse {
            success: true,
            data: Vec::new(),
        }));
    };
    let limit = query.limit.clamp(1, 100);
    let data = fetch_recent_requests(pool, limit).await?;
    Ok(Json(RecentRequestsResponse { success: true, data }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_envelope_omits_error() {
        let response = ExtractionResponse {
            success: true,
            data: Some(QuoteRecord::default()),
            error: None,
            sources: vec!["text".to_string()],
            urls_found: Vec::new(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], true);
        assert!(json.get("error").is_none());
        assert!(json.get("data").is_some());
    }

    #[test]
    fn test_recent_query_defaults_to_ten() {
        let query: RecentQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.limit, 10);
    }

    #[test]
    fn test_unfilled_file_part_is_skipped() {
        assert!(is_unfilled_file_part(None, b""));
        assert!(is_unfilled_file_part(Some(""), b""));
        // A named-but-empty file is a real user mistake, not an unfilled input.
        assert!(!is_unfilled_file_part(Some("quote.pdf"), b""));
        assert!(!is_unfilled_file_part(None, b"%PDF-1.7"));
    }
}
