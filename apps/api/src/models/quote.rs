#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// One row of `quote_requests`: what the caller sent, written once per
/// completed extraction.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuoteRequestRow {
    pub id: Uuid,
    pub email_content: Option<String>,
    pub email_file_name: Option<String>,
    pub email_file_size: Option<i64>,
    pub proposal_file_name: Option<String>,
    pub proposal_file_size: Option<i64>,
    pub proposal_url: Option<String>,
    pub urls_found: Vec<String>,
    pub sources_used: Vec<String>,
    pub content_length: i64,
    pub url_scraped: bool,
    pub processing_status: String,
    pub created_at: DateTime<Utc>,
}

/// One row of `quote_results`: the flattened QuoteRecord. Column names
/// follow the pattern `<field>_<attribute>` for the four money fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct QuoteResultRow {
    pub request_id: Uuid,

    pub total_quote_status: String,
    pub total_quote_value: Option<f64>,
    pub total_quote_currency: String,
    pub total_quote_provenance: Option<String>,
    pub total_quote_notes: Option<String>,

    pub guestroom_total_status: String,
    pub guestroom_total_value: Option<f64>,
    pub guestroom_total_currency: String,
    pub guestroom_total_provenance: Option<String>,
    pub guestroom_total_notes: Option<String>,

    pub meeting_room_total_status: String,
    pub meeting_room_total_value: Option<f64>,
    pub meeting_room_total_currency: String,
    pub meeting_room_total_provenance: Option<String>,
    pub meeting_room_total_notes: Option<String>,

    pub fnb_total_status: String,
    pub fnb_total_value: Option<f64>,
    pub fnb_total_currency: String,
    pub fnb_total_provenance: Option<String>,
    pub fnb_total_notes: Option<String>,

    pub room_nights: Option<f64>,
    pub nightly_rate: Option<f64>,
    pub tax_rate_pct: Option<f64>,
    pub service_rate_pct: Option<f64>,
    pub fnb_minimum: Option<f64>,
    pub guestroom_base: Option<f64>,
    pub guestroom_taxes_fees: Option<f64>,
    pub estimated_fnb_gross: Option<f64>,
    pub proposal_url: Option<String>,
    /// JSON array of strings.
    pub effective_value_offsets: Value,

    pub program: Option<Value>,
    pub notes: Option<String>,
}

/// One row of `quote_properties`: venue contact columns plus the whole
/// property block as JSON for anything the columns miss.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PropertyRow {
    pub request_id: Uuid,
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub property_data: Value,
}

/// One row of `quote_concessions`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ConcessionRow {
    pub request_id: Uuid,
    pub concession_text: String,
}

/// One row of `quote_policies`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PolicyRow {
    pub request_id: Uuid,
    pub policies: Value,
}
