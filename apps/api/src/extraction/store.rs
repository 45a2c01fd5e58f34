#![allow(dead_code)]

//! Write-once persistence of completed extractions.
//!
//! Five tables keyed by request id: request metadata, the flattened
//! QuoteRecord, property contact info, one row per concession, and the
//! policies blob. Rows are inserted once per completed request and never
//! updated. Storage is best-effort: the pipeline logs a failure and the
//! response still succeeds.

use anyhow::Result;
use serde_json::Value;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::extraction::quote::{
    FieldStatus, MoneyField, PropertyInfo, QuoteExtras, QuoteRecord, QuoteTotals,
};
use crate::models::quote::{ConcessionRow, PolicyRow, PropertyRow, QuoteRequestRow, QuoteResultRow};

/// Request metadata captured before resolution begins, so the stored row
/// reflects what the caller actually sent.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub email_content: Option<String>,
    pub email_file_name: Option<String>,
    pub email_file_size: Option<i64>,
    pub proposal_file_name: Option<String>,
    pub proposal_file_size: Option<i64>,
    pub proposal_url: Option<String>,
}

/// Inserts the full snapshot of one completed request and returns its id.
pub async fn store_completed_request(
    pool: &PgPool,
    meta: &RequestMeta,
    record: &QuoteRecord,
    urls_found: &[String],
) -> Result<Uuid> {
    let request_id = Uuid::new_v4();
    let url_scraped = record.sources.iter().any(|s| s == "proposal_url");
    let content_length = meta
        .email_content
        .as_deref()
        .map(|c| c.len() as i64)
        .unwrap_or(0);

    // 1. Request metadata
    sqlx::query(
        r#"
        INSERT INTO quote_requests
            (id, email_content, email_file_name, email_file_size,
             proposal_file_name, proposal_file_size, proposal_url,
             urls_found, sources_used, content_length, url_scraped,
             processing_status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 'completed')
        "#,
    )
    .bind(request_id)
    .bind(&meta.email_content)
    .bind(&meta.email_file_name)
    .bind(meta.email_file_size)
    .bind(&meta.proposal_file_name)
    .bind(meta.proposal_file_size)
    .bind(&meta.proposal_url)
    .bind(urls_found)
    .bind(&record.sources)
    .bind(content_length)
    .bind(url_scraped)
    .execute(pool)
    .await?;

    // 2. The flattened record
    let row = flatten_record(request_id, record);
    sqlx::query(
        r#"
        INSERT INTO quote_results
            (request_id,
             total_quote_status, total_quote_value, total_quote_currency,
             total_quote_provenance, total_quote_notes,
             guestroom_total_status, guestroom_total_value, guestroom_total_currency,
             guestroom_total_provenance, guestroom_total_notes,
             meeting_room_total_status, meeting_room_total_value, meeting_room_total_currency,
             meeting_room_total_provenance, meeting_room_total_notes,
             fnb_total_status, fnb_total_value, fnb_total_currency,
             fnb_total_provenance, fnb_total_notes,
             room_nights, nightly_rate, tax_rate_pct, service_rate_pct,
             fnb_minimum, guestroom_base, guestroom_taxes_fees, estimated_fnb_gross,
             proposal_url, effective_value_offsets, program, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28,
                $29, $30, $31, $32, $33)
        "#,
    )
    .bind(row.request_id)
    .bind(&row.total_quote_status)
    .bind(row.total_quote_value)
    .bind(&row.total_quote_currency)
    .bind(&row.total_quote_provenance)
    .bind(&row.total_quote_notes)
    .bind(&row.guestroom_total_status)
    .bind(row.guestroom_total_value)
    .bind(&row.guestroom_total_currency)
    .bind(&row.guestroom_total_provenance)
    .bind(&row.guestroom_total_notes)
    .bind(&row.meeting_room_total_status)
    .bind(row.meeting_room_total_value)
    .bind(&row.meeting_room_total_currency)
    .bind(&row.meeting_room_total_provenance)
    .bind(&row.meeting_room_total_notes)
    .bind(&row.fnb_total_status)
    .bind(row.fnb_total_value)
    .bind(&row.fnb_total_currency)
    .bind(&row.fnb_total_provenance)
    .bind(&row.fnb_total_notes)
    .bind(row.room_nights)
    .bind(row.nightly_rate)
    .bind(row.tax_rate_pct)
    .bind(row.service_rate_pct)
    .bind(row.fnb_minimum)
    .bind(row.guestroom_base)
    .bind(row.guestroom_taxes_fees)
    .bind(row.estimated_fnb_gross)
    .bind(&row.proposal_url)
    .bind(&row.effective_value_offsets)
    .bind(&row.program)
    .bind(&row.notes)
    .execute(pool)
    .await?;

    // 3. Property contact info
    if let Some(property) = &record.property {
        sqlx::query(
            r#"
            INSERT INTO quote_properties
                (request_id, name, address, phone, website,
                 contact_name, contact_email, contact_phone, property_data)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(request_id)
        .bind(&property.name)
        .bind(&property.address)
        .bind(&property.phone)
        .bind(&property.website)
        .bind(&property.contact_name)
        .bind(&property.contact_email)
        .bind(&property.contact_phone)
        .bind(serde_json::to_value(property)?)
        .execute(pool)
        .await?;
    }

    // 4. Concessions, one row each
    for concession in &record.concessions {
        sqlx::query("INSERT INTO quote_concessions (request_id, concession_text) VALUES ($1, $2)")
            .bind(request_id)
            .bind(concession)
            .execute(pool)
            .await?;
    }

    // 5. Policies blob
    if let Some(policies) = &record.policies {
        sqlx::query("INSERT INTO quote_policies (request_id, policies) VALUES ($1, $2)")
            .bind(request_id)
            .bind(policies)
            .execute(pool)
            .await?;
    }

    info!("Stored completed request {request_id}");
    Ok(request_id)
}

/// Most recent requests, newest first.
pub async fn fetch_recent_requests(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<QuoteRequestRow>, sqlx::Error> {
    sqlx::query_as::<_, QuoteRequestRow>(
        "SELECT * FROM quote_requests ORDER BY created_at DESC LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Flattens a QuoteRecord into the `quote_results` column layout.
pub fn flatten_record(request_id: Uuid, record: &QuoteRecord) -> QuoteResultRow {
    let total = &record.totals.total_quote;
    let guestroom = &record.totals.guestroom_total;
    let meeting = &record.totals.meeting_room_total;
    let fnb = &record.totals.fnb_total;
    let extras = &record.extras;

    QuoteResultRow {
        request_id,

        total_quote_status: total.status.as_str().to_string(),
        total_quote_value: total.value,
        total_quote_currency: total.currency.clone(),
        total_quote_provenance: total.provenance_snippet.clone(),
        total_quote_notes: total.notes.clone(),

        guestroom_total_status: guestroom.status.as_str().to_string(),
        guestroom_total_value: guestroom.value,
        guestroom_total_currency: guestroom.currency.clone(),
        guestroom_total_provenance: guestroom.provenance_snippet.clone(),
        guestroom_total_notes: guestroom.notes.clone(),

        meeting_room_total_status: meeting.status.as_str().to_string(),
        meeting_room_total_value: meeting.value,
        meeting_room_total_currency: meeting.currency.clone(),
        meeting_room_total_provenance: meeting.provenance_snippet.clone(),
        meeting_room_total_notes: meeting.notes.clone(),

        fnb_total_status: fnb.status.as_str().to_string(),
        fnb_total_value: fnb.value,
        fnb_total_currency: fnb.currency.clone(),
        fnb_total_provenance: fnb.provenance_snippet.clone(),
        fnb_total_notes: fnb.notes.clone(),

        room_nights: extras.room_nights,
        nightly_rate: extras.nightly_rate,
        tax_rate_pct: extras.tax_rate_pct,
        service_rate_pct: extras.service_rate_pct,
        fnb_minimum: extras.fnb_minimum,
        guestroom_base: extras.guestroom_base,
        guestroom_taxes_fees: extras.guestroom_taxes_fees,
        estimated_fnb_gross: extras.estimated_fnb_gross,
        proposal_url: extras.proposal_url.clone(),
        effective_value_offsets: Value::from(extras.effective_value_offsets.clone()),

        program: record.program.clone(),
        notes: record.notes.clone(),
    }
}

/// Rebuilds a QuoteRecord from its persisted pieces. Inverse of
/// `flatten_record` plus the three side tables.
pub fn reconstruct_record(
    row: &QuoteResultRow,
    property: Option<&PropertyRow>,
    concessions: &[ConcessionRow],
    policies: Option<&PolicyRow>,
    sources: Vec<String>,
) -> QuoteRecord {
    QuoteRecord {
        property: property.map(|p| PropertyInfo {
            name: p.name.clone(),
            address: p.address.clone(),
            phone: p.phone.clone(),
            website: p.website.clone(),
            contact_name: p.contact_name.clone(),
            contact_email: p.contact_email.clone(),
            contact_phone: p.contact_phone.clone(),
        }),
        program: row.program.clone(),
        totals: QuoteTotals {
            total_quote: money_from_columns(
                &row.total_quote_status,
                row.total_quote_value,
                &row.total_quote_currency,
                &row.total_quote_provenance,
                &row.total_quote_notes,
            ),
            guestroom_total: money_from_columns(
                &row.guestroom_total_status,
                row.guestroom_total_value,
                &row.guestroom_total_currency,
                &row.guestroom_total_provenance,
                &row.guestroom_total_notes,
            ),
            meeting_room_total: money_from_columns(
                &row.meeting_room_total_status,
                row.meeting_room_total_value,
                &row.meeting_room_total_currency,
                &row.meeting_room_total_provenance,
                &row.meeting_room_total_notes,
            ),
            fnb_total: money_from_columns(
                &row.fnb_total_status,
                row.fnb_total_value,
                &row.fnb_total_currency,
                &row.fnb_total_provenance,
                &row.fnb_total_notes,
            ),
        },
        extras: QuoteExtras {
            room_nights: row.room_nights,
            nightly_rate: row.nightly_rate,
            tax_rate_pct: row.tax_rate_pct,
            service_rate_pct: row.service_rate_pct,
            fnb_minimum: row.fnb_minimum,
            guestroom_base: row.guestroom_base,
            guestroom_taxes_fees: row.guestroom_taxes_fees,
            estimated_fnb_gross: row.estimated_fnb_gross,
            proposal_url: row.proposal_url.clone(),
            effective_value_offsets: offsets_from_value(&row.effective_value_offsets),
        },
        concessions: concessions
            .iter()
            .map(|c| c.concession_text.clone())
            .collect(),
        policies: policies.map(|p| p.policies.clone()),
        notes: row.notes.clone(),
        sources,
    }
}

fn money_from_columns(
    status: &str,
    value: Option<f64>,
    currency: &str,
    provenance: &Option<String>,
    notes: &Option<String>,
) -> MoneyField {
    MoneyField {
        status: FieldStatus::parse(status),
        value,
        currency: currency.to_string(),
        provenance_snippet: provenance.clone(),
        notes: notes.clone(),
    }
}

fn offsets_from_value(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(|s| s.to_string()))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_record() -> QuoteRecord {
        let mut record = QuoteRecord::default();
        record.property = Some(PropertyInfo {
            name: Some("Harborview Grand".to_string()),
            contact_email: Some("dreyes@harborview.example".to_string()),
            ..Default::default()
        });
        record.program = Some(json!({"attendees": 250}));
        record.totals.total_quote = MoneyField::derived(68447.8, "Computed from components");
        record.totals.guestroom_total = MoneyField::explicit(50000.0);
        record.totals.meeting_room_total = MoneyField {
            status: FieldStatus::Conditional,
            value: Some(5000.0),
            notes: Some("Waived if F&B minimum is met".to_string()),
            ..Default::default()
        };
        record.extras.fnb_minimum = Some(10000.0);
        record.extras.estimated_fnb_gross = Some(13447.8);
        record.extras.effective_value_offsets = vec!["1 per 40 comp rooms".to_string()];
        record.concessions = vec!["Comp WiFi".to_string(), "Late checkout".to_string()];
        record.policies = Some(json!({"cancellation": "90 day sliding scale"}));
        record.notes = Some("Rates valid through decision date".to_string());
        record.sources = vec!["proposal_file".to_string(), "email".to_string()];
        record
    }

    #[test]
    fn test_flatten_reconstruct_round_trip() {
        let record = sample_record();
        let request_id = Uuid::new_v4();

        let row = flatten_record(request_id, &record);
        let property_row = PropertyRow {
            request_id,
            name: record.property.as_ref().unwrap().name.clone(),
            address: None,
            phone: None,
            website: None,
            contact_name: None,
            contact_email: record.property.as_ref().unwrap().contact_email.clone(),
            contact_phone: None,
            property_data: serde_json::to_value(record.property.as_ref().unwrap()).unwrap(),
        };
        let concession_rows: Vec<ConcessionRow> = record
            .concessions
            .iter()
            .map(|text| ConcessionRow {
                request_id,
                concession_text: text.clone(),
            })
            .collect();
        let policy_row = PolicyRow {
            request_id,
            policies: record.policies.clone().unwrap(),
        };

        let rebuilt = reconstruct_record(
            &row,
            Some(&property_row),
            &concession_rows,
            Some(&policy_row),
            record.sources.clone(),
        );
        assert_eq!(rebuilt, record);
    }

    #[test]
    fn test_flatten_uses_status_strings() {
        let record = sample_record();
        let row = flatten_record(Uuid::new_v4(), &record);
        assert_eq!(row.total_quote_status, "derived");
        assert_eq!(row.guestroom_total_status, "explicit");
        assert_eq!(row.meeting_room_total_status, "conditional");
        assert_eq!(row.fnb_total_status, "not_found");
        assert_eq!(
            row.effective_value_offsets,
            json!(["1 per 40 comp rooms"])
        );
    }

    #[test]
    fn test_offsets_survive_malformed_json() {
        assert!(offsets_from_value(&json!("not an array")).is_empty());
        assert_eq!(
            offsets_from_value(&json!(["a", 7, "b"])),
            vec!["a".to_string(), "b".to_string()]
        );
    }
}
