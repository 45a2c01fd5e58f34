//! Canonical quote schema shared by the oracle, the merge step, the HTTP
//! response and the persistence layer.
//!
//! Every block tolerates absence (`serde(default)`) and every numeric field
//! tolerates the model answering with a formatted string ("$12,500", "8.45%").
//! Deserialization never fails on sloppy-but-usable output; it fails on
//! structurally broken JSON, which the oracle surfaces as an extraction error.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Provenance classification for an extracted value.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FieldStatus {
    Explicit,
    Derived,
    Conditional,
    #[default]
    #[serde(other)]
    NotFound,
}

impl FieldStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldStatus::Explicit => "explicit",
            FieldStatus::Derived => "derived",
            FieldStatus::Conditional => "conditional",
            FieldStatus::NotFound => "not_found",
        }
    }

    /// Parses a stored status string; unknown values fall back to `not_found`.
    pub fn parse(s: &str) -> Self {
        match s {
            "explicit" => FieldStatus::Explicit,
            "derived" => FieldStatus::Derived,
            "conditional" => FieldStatus::Conditional,
            _ => FieldStatus::NotFound,
        }
    }
}

/// One monetary figure with provenance.
///
/// Invariant: `not_found` implies no usable value; `explicit`/`derived`
/// imply a value; `conditional` may carry either (a waived fee has a
/// condition, not an amount). `reconcile` restores the invariant after
/// deserializing model output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MoneyField {
    #[serde(default)]
    pub status: FieldStatus,
    #[serde(default, deserialize_with = "de_lenient_number")]
    pub value: Option<f64>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub provenance_snippet: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Default for MoneyField {
    fn default() -> Self {
        Self {
            status: FieldStatus::NotFound,
            value: None,
            currency: default_currency(),
            provenance_snippet: None,
            notes: None,
        }
    }
}

impl MoneyField {
    pub fn explicit(value: f64) -> Self {
        Self {
            status: FieldStatus::Explicit,
            value: Some(value),
            ..Default::default()
        }
    }

    pub fn derived(value: f64, notes: impl Into<String>) -> Self {
        Self {
            status: FieldStatus::Derived,
            value: Some(value),
            notes: Some(notes.into()),
            ..Default::default()
        }
    }

    pub fn not_found() -> Self {
        Self::default()
    }

    pub fn is_found(&self) -> bool {
        self.status != FieldStatus::NotFound
    }

    /// True when no usable amount is present. Zero counts as unstated:
    /// models emit 0 for "not in the document" often enough that a zero
    /// total is never trusted as a real figure.
    pub fn lacks_amount(&self) -> bool {
        match self.value {
            Some(v) => v == 0.0,
            None => true,
        }
    }

    /// Restores the status/value invariant: a nonzero value under
    /// `not_found` promotes to `explicit` (the evidence wins), a zero under
    /// `not_found` is dropped (models emit 0 for "absent"), and an
    /// `explicit`/`derived` status without a value demotes to `not_found`.
    /// `conditional` is left alone in both directions.
    pub fn reconcile(&mut self) {
        match (self.status, self.value) {
            (FieldStatus::NotFound, Some(v)) if v != 0.0 => {
                self.status = FieldStatus::Explicit;
            }
            (FieldStatus::NotFound, Some(_)) => {
                self.value = None;
            }
            (FieldStatus::Explicit | FieldStatus::Derived, None) => {
                self.status = FieldStatus::NotFound;
            }
            _ => {}
        }
    }
}

/// The four headline figures of a quote.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QuoteTotals {
    #[serde(default)]
    pub total_quote: MoneyField,
    #[serde(default)]
    pub guestroom_total: MoneyField,
    #[serde(default)]
    pub meeting_room_total: MoneyField,
    #[serde(default)]
    pub fnb_total: MoneyField,
}

/// Supporting numbers and knobs that feed the derivations.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QuoteExtras {
    #[serde(default, deserialize_with = "de_lenient_number")]
    pub room_nights: Option<f64>,
    #[serde(default, deserialize_with = "de_lenient_number")]
    pub nightly_rate: Option<f64>,
    #[serde(default, deserialize_with = "de_lenient_number")]
    pub tax_rate_pct: Option<f64>,
    #[serde(default, deserialize_with = "de_lenient_number")]
    pub service_rate_pct: Option<f64>,
    #[serde(default, deserialize_with = "de_lenient_number")]
    pub fnb_minimum: Option<f64>,
    #[serde(default, deserialize_with = "de_lenient_number")]
    pub guestroom_base: Option<f64>,
    #[serde(default, deserialize_with = "de_lenient_number")]
    pub guestroom_taxes_fees: Option<f64>,
    #[serde(default, deserialize_with = "de_lenient_number")]
    pub estimated_fnb_gross: Option<f64>,
    #[serde(default)]
    pub proposal_url: Option<String>,
    /// Clauses that change the effective value of the quote without moving
    /// a total (comp room credits, attrition relief, rebates).
    #[serde(default)]
    pub effective_value_offsets: Vec<String>,
}

/// Venue contact details as stated in the document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PropertyInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub contact_phone: Option<String>,
}

/// The full structured extraction result for one request.
///
/// Constructed fresh per request and never mutated after being returned;
/// persistence writes an immutable snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QuoteRecord {
    #[serde(default)]
    pub property: Option<PropertyInfo>,
    /// Event program details (dates, attendance, room block) as free-form
    /// JSON; the merge step carries it whole, never field-by-field.
    #[serde(default)]
    pub program: Option<Value>,
    #[serde(default)]
    pub totals: QuoteTotals,
    #[serde(default)]
    pub extras: QuoteExtras,
    #[serde(default, deserialize_with = "de_concessions")]
    pub concessions: Vec<String>,
    #[serde(default)]
    pub policies: Option<Value>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Which inputs contributed, e.g. ["email", "proposal_file"].
    /// Never reported by the model; the pipeline owns this list.
    #[serde(default)]
    pub sources: Vec<String>,
}

impl QuoteRecord {
    /// Applies `MoneyField::reconcile` to all four totals.
    pub fn reconcile(&mut self) {
        self.totals.total_quote.reconcile();
        self.totals.guestroom_total.reconcile();
        self.totals.meeting_room_total.reconcile();
        self.totals.fnb_total.reconcile();
    }
}

fn default_currency() -> String {
    "USD".to_string()
}

/// Accepts a JSON number, a formatted string ("$12,500.50", "8.45%"), or
/// null. Unparseable strings become `None` rather than a deserialize error.
fn de_lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(value_to_f64))
}

fn value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| !matches!(c, '$' | ',' | '%') && !c.is_whitespace())
                .collect();
            if cleaned.is_empty() {
                None
            } else {
                cleaned.parse::<f64>().ok()
            }
        }
        _ => None,
    }
}

/// Accepts concessions as plain strings or as objects carrying a `text`
/// (or `description`) key; anything else is dropped.
fn de_concessions<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<Value>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|v| match v {
            Value::String(s) => Some(s),
            Value::Object(mut map) => map
                .remove("text")
                .or_else(|| map.remove("description"))
                .and_then(|t| t.as_str().map(|s| s.to_string())),
            _ => None,
        })
        .filter(|s| !s.trim().is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_PAYLOAD: &str = r#"{
        "property": {
            "name": "Harborview Grand",
            "address": "200 Seawall Blvd, Galveston, TX",
            "contact_name": "Dana Reyes",
            "contact_email": "dreyes@harborview.example"
        },
        "program": {"event_dates": "2026-03-12 to 2026-03-15", "attendees": 250},
        "totals": {
            "total_quote": {"status": "explicit", "value": 68447.8, "provenance_snippet": "Total program investment: $68,447.80"},
            "guestroom_total": {"status": "explicit", "value": "$50,000"},
            "meeting_room_total": {"status": "conditional", "value": 5000, "notes": "Waived if F&B minimum is met"},
            "fnb_total": {"status": "not_found"}
        },
        "extras": {
            "room_nights": 400,
            "nightly_rate": "125",
            "tax_rate_pct": "8.45%",
            "service_rate_pct": 24,
            "fnb_minimum": 10000
        },
        "concessions": ["Comp WiFi in guestrooms", {"text": "1 per 40 comp room policy"}],
        "policies": {"cancellation": "90 days sliding scale"},
        "notes": "Rates valid through decision date."
    }"#;

    #[test]
    fn test_money_field_default_is_not_found() {
        let field = MoneyField::default();
        assert_eq!(field.status, FieldStatus::NotFound);
        assert_eq!(field.value, None);
        assert_eq!(field.currency, "USD");
        assert!(field.lacks_amount());
        assert!(!field.is_found());
    }

    #[test]
    fn test_full_payload_deserializes() {
        let record: QuoteRecord = serde_json::from_str(FULL_PAYLOAD).unwrap();
        assert_eq!(record.totals.total_quote.value, Some(68447.8));
        assert_eq!(record.totals.guestroom_total.value, Some(50000.0));
        assert_eq!(
            record.totals.meeting_room_total.status,
            FieldStatus::Conditional
        );
        assert_eq!(record.extras.tax_rate_pct, Some(8.45));
        assert_eq!(record.extras.nightly_rate, Some(125.0));
        assert_eq!(record.concessions.len(), 2);
        assert_eq!(record.concessions[1], "1 per 40 comp room policy");
        assert_eq!(
            record.property.as_ref().unwrap().name.as_deref(),
            Some("Harborview Grand")
        );
        assert!(record.sources.is_empty());
    }

    #[test]
    fn test_empty_object_deserializes_to_default() {
        let record: QuoteRecord = serde_json::from_str("{}").unwrap();
        assert_eq!(record, QuoteRecord::default());
    }

    #[test]
    fn test_unknown_status_falls_back_to_not_found() {
        let field: MoneyField =
            serde_json::from_str(r#"{"status": "approximate", "value": 12}"#).unwrap();
        assert_eq!(field.status, FieldStatus::NotFound);
    }

    #[test]
    fn test_lenient_number_rejects_garbage() {
        let field: MoneyField =
            serde_json::from_str(r#"{"status": "explicit", "value": "TBD"}"#).unwrap();
        assert_eq!(field.value, None);
    }

    #[test]
    fn test_reconcile_promotes_valued_not_found() {
        let mut field: MoneyField =
            serde_json::from_str(r#"{"status": "not_found", "value": "$1,200"}"#).unwrap();
        field.reconcile();
        assert_eq!(field.status, FieldStatus::Explicit);
        assert_eq!(field.value, Some(1200.0));
    }

    #[test]
    fn test_reconcile_clears_zero_under_not_found() {
        let mut field: MoneyField =
            serde_json::from_str(r#"{"status": "not_found", "value": 0}"#).unwrap();
        field.reconcile();
        assert_eq!(field.status, FieldStatus::NotFound);
        assert_eq!(field.value, None);
    }

    #[test]
    fn test_reconcile_demotes_valueless_explicit() {
        let mut field: MoneyField =
            serde_json::from_str(r#"{"status": "explicit"}"#).unwrap();
        field.reconcile();
        assert_eq!(field.status, FieldStatus::NotFound);
    }

    #[test]
    fn test_reconcile_leaves_conditional_alone() {
        let mut field: MoneyField =
            serde_json::from_str(r#"{"status": "conditional", "notes": "waived"}"#).unwrap();
        field.reconcile();
        assert_eq!(field.status, FieldStatus::Conditional);
    }

    #[test]
    fn test_zero_value_lacks_amount() {
        let field = MoneyField {
            status: FieldStatus::Explicit,
            value: Some(0.0),
            ..Default::default()
        };
        assert!(field.lacks_amount());
    }

    #[test]
    fn test_status_string_round_trip() {
        for status in [
            FieldStatus::Explicit,
            FieldStatus::Derived,
            FieldStatus::Conditional,
            FieldStatus::NotFound,
        ] {
            assert_eq!(FieldStatus::parse(status.as_str()), status);
        }
        assert_eq!(FieldStatus::parse("garbage"), FieldStatus::NotFound);
    }
}
