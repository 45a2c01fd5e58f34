//! Merge/Normalize — combines an email-derived and a proposal-derived
//! record into one, then computes derived totals and conditional statuses.
//!
//! Precedence: the proposal is the authoritative, itemized source; the
//! email is a summary. Field by field, a found proposal value wins,
//! otherwise the email value is taken, otherwise the field stays
//! `not_found`. Every precedence decision lives here so it can be audited
//! and tested without a model in the loop.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::extraction::quote::{FieldStatus, MoneyField, QuoteExtras, QuoteRecord, QuoteTotals};

// ────────────────────────────────────────────────────────────────────────────
// Merge
// ────────────────────────────────────────────────────────────────────────────

/// Merges up to two partial records and normalizes the result. `None` on
/// both sides means there is nothing to merge; callers treat that as an
/// upstream extraction failure, not as an empty record.
pub fn merge_quotes(
    proposal: Option<QuoteRecord>,
    email: Option<QuoteRecord>,
) -> Option<QuoteRecord> {
    let mut merged = match (proposal, email) {
        (Some(p), Some(e)) => merge_pair(p, e),
        (Some(p), None) => p,
        (None, Some(e)) => e,
        (None, None) => return None,
    };
    normalize(&mut merged);
    Some(merged)
}

fn merge_pair(proposal: QuoteRecord, email: QuoteRecord) -> QuoteRecord {
    QuoteRecord {
        property: proposal.property.or(email.property),
        program: proposal.program.or(email.program),
        totals: QuoteTotals {
            total_quote: prefer_field(proposal.totals.total_quote, email.totals.total_quote),
            guestroom_total: prefer_field(
                proposal.totals.guestroom_total,
                email.totals.guestroom_total,
            ),
            meeting_room_total: prefer_field(
                proposal.totals.meeting_room_total,
                email.totals.meeting_room_total,
            ),
            fnb_total: prefer_field(proposal.totals.fnb_total, email.totals.fnb_total),
        },
        extras: merge_extras(proposal.extras, email.extras),
        concessions: union_preserving_order(proposal.concessions, email.concessions),
        policies: proposal.policies.or(email.policies),
        notes: proposal.notes.or(email.notes),
        // The pipeline fills this in from what actually resolved
        sources: Vec::new(),
    }
}

/// Field-level precedence: a found proposal value wins outright; the email
/// value is only consulted when the proposal has nothing.
fn prefer_field(proposal: MoneyField, email: MoneyField) -> MoneyField {
    if proposal.is_found() || !email.is_found() {
        proposal
    } else {
        email
    }
}

fn merge_extras(proposal: QuoteExtras, email: QuoteExtras) -> QuoteExtras {
    QuoteExtras {
        room_nights: proposal.room_nights.or(email.room_nights),
        nightly_rate: proposal.nightly_rate.or(email.nightly_rate),
        tax_rate_pct: proposal.tax_rate_pct.or(email.tax_rate_pct),
        service_rate_pct: proposal.service_rate_pct.or(email.service_rate_pct),
        fnb_minimum: proposal.fnb_minimum.or(email.fnb_minimum),
        guestroom_base: proposal.guestroom_base.or(email.guestroom_base),
        guestroom_taxes_fees: proposal.guestroom_taxes_fees.or(email.guestroom_taxes_fees),
        estimated_fnb_gross: proposal.estimated_fnb_gross.or(email.estimated_fnb_gross),
        proposal_url: proposal.proposal_url.or(email.proposal_url),
        effective_value_offsets: union_preserving_order(
            proposal.effective_value_offsets,
            email.effective_value_offsets,
        ),
    }
}

fn union_preserving_order(primary: Vec<String>, secondary: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    primary
        .into_iter()
        .chain(secondary)
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Normalize
// ────────────────────────────────────────────────────────────────────────────

/// Runs the derivation passes in dependency order: guestroom and F&B
/// before the grand total (which sums them), waiver flagging before the
/// total as well so a freshly flagged conditional fee still contributes
/// its stated amount.
pub fn normalize(record: &mut QuoteRecord) {
    derive_guestroom_total(record);
    derive_fnb_total(record);
    flag_conditional_meeting_room(record);
    derive_total_quote(record);
}

/// guestroom_total = guestroom_base + guestroom_taxes_fees when the model
/// itemized the room block but never stated the roll-up.
fn derive_guestroom_total(record: &mut QuoteRecord) {
    let field = &mut record.totals.guestroom_total;
    if !field.lacks_amount() || field.status == FieldStatus::Conditional {
        return;
    }
    let Some(base) = record.extras.guestroom_base else {
        return;
    };
    if base <= 0.0 {
        return;
    }

    let taxes = record.extras.guestroom_taxes_fees.unwrap_or(0.0);
    let mut derived = MoneyField::derived(
        base + taxes,
        format!("Computed from guestroom base {base} plus taxes/fees {taxes}"),
    );
    derived.currency = field.currency.clone();
    *field = derived;
}

/// fnb_total falls back to the estimated gross: the model's own estimate
/// when it produced one, otherwise the minimum grossed up by service
/// charge and tax. A computed estimate is written back to the extras so
/// the grand total (and callers) see one consistent figure.
fn derive_fnb_total(record: &mut QuoteRecord) {
    let field = &mut record.totals.fnb_total;
    if !field.lacks_amount() || field.status == FieldStatus::Conditional {
        return;
    }

    if let Some(gross) = record.extras.estimated_fnb_gross {
        if gross > 0.0 {
            let mut derived = MoneyField::derived(
                gross,
                "Estimated F&B gross (minimum plus service charge and tax)",
            );
            derived.currency = field.currency.clone();
            *field = derived;
            return;
        }
    }

    let Some(minimum) = record.extras.fnb_minimum else {
        return;
    };
    if minimum <= 0.0 {
        return;
    }
    let service_rate = record.extras.service_rate_pct.unwrap_or(0.0);
    let tax_rate = record.extras.tax_rate_pct.unwrap_or(0.0);
    if service_rate <= 0.0 && tax_rate <= 0.0 {
        return;
    }

    let estimate = estimate_fnb_gross(minimum, service_rate, tax_rate);
    record.extras.estimated_fnb_gross = Some(estimate.gross);
    let mut derived = MoneyField::derived(
        estimate.gross,
        format!(
            "Estimated from F&B minimum {minimum} with {service_rate}% service charge and {tax_rate}% tax"
        ),
    );
    derived.currency = field.currency.clone();
    *field = derived;
}

/// total_quote = guestroom + meeting room + F&B when no explicit grand
/// total was stated. The F&B component prefers the estimated gross over a
/// bare fnb_total so the sum includes service charge and tax.
fn derive_total_quote(record: &mut QuoteRecord) {
    let field = &record.totals.total_quote;
    if !field.lacks_amount() || field.status == FieldStatus::Conditional {
        return;
    }

    let guestroom = record.totals.guestroom_total.value;
    let meeting = record.totals.meeting_room_total.value;
    let fnb = record
        .extras
        .estimated_fnb_gross
        .or(record.totals.fnb_total.value);

    let components = [guestroom, meeting, fnb];
    if components.iter().all(|c| c.map_or(true, |v| v == 0.0)) {
        return;
    }

    let total: f64 = components.iter().copied().flatten().sum();
    let mut derived = MoneyField::derived(
        total,
        format!(
            "Computed as guestroom total ({}) + meeting room ({}) + F&B ({})",
            guestroom.unwrap_or(0.0),
            meeting.unwrap_or(0.0),
            fnb.unwrap_or(0.0)
        ),
    );
    derived.currency = record.totals.total_quote.currency.clone();
    record.totals.total_quote = derived;
}

// ────────────────────────────────────────────────────────────────────────────
// F&B gross estimation
// ────────────────────────────────────────────────────────────────────────────

/// Breakdown of the F&B gross-up computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FnbEstimate {
    pub service_charge: f64,
    pub tax_on_service: f64,
    pub tax_on_fnb: f64,
    pub gross: f64,
}

/// Grosses an F&B minimum up by service charge and tax. Tax applies both
/// to the minimum and to the service charge (the service charge is itself
/// taxable). Percentages are out of 100.
pub fn estimate_fnb_gross(
    fnb_minimum: f64,
    service_rate_pct: f64,
    tax_rate_pct: f64,
) -> FnbEstimate {
    let service_charge = fnb_minimum * service_rate_pct / 100.0;
    let tax_on_service = service_charge * tax_rate_pct / 100.0;
    let tax_on_fnb = fnb_minimum * tax_rate_pct / 100.0;
    FnbEstimate {
        service_charge,
        tax_on_service,
        tax_on_fnb,
        gross: fnb_minimum + service_charge + tax_on_service + tax_on_fnb,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Conditional meeting-room flagging
// ────────────────────────────────────────────────────────────────────────────

static WAIVER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bwaiv").unwrap());
static MINIMUM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bminimum\b").unwrap());
static MEETING_ROOM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bmeeting\s*(room|space)").unwrap());

/// A meeting-room fee "waived if the F&B minimum is met" is not a firm
/// charge. When waiver-plus-minimum language shows up in the field's own
/// notes or provenance, or in a concession line naming the meeting room,
/// the field is reclassified as conditional and the clause is kept.
fn flag_conditional_meeting_room(record: &mut QuoteRecord) {
    let field = &mut record.totals.meeting_room_total;
    if field.status == FieldStatus::Conditional {
        return;
    }

    let own_text = [field.notes.as_deref(), field.provenance_snippet.as_deref()];
    if own_text
        .iter()
        .flatten()
        .any(|text| WAIVER_RE.is_match(text) && MINIMUM_RE.is_match(text))
    {
        field.status = FieldStatus::Conditional;
        return;
    }

    let clause = record.concessions.iter().find(|line| {
        MEETING_ROOM_RE.is_match(line) && WAIVER_RE.is_match(line) && MINIMUM_RE.is_match(line)
    });
    if let Some(clause) = clause {
        field.status = FieldStatus::Conditional;
        if field.notes.is_none() {
            field.notes = Some(clause.clone());
        }
    }
}
