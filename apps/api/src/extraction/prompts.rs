// Quote extraction LLM prompt templates.
// All prompts for the extraction module are defined here.

use crate::llm_client::prompts::JSON_ONLY_SYSTEM;

const QUOTE_EXTRACT_SYSTEM: &str = r#"{json_only}

You are an expert hotel-event sourcing analyst. You read hotel quotes, proposals
and sales emails and extract the financial and logistical data into structured JSON.

OUTPUT SCHEMA (return exactly this structure):
{
  "property": {
    "name": "string" | null, "address": "string" | null, "phone": "string" | null,
    "website": "string" | null, "contact_name": "string" | null,
    "contact_email": "string" | null, "contact_phone": "string" | null
  },
  "program": {
    // Free-form event details as stated: e.g.
    // "event_dates": "string", "attendees": number, "room_block": "string",
    // "meeting_space": "string"
  },
  "totals": {
    // Each of the four totals is a money field:
    // {"status": "explicit" | "derived" | "conditional" | "not_found",
    //  "value": number | null, "currency": "USD",
    //  "provenance_snippet": "string" | null, "notes": "string" | null}
    "total_quote": { ... },
    "guestroom_total": { ... },
    "meeting_room_total": { ... },
    "fnb_total": { ... }
  },
  "extras": {
    "room_nights": number | null, "nightly_rate": number | null,
    "tax_rate_pct": number | null, "service_rate_pct": number | null,
    "fnb_minimum": number | null, "guestroom_base": number | null,
    "guestroom_taxes_fees": number | null, "estimated_fnb_gross": number | null,
    "proposal_url": "string" | null,
    "effective_value_offsets": ["string"]
  },
  "concessions": ["string"],
  "policies": {
    // Free-form: e.g. "cancellation": "string", "attrition": "string",
    // "deposit": "string", "cutoff_date": "string"
  },
  "notes": "string" | null
}

RULES:
1. status must be honest: "explicit" only when the amount is stated in the text;
   "derived" when you computed it from stated numbers (say how in notes);
   "conditional" when the amount or a waiver depends on another commitment
   being met; "not_found" when the document does not support a value.
2. provenance_snippet must quote the supporting source text VERBATIM.
3. value must be a plain JSON number: no "$", no thousands separators, no "%".
4. Percentages are numbers out of 100: a 24% service charge is 24, not 0.24.
5. currency is an ISO code; assume "USD" unless the document says otherwise.
6. A meeting-room fee waived contingent on meeting an F&B minimum is
   "conditional", with the triggering clause quoted in provenance_snippet or notes.
7. Concessions that change the effective value without moving a total
   (comp rooms, credits, rebates) also go in extras.effective_value_offsets.
8. Do NOT invent numbers. Missing data is "not_found" with a null value.
9. Return ONLY the JSON object with no surrounding text and no code fences."#;

const QUOTE_EXTRACT_USER: &str = "\
Extract and analyze the hotel quote data from this document:\n\n{document}";

pub fn extraction_system_prompt() -> String {
    QUOTE_EXTRACT_SYSTEM.replace("{json_only}", JSON_ONLY_SYSTEM)
}

pub fn extraction_user_prompt(document: &str) -> String {
    QUOTE_EXTRACT_USER.replace("{document}", document)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_has_no_unfilled_placeholders() {
        let prompt = extraction_system_prompt();
        assert!(!prompt.contains("{json_only}"));
        assert!(prompt.contains("not_found"));
    }

    #[test]
    fn test_user_prompt_embeds_document() {
        let prompt = extraction_user_prompt("Quote total: $5,000");
        assert!(prompt.ends_with("Quote total: $5,000"));
        assert!(!prompt.contains("{document}"));
    }
}
