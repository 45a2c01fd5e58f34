// Quote extraction engine.
// Implements: input resolution, URL discovery, LLM extraction, merging,
// derived totals, and write-once persistence.
// All LLM calls go through llm_client — no direct OpenAI calls here.

pub mod content;
pub mod handlers;
pub mod merge;
pub mod oracle;
pub mod pipeline;
pub mod prompts;
pub mod quote;
pub mod store;
pub mod urls;
