//! Natural-language change summaries from an OpenAI-compatible chat
//! completions endpoint.

pub mod client;
pub mod error;
pub mod excerpt;
pub mod prompt;
pub mod retry;

pub use client::SummarizerClient;
pub use error::SummarizerError;
pub use excerpt::{
    cap_chars, filter_citations, BASELINE_EXCERPT_CHARS, DIFF_EXCERPT_CHARS, MAX_CITATIONS,
};
pub use retry::{retry_with_backoff, RetryPolicy};
