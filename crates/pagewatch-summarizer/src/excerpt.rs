//! Size caps for text sent to the model, and post-filtering of the
//! quotations it returns.

use std::collections::HashSet;

/// Cap applied independently to the removed and the added excerpt.
pub const DIFF_EXCERPT_CHARS: usize = 2_000;

/// Cap for the page text sent when summarizing a baseline.
pub const BASELINE_EXCERPT_CHARS: usize = 6_000;

pub const MAX_CITATIONS: usize = 3;

/// Truncates `text` to at most `max_chars` characters, on a char boundary.
#[must_use]
pub fn cap_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

fn squash_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Keeps only citations that literally occur in `source`.
///
/// Matching ignores differences in whitespace. Citations are trimmed, blank
/// ones dropped, duplicates removed, and at most [`MAX_CITATIONS`] returned
/// in their original order.
#[must_use]
pub fn filter_citations(citations: Vec<String>, source: &str) -> Vec<String> {
    let haystack = squash_whitespace(source);
    let mut seen = HashSet::new();

    citations
        .into_iter()
        .filter_map(|c| {
            let needle = squash_whitespace(&c);
            if needle.is_empty() || !haystack.contains(&needle) || !seen.insert(needle) {
                return None;
            }
            Some(c.trim().to_owned())
        })
        .take(MAX_CITATIONS)
        .collect()
}
