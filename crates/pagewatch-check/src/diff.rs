//! Word-level diff between two versions of a page's text.
//!
//! Text is split into alternating runs of whitespace and non-whitespace, and
//! the runs are aligned with the linear-space variant of Myers' O(ND) shortest
//! edit script (middle snake, divide and conquer). Whitespace runs
//! are tokens too, so concatenating the segments reproduces the input exactly:
//! dropping `added` yields the previous text and dropping `removed` yields the
//! current one.

use serde::{Deserialize, Serialize};

/// A changed range whose shortest edit script is longer than this many tokens
/// is not searched further; that range alone is reported as fully removed and
/// fully added.
pub const MAX_EDIT_DISTANCE: usize = 20_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Unchanged,
    Added,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSegment {
    pub value: String,
    pub kind: SegmentKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edit<'a> {
    Keep(&'a str),
    Insert(&'a str),
    Delete(&'a str),
}

fn tokenize(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut in_space = None;

    for (idx, ch) in text.char_indices() {
        let space = ch.is_whitespace();
        match in_space {
            Some(prev) if prev != space => {
                tokens.push(&text[start..idx]);
                start = idx;
            }
            _ => {}
        }
        in_space = Some(space);
    }
    if start < text.len() {
        tokens.push(&text[start..]);
    }
    tokens
}

/// Computes the word-level diff from `prev` to `curr`.
///
/// Adjacent tokens of the same kind are merged into one segment.
#[must_use]
pub fn diff_words(prev: &str, curr: &str) -> Vec<DiffSegment> {
    diff_with_limit(prev, curr, MAX_EDIT_DISTANCE)
}

fn diff_with_limit(prev: &str, curr: &str, max_d: usize) -> Vec<DiffSegment> {
    let a = tokenize(prev);
    let b = tokenize(curr);
    let mut edits = Vec::with_capacity(a.len().max(b.len()));
    conquer(&a, &b, max_d, &mut edits);
    coalesce(&edits)
}

fn coalesce(edits: &[Edit<'_>]) -> Vec<DiffSegment> {
    let mut segments: Vec<DiffSegment> = Vec::new();
    for edit in edits {
        let (kind, value) = match *edit {
            Edit::Keep(t) => (SegmentKind::Unchanged, t),
            Edit::Insert(t) => (SegmentKind::Added, t),
            Edit::Delete(t) => (SegmentKind::Removed, t),
        };
        match segments.last_mut() {
            Some(last) if last.kind == kind => last.value.push_str(value),
            _ => segments.push(DiffSegment {
                value: value.to_owned(),
                kind,
            }),
        }
    }
    segments
}

/// Appends the edit script turning `a` into `b` to `out`.
///
/// Common ends are kept, and the middle is split at a point on an optimal
/// path and solved recursively, so memory stays linear in the input.
fn conquer<'a>(a: &[&'a str], b: &[&'a str], max_d: usize, out: &mut Vec<Edit<'a>>) {
    let prefix = a.iter().zip(b).take_while(|(x, y)| x == y).count();
    out.extend(a[..prefix].iter().map(|t| Edit::Keep(*t)));
    let (a, b) = (&a[prefix..], &b[prefix..]);

    let suffix = a
        .iter()
        .rev()
        .zip(b.iter().rev())
        .take_while(|(x, y)| x == y)
        .count();
    let (a_mid, a_tail) = a.split_at(a.len() - suffix);
    let b_mid = &b[..b.len() - suffix];

    if a_mid.is_empty() {
        out.extend(b_mid.iter().map(|t| Edit::Insert(*t)));
    } else if b_mid.is_empty() {
        out.extend(a_mid.iter().map(|t| Edit::Delete(*t)));
    } else {
        match middle_snake(a_mid, b_mid, max_d) {
            Some((x, y))
                if x <= a_mid.len()
                    && y <= b_mid.len()
                    && (x, y) != (0, 0)
                    && (x, y) != (a_mid.len(), b_mid.len()) =>
            {
                conquer(&a_mid[..x], &b_mid[..y], max_d, out);
                conquer(&a_mid[x..], &b_mid[y..], max_d, out);
            }
            _ => {
                tracing::debug!(
                    removed_tokens = a_mid.len(),
                    added_tokens = b_mid.len(),
                    "edit distance over limit, reporting range as replaced"
                );
                out.extend(a_mid.iter().map(|t| Edit::Delete(*t)));
                out.extend(b_mid.iter().map(|t| Edit::Insert(*t)));
            }
        }
    }

    out.extend(a_tail.iter().map(|t| Edit::Keep(*t)));
}

/// Finds a split point on a shortest edit path from `a` to `b` by running
/// the forward and reverse searches until they overlap.
///
/// Returns `None` when the edit distance exceeds `max_d`. Both inputs must
/// be non-empty.
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
fn middle_snake(a: &[&str], b: &[&str], max_d: usize) -> Option<(usize, usize)> {
    let n = a.len() as isize;
    let m = b.len() as isize;
    let delta = n - m;
    let odd = delta % 2 != 0;
    let d_max = (a.len() + b.len()).div_ceil(2).min(max_d.div_ceil(2)) as isize;

    let offset = d_max + 1;
    let width = (2 * d_max + 3) as usize;
    let mut forward = vec![0isize; width];
    let mut reverse = vec![0isize; width];

    for d in 0..=d_max {
        let mut k = -d;
        while k <= d {
            let i = (offset + k) as usize;
            let mut x = if k == -d || (k != d && forward[i - 1] < forward[i + 1]) {
                forward[i + 1]
            } else {
                forward[i - 1] + 1
            };
            let mut y = x - k;
            let (x0, y0) = (x, y);
            while x < n && y < m && a[x as usize] == b[y as usize] {
                x += 1;
                y += 1;
            }
            forward[i] = x;

            let opposite = delta - k;
            if odd
                && opposite.abs() < d
                && x + reverse[(offset + opposite) as usize] >= n
            {
                return Some((x0 as usize, y0 as usize));
            }
            k += 2;
        }

        let mut k = -d;
        while k <= d {
            let i = (offset + k) as usize;
            let mut x = if k == -d || (k != d && reverse[i - 1] < reverse[i + 1]) {
                reverse[i + 1]
            } else {
                reverse[i - 1] + 1
            };
            let mut y = x - k;
            while x < n && y < m && a[(n - 1 - x) as usize] == b[(m - 1 - y) as usize] {
                x += 1;
                y += 1;
            }
            reverse[i] = x;

            let opposite = delta - k;
            if !odd
                && opposite.abs() <= d
                && x + forward[(offset + opposite) as usize] >= n
            {
                return Some(((n - x) as usize, (m - y) as usize));
            }
            k += 2;
        }
    }
    None
}

fn join_kind(segments: &[DiffSegment], kind: SegmentKind) -> String {
    segments
        .iter()
        .filter(|s| s.kind == kind)
        .map(|s| s.value.trim())
        .filter(|v| !v.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Removed passages, one per line.
#[must_use]
pub fn removed_text(segments: &[DiffSegment]) -> String {
    join_kind(segments, SegmentKind::Removed)
}

/// Added passages, one per line.
#[must_use]
pub fn added_text(segments: &[DiffSegment]) -> String {
    join_kind(segments, SegmentKind::Added)
}

/// Concatenation of every segment except those of `skip`.
#[must_use]
pub fn reconstruct(segments: &[DiffSegment], skip: SegmentKind) -> String {
    segments
        .iter()
        .filter(|s| s.kind != skip)
        .map(|s| s.value.as_str())
        .collect()
}

#[cfg(test)]
#[path = "diff_test.rs"]
mod tests;
