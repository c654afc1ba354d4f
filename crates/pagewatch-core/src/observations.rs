//! Observation model: one fetch-and-compare event for a monitored resource.
//!
//! An observation's payload depends on its outcome, so [`Outcome`] is a sum
//! type carrying exactly the fields each outcome needs. Storage flattens it
//! back into nullable columns plus an [`OutcomeKind`] tag.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::CoreError;

/// Natural-language description of a page or a change, with quotations
/// taken verbatim from the text that was summarized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSummary {
    pub summary: String,
    pub citations: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeKind {
    Baseline,
    Unchanged,
    Changed,
    Failed,
}

impl OutcomeKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OutcomeKind::Baseline => "baseline",
            OutcomeKind::Unchanged => "unchanged",
            OutcomeKind::Changed => "changed",
            OutcomeKind::Failed => "failed",
        }
    }
}

impl std::fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutcomeKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "baseline" => Ok(OutcomeKind::Baseline),
            "unchanged" => Ok(OutcomeKind::Unchanged),
            "changed" => Ok(OutcomeKind::Changed),
            "failed" => Ok(OutcomeKind::Failed),
            other => Err(CoreError::UnknownOutcome(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum Outcome {
    /// First successful observation; establishes the comparison point.
    Baseline {
        text: String,
        fingerprint: String,
        summary: Option<ChangeSummary>,
    },
    Unchanged {
        text: String,
        fingerprint: String,
    },
    Changed {
        text: String,
        fingerprint: String,
        summary: Option<ChangeSummary>,
    },
    /// Fetch or extraction failure. Never advances the comparison baseline.
    Failed { error: String },
}

impl Outcome {
    #[must_use]
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Outcome::Baseline { .. } => OutcomeKind::Baseline,
            Outcome::Unchanged { .. } => OutcomeKind::Unchanged,
            Outcome::Changed { .. } => OutcomeKind::Changed,
            Outcome::Failed { .. } => OutcomeKind::Failed,
        }
    }

    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Outcome::Baseline { text, .. }
            | Outcome::Unchanged { text, .. }
            | Outcome::Changed { text, .. } => Some(text),
            Outcome::Failed { .. } => None,
        }
    }

    #[must_use]
    pub fn fingerprint(&self) -> Option<&str> {
        match self {
            Outcome::Baseline { fingerprint, .. }
            | Outcome::Unchanged { fingerprint, .. }
            | Outcome::Changed { fingerprint, .. } => Some(fingerprint),
            Outcome::Failed { .. } => None,
        }
    }

    #[must_use]
    pub fn summary(&self) -> Option<&ChangeSummary> {
        match self {
            Outcome::Baseline { summary, .. } | Outcome::Changed { summary, .. } => {
                summary.as_ref()
            }
            Outcome::Unchanged { .. } | Outcome::Failed { .. } => None,
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Outcome::Failed { error } => Some(error),
            _ => None,
        }
    }

    /// Whether this outcome can serve as the "current state" of a resource.
    #[must_use]
    pub fn is_comparable(&self) -> bool {
        !matches!(self, Outcome::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub id: Uuid,
    pub resource_id: Uuid,
    pub fetched_at: DateTime<Utc>,
    #[serde(flatten)]
    pub outcome: Outcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_kind_round_trips_through_storage_tag() {
        for kind in [
            OutcomeKind::Baseline,
            OutcomeKind::Unchanged,
            OutcomeKind::Changed,
            OutcomeKind::Failed,
        ] {
            assert_eq!(kind.as_str().parse::<OutcomeKind>(), Ok(kind));
        }
    }

    #[test]
    fn unknown_outcome_tag_is_rejected() {
        assert_eq!(
            "pending".parse::<OutcomeKind>(),
            Err(CoreError::UnknownOutcome("pending".to_owned()))
        );
    }

    #[test]
    fn failed_outcome_is_not_comparable() {
        let failed = Outcome::Failed {
            error: "HTTP 500".to_owned(),
        };
        assert!(!failed.is_comparable());
        assert!(failed.text().is_none());
        assert!(failed.fingerprint().is_none());
        assert_eq!(failed.error(), Some("HTTP 500"));
    }

    #[test]
    fn unchanged_outcome_carries_text_without_summary() {
        let unchanged = Outcome::Unchanged {
            text: "hello".to_owned(),
            fingerprint: "abc".to_owned(),
        };
        assert!(unchanged.is_comparable());
        assert_eq!(unchanged.text(), Some("hello"));
        assert!(unchanged.summary().is_none());
        assert!(unchanged.error().is_none());
    }

    #[test]
    fn observation_serializes_with_flat_outcome_tag() {
        let obs = Observation {
            id: Uuid::nil(),
            resource_id: Uuid::nil(),
            fetched_at: Utc::now(),
            outcome: Outcome::Changed {
                text: "new text".to_owned(),
                fingerprint: "f00d".to_owned(),
                summary: None,
            },
        };
        let json = serde_json::to_value(&obs).expect("serialize");
        assert_eq!(json["outcome"], "changed");
        assert_eq!(json["text"], "new text");
        assert_eq!(json["fingerprint"], "f00d");
        assert!(json["summary"].is_null());
    }
}
