//! Observation history with diffs rebuilt on read.
//!
//! Diffs are never stored. A `changed` entry is diffed against the newest
//! comparable observation before it: found in the same window when possible,
//! otherwise fetched from storage.

use pagewatch_core::{Observation, OutcomeKind};
use pagewatch_db::DbError;
use serde::Serialize;
use uuid::Uuid;

use crate::diff::{diff_words, DiffSegment};
use crate::traits::CheckStore;

/// Number of observations returned by the history view.
pub const HISTORY_LENGTH: i64 = 5;

#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub observation: Observation,
    pub diff: Option<Vec<DiffSegment>>,
}

/// Loads up to `limit` observations, newest first.
///
/// # Errors
///
/// Returns [`DbError`] if any storage call fails.
pub async fn load_history(
    store: &dyn CheckStore,
    resource_id: Uuid,
    limit: i64,
) -> Result<Vec<HistoryEntry>, DbError> {
    let observations = store.list_observations(resource_id, limit).await?;
    let mut entries = Vec::with_capacity(observations.len());

    for (idx, observation) in observations.iter().enumerate() {
        let diff = if observation.outcome.kind() == OutcomeKind::Changed {
            let in_window = observations[idx + 1..]
                .iter()
                .find(|o| o.outcome.is_comparable())
                .cloned();
            let previous = match in_window {
                Some(prev) => Some(prev),
                None => store.previous_comparable(resource_id, observation.id).await?,
            };
            previous.and_then(|prev| {
                Some(diff_words(prev.outcome.text()?, observation.outcome.text()?))
            })
        } else {
            None
        };

        entries.push(HistoryEntry {
            observation: observation.clone(),
            diff,
        });
    }

    Ok(entries)
}
