//! Check orchestration.
//!
//! One run walks fetch → extract → fingerprint → compare, then takes one of
//! four branches (`baseline`, `unchanged`, `changed`, `failed`) and records
//! exactly one observation. Only a missing resource, an overloaded
//! summarizer, or a storage failure abort the run without recording.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use pagewatch_core::{ChangeSummary, MonitoredResource, Observation, Outcome, OutcomeKind};
use pagewatch_db::DbError;
use pagewatch_scraper::{extract_text, MIN_EXTRACTED_CHARS};
use pagewatch_summarizer::SummarizerError;
use serde::Serialize;
use uuid::Uuid;

use crate::diff::{added_text, diff_words, removed_text, DiffSegment};
use crate::error::CheckError;
use crate::fingerprint::fingerprint;
use crate::history::{load_history, HistoryEntry};
use crate::traits::{ChangeSummarizer, CheckStore, PageFetcher};

const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_SUMMARIZER_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy)]
pub struct CheckSettings {
    /// Hard deadline for fetching the page, on top of the client's own timeout.
    pub fetch_timeout: Duration,
    /// Deadline for one summarizer call; past it the check records no summary.
    pub summarizer_timeout: Duration,
    /// Extracted text shorter than this is recorded as unreadable.
    pub min_text_chars: usize,
}

impl Default for CheckSettings {
    fn default() -> Self {
        Self {
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            summarizer_timeout: DEFAULT_SUMMARIZER_TIMEOUT,
            min_text_chars: MIN_EXTRACTED_CHARS,
        }
    }
}

/// Result of a single check.
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub outcome: OutcomeKind,
    pub observation: Observation,
    /// Present only for `changed`. Not persisted.
    pub diff: Option<Vec<DiffSegment>>,
}

pub struct CheckPipeline {
    fetcher: Arc<dyn PageFetcher>,
    store: Arc<dyn CheckStore>,
    summarizer: Arc<dyn ChangeSummarizer>,
    settings: CheckSettings,
}

impl CheckPipeline {
    #[must_use]
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        store: Arc<dyn CheckStore>,
        summarizer: Arc<dyn ChangeSummarizer>,
        settings: CheckSettings,
    ) -> Self {
        Self {
            fetcher,
            store,
            summarizer,
            settings,
        }
    }

    /// Runs one check of the resource with public id `resource_id`.
    ///
    /// # Errors
    ///
    /// - [`CheckError::ResourceNotFound`] if the resource does not exist, or
    ///   was deleted while the check was running.
    /// - [`CheckError::SummarizerOverloaded`] if the summarizer reports
    ///   overload; nothing is recorded.
    /// - [`CheckError::Storage`] if reading state or recording the
    ///   observation fails.
    pub async fn run(&self, resource_id: Uuid) -> Result<CheckReport, CheckError> {
        let resource = self
            .store
            .get_resource(resource_id)
            .await?
            .ok_or(CheckError::ResourceNotFound(resource_id))?;

        let fetched_at = Utc::now();
        let (outcome, diff) = self.evaluate(&resource).await?;
        let kind = outcome.kind();

        let observation = self
            .store
            .insert_observation(resource.id, fetched_at, &outcome)
            .await
            .map_err(|e| {
                if matches!(e, DbError::NotFound) {
                    tracing::info!(resource_id = %resource.id, "resource deleted during check");
                    return CheckError::ResourceNotFound(resource.id);
                }
                tracing::error!(
                    resource_id = %resource.id,
                    outcome = %kind,
                    error = %e,
                    "failed to record observation"
                );
                CheckError::Storage(e)
            })?;

        tracing::info!(resource_id = %resource.id, outcome = %kind, "check recorded");

        Ok(CheckReport {
            outcome: kind,
            observation,
            diff,
        })
    }

    /// Most recent observations for a resource, newest first, with diffs
    /// recomputed for `changed` entries.
    ///
    /// # Errors
    ///
    /// [`CheckError::ResourceNotFound`] or [`CheckError::Storage`].
    pub async fn history(
        &self,
        resource_id: Uuid,
        limit: i64,
    ) -> Result<Vec<HistoryEntry>, CheckError> {
        if self.store.get_resource(resource_id).await?.is_none() {
            return Err(CheckError::ResourceNotFound(resource_id));
        }
        Ok(load_history(self.store.as_ref(), resource_id, limit).await?)
    }

    async fn evaluate(
        &self,
        resource: &MonitoredResource,
    ) -> Result<(Outcome, Option<Vec<DiffSegment>>), CheckError> {
        let html = match tokio::time::timeout(
            self.settings.fetch_timeout,
            self.fetcher.fetch(&resource.url),
        )
        .await
        {
            Ok(Ok(html)) => html,
            Ok(Err(e)) => {
                tracing::warn!(resource_id = %resource.id, url = %resource.url, error = %e, "fetch failed");
                return Ok((failed(format!("fetch failed: {e}")), None));
            }
            Err(_) => {
                let secs = self.settings.fetch_timeout.as_secs();
                tracing::warn!(resource_id = %resource.id, url = %resource.url, "fetch timed out");
                return Ok((failed(format!("fetch timed out after {secs}s")), None));
            }
        };

        let text = extract_text(&html);
        let chars = text.chars().count();
        if chars < self.settings.min_text_chars {
            tracing::warn!(resource_id = %resource.id, chars, "page has too little readable text");
            return Ok((
                failed(format!(
                    "content not extractable: found {chars} characters of readable text, \
                     at least {} required",
                    self.settings.min_text_chars
                )),
                None,
            ));
        }

        let fingerprint = fingerprint(&text);
        let current = self.store.latest_comparable(resource.id).await?;

        let Some(previous) = current else {
            tracing::debug!(resource_id = %resource.id, "no prior observation, recording baseline");
            let summary = self
                .bounded(resource, self.summarizer.summarize_baseline(&text))
                .await?;
            return Ok((
                Outcome::Baseline {
                    text,
                    fingerprint,
                    summary,
                },
                None,
            ));
        };

        if previous.outcome.fingerprint() == Some(fingerprint.as_str()) {
            tracing::debug!(resource_id = %resource.id, "fingerprint unchanged");
            return Ok((Outcome::Unchanged { text, fingerprint }, None));
        }

        let segments = diff_words(previous.outcome.text().unwrap_or_default(), &text);
        let (removed, added) = (removed_text(&segments), added_text(&segments));
        let summary = self
            .bounded(resource, self.summarizer.summarize_diff(&removed, &added))
            .await?;

        Ok((
            Outcome::Changed {
                text,
                fingerprint,
                summary,
            },
            Some(segments),
        ))
    }

    /// Runs a summarizer call under the configured deadline.
    async fn bounded(
        &self,
        resource: &MonitoredResource,
        call: impl Future<Output = Result<Option<ChangeSummary>, SummarizerError>>,
    ) -> Result<Option<ChangeSummary>, CheckError> {
        match tokio::time::timeout(self.settings.summarizer_timeout, call).await {
            Ok(result) => soften(result),
            Err(_) => {
                tracing::warn!(
                    resource_id = %resource.id,
                    timeout_secs = self.settings.summarizer_timeout.as_secs(),
                    "summarizer timed out, recording without summary"
                );
                Ok(None)
            }
        }
    }
}

fn failed(error: String) -> Outcome {
    Outcome::Failed { error }
}

/// Overload aborts the check; any other summarizer failure means no summary.
fn soften(
    result: Result<Option<ChangeSummary>, SummarizerError>,
) -> Result<Option<ChangeSummary>, CheckError> {
    match result {
        Ok(summary) => Ok(summary),
        Err(SummarizerError::Overloaded { .. }) => Err(CheckError::SummarizerOverloaded),
        Err(e) => {
            tracing::warn!(error = %e, "summarizer failed, recording without summary");
            Ok(None)
        }
    }
}
