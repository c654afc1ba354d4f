//! Injection points for the check pipeline and their production
//! implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pagewatch_core::{ChangeSummary, MonitoredResource, Observation, Outcome};
use pagewatch_db::DbError;
use pagewatch_scraper::{PageClient, ScraperError};
use pagewatch_summarizer::{SummarizerClient, SummarizerError};
use sqlx::PgPool;
use uuid::Uuid;

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Returns the page body for `url`, or why it could not be fetched.
    async fn fetch(&self, url: &str) -> Result<String, ScraperError>;
}

#[async_trait]
pub trait ChangeSummarizer: Send + Sync {
    async fn summarize_diff(
        &self,
        removed: &str,
        added: &str,
    ) -> Result<Option<ChangeSummary>, SummarizerError>;

    async fn summarize_baseline(&self, page: &str)
        -> Result<Option<ChangeSummary>, SummarizerError>;
}

/// The narrow persistence contract the pipeline and history need.
#[async_trait]
pub trait CheckStore: Send + Sync {
    async fn get_resource(&self, id: Uuid) -> Result<Option<MonitoredResource>, DbError>;

    /// Newest observation whose outcome is not `failed`.
    async fn latest_comparable(&self, resource_id: Uuid) -> Result<Option<Observation>, DbError>;

    async fn insert_observation(
        &self,
        resource_id: Uuid,
        fetched_at: DateTime<Utc>,
        outcome: &Outcome,
    ) -> Result<Observation, DbError>;

    /// Newest first.
    async fn list_observations(
        &self,
        resource_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Observation>, DbError>;

    /// Newest non-`failed` observation strictly older than `before`.
    async fn previous_comparable(
        &self,
        resource_id: Uuid,
        before: Uuid,
    ) -> Result<Option<Observation>, DbError>;
}

// ---------------------------------------------------------------------------
// Production implementations
// ---------------------------------------------------------------------------

#[async_trait]
impl PageFetcher for PageClient {
    async fn fetch(&self, url: &str) -> Result<String, ScraperError> {
        self.fetch_html(url).await
    }
}

#[async_trait]
impl ChangeSummarizer for SummarizerClient {
    async fn summarize_diff(
        &self,
        removed: &str,
        added: &str,
    ) -> Result<Option<ChangeSummary>, SummarizerError> {
        SummarizerClient::summarize_diff(self, removed, added).await
    }

    async fn summarize_baseline(
        &self,
        page: &str,
    ) -> Result<Option<ChangeSummary>, SummarizerError> {
        SummarizerClient::summarize_baseline(self, page).await
    }
}

/// Used when no summarizer API key is configured: every summary is `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSummarizer;

#[async_trait]
impl ChangeSummarizer for NoopSummarizer {
    async fn summarize_diff(
        &self,
        _removed: &str,
        _added: &str,
    ) -> Result<Option<ChangeSummary>, SummarizerError> {
        Ok(None)
    }

    async fn summarize_baseline(
        &self,
        _page: &str,
    ) -> Result<Option<ChangeSummary>, SummarizerError> {
        Ok(None)
    }
}

#[async_trait]
impl CheckStore for PgPool {
    async fn get_resource(&self, id: Uuid) -> Result<Option<MonitoredResource>, DbError> {
        Ok(pagewatch_db::get_resource(self, id)
            .await?
            .map(pagewatch_db::ResourceRow::into_resource))
    }

    async fn latest_comparable(&self, resource_id: Uuid) -> Result<Option<Observation>, DbError> {
        pagewatch_db::latest_comparable_observation(self, resource_id)
            .await?
            .map(Observation::try_from)
            .transpose()
    }

    async fn insert_observation(
        &self,
        resource_id: Uuid,
        fetched_at: DateTime<Utc>,
        outcome: &Outcome,
    ) -> Result<Observation, DbError> {
        pagewatch_db::insert_observation(self, resource_id, fetched_at, outcome).await
    }

    async fn list_observations(
        &self,
        resource_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Observation>, DbError> {
        pagewatch_db::list_observations(self, resource_id, limit)
            .await?
            .into_iter()
            .map(Observation::try_from)
            .collect()
    }

    async fn previous_comparable(
        &self,
        resource_id: Uuid,
        before: Uuid,
    ) -> Result<Option<Observation>, DbError> {
        pagewatch_db::previous_comparable_observation(self, resource_id, before)
            .await?
            .map(Observation::try_from)
            .transpose()
    }
}
