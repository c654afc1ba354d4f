//! In-memory fakes for the pipeline's injection points.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pagewatch_check::{
    ChangeSummarizer, CheckPipeline, CheckSettings, CheckStore, PageFetcher,
};
use pagewatch_core::{ChangeSummary, MonitoredResource, Observation, Outcome};
use pagewatch_db::DbError;
use pagewatch_scraper::ScraperError;
use pagewatch_summarizer::SummarizerError;
use uuid::Uuid;

/// Wraps `text` in a minimal HTML document.
pub fn page(text: &str) -> String {
    format!("<html><head><title>t</title><script>var x = 1;</script></head><body><p>{text}</p></body></html>")
}

pub const PAGE_V1: &str = "Our office is open Monday to Friday from nine in the morning until five in the evening.";
pub const PAGE_V2: &str = "Our office is open Monday to Saturday from nine in the morning until six in the evening.";

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

pub enum FakePage {
    Html(String),
    /// Serves the page, then runs the side effect as if another request
    /// landed while the check was in flight.
    HtmlThen(String, Box<dyn FnOnce() + Send>),
    Status(u16),
    Hang,
}

#[derive(Default)]
pub struct FakeFetcher {
    pages: Mutex<VecDeque<FakePage>>,
    pub calls: AtomicUsize,
}

impl FakeFetcher {
    pub fn serving(pages: Vec<FakePage>) -> Arc<Self> {
        Arc::new(Self {
            pages: Mutex::new(pages.into()),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<String, ScraperError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.pages.lock().expect("lock").pop_front();
        match next {
            Some(FakePage::Html(html)) => Ok(html),
            Some(FakePage::HtmlThen(html, side_effect)) => {
                side_effect();
                Ok(html)
            }
            Some(FakePage::Status(status)) => Err(ScraperError::UnexpectedStatus {
                status,
                url: url.to_owned(),
            }),
            Some(FakePage::Hang) => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(String::new())
            }
            None => panic!("FakeFetcher ran out of pages"),
        }
    }
}

// ---------------------------------------------------------------------------
// Summarizer
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub enum SummaryMode {
    Returns(Option<ChangeSummary>),
    Overloaded,
    SoftFailure,
    Hang,
}

pub struct FakeSummarizer {
    mode: Mutex<SummaryMode>,
    pub diff_calls: AtomicUsize,
    pub baseline_calls: AtomicUsize,
}

impl FakeSummarizer {
    pub fn new(mode: SummaryMode) -> Arc<Self> {
        Arc::new(Self {
            mode: Mutex::new(mode),
            diff_calls: AtomicUsize::new(0),
            baseline_calls: AtomicUsize::new(0),
        })
    }

    pub fn summarizing(text: &str) -> Arc<Self> {
        Self::new(SummaryMode::Returns(Some(summary(text))))
    }

    pub fn set_mode(&self, mode: SummaryMode) {
        *self.mode.lock().expect("lock") = mode;
    }

    async fn respond(&self) -> Result<Option<ChangeSummary>, SummarizerError> {
        let mode = self.mode.lock().expect("lock").clone();
        match mode {
            SummaryMode::Returns(summary) => Ok(summary),
            SummaryMode::Overloaded => Err(SummarizerError::Overloaded { status: 529 }),
            SummaryMode::SoftFailure => Err(SummarizerError::EmptyResponse),
            SummaryMode::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(Some(summary("too late")))
            }
        }
    }
}

pub fn summary(text: &str) -> ChangeSummary {
    ChangeSummary {
        summary: text.to_owned(),
        citations: vec![],
    }
}

#[async_trait]
impl ChangeSummarizer for FakeSummarizer {
    async fn summarize_diff(
        &self,
        _removed: &str,
        _added: &str,
    ) -> Result<Option<ChangeSummary>, SummarizerError> {
        self.diff_calls.fetch_add(1, Ordering::SeqCst);
        self.respond().await
    }

    async fn summarize_baseline(
        &self,
        _page: &str,
    ) -> Result<Option<ChangeSummary>, SummarizerError> {
        self.baseline_calls.fetch_add(1, Ordering::SeqCst);
        self.respond().await
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Observations are kept in insertion order, which tests keep chronological.
#[derive(Default)]
pub struct MemoryStore {
    resources: Mutex<Vec<MonitoredResource>>,
    observations: Mutex<Vec<Observation>>,
    pub fail_inserts: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_resource(&self, url: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.resources.lock().expect("lock").push(MonitoredResource {
            id,
            url: url.to_owned(),
            title: None,
            group_label: "default".to_owned(),
            created_at: Utc::now(),
        });
        id
    }

    pub fn push(&self, resource_id: Uuid, fetched_at: DateTime<Utc>, outcome: Outcome) -> Observation {
        let observation = Observation {
            id: Uuid::new_v4(),
            resource_id,
            fetched_at,
            outcome,
        };
        self.observations
            .lock()
            .expect("lock")
            .push(observation.clone());
        observation
    }

    pub fn remove_resource(&self, id: Uuid) {
        self.resources.lock().expect("lock").retain(|r| r.id != id);
        self.observations
            .lock()
            .expect("lock")
            .retain(|o| o.resource_id != id);
    }

    pub fn observations_for(&self, resource_id: Uuid) -> Vec<Observation> {
        self.observations
            .lock()
            .expect("lock")
            .iter()
            .filter(|o| o.resource_id == resource_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl CheckStore for MemoryStore {
    async fn get_resource(&self, id: Uuid) -> Result<Option<MonitoredResource>, DbError> {
        Ok(self
            .resources
            .lock()
            .expect("lock")
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn latest_comparable(&self, resource_id: Uuid) -> Result<Option<Observation>, DbError> {
        Ok(self
            .observations_for(resource_id)
            .into_iter()
            .rev()
            .find(|o| o.outcome.is_comparable()))
    }

    async fn insert_observation(
        &self,
        resource_id: Uuid,
        fetched_at: DateTime<Utc>,
        outcome: &Outcome,
    ) -> Result<Observation, DbError> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(DbError::InvalidRow("simulated storage outage".to_owned()));
        }
        if !self.resources.lock().expect("lock").iter().any(|r| r.id == resource_id) {
            return Err(DbError::NotFound);
        }
        Ok(self.push(resource_id, fetched_at, outcome.clone()))
    }

    async fn list_observations(
        &self,
        resource_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Observation>, DbError> {
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(self
            .observations_for(resource_id)
            .into_iter()
            .rev()
            .take(limit)
            .collect())
    }

    async fn previous_comparable(
        &self,
        resource_id: Uuid,
        before: Uuid,
    ) -> Result<Option<Observation>, DbError> {
        let all = self.observations_for(resource_id);
        let Some(pos) = all.iter().position(|o| o.id == before) else {
            return Ok(None);
        };
        Ok(all[..pos]
            .iter()
            .rev()
            .find(|o| o.outcome.is_comparable())
            .cloned())
    }
}

pub fn pipeline(
    fetcher: Arc<FakeFetcher>,
    store: Arc<MemoryStore>,
    summarizer: Arc<dyn ChangeSummarizer>,
) -> CheckPipeline {
    CheckPipeline::new(
        fetcher,
        store,
        summarizer,
        CheckSettings {
            fetch_timeout: Duration::from_millis(200),
            summarizer_timeout: Duration::from_millis(200),
            ..CheckSettings::default()
        },
    )
}
