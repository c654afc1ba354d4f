//! History assembly: newest-first ordering and diffs rebuilt on read.

mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use common::{pipeline, FakeFetcher, MemoryStore, PAGE_V1, PAGE_V2};
use pagewatch_check::{
    fingerprint, load_history, reconstruct, CheckError, NoopSummarizer, SegmentKind,
    HISTORY_LENGTH,
};
use pagewatch_core::{Outcome, OutcomeKind};
use uuid::Uuid;

fn baseline(text: &str) -> Outcome {
    Outcome::Baseline {
        text: text.to_owned(),
        fingerprint: fingerprint(text),
        summary: None,
    }
}

fn changed(text: &str) -> Outcome {
    Outcome::Changed {
        text: text.to_owned(),
        fingerprint: fingerprint(text),
        summary: None,
    }
}

fn failed() -> Outcome {
    Outcome::Failed {
        error: "fetch failed: unexpected HTTP status 502".to_owned(),
    }
}

#[tokio::test]
async fn entries_are_newest_first_and_capped() {
    let store = MemoryStore::new();
    let id = store.add_resource("https://example.com");
    let t0 = Utc::now();
    for i in 0..7 {
        store.push(id, t0 + Duration::seconds(i), failed());
    }

    let entries = load_history(store.as_ref(), id, HISTORY_LENGTH)
        .await
        .expect("history");

    assert_eq!(entries.len(), 5);
    assert!(entries
        .windows(2)
        .all(|w| w[0].observation.fetched_at > w[1].observation.fetched_at));
    assert!(entries.iter().all(|e| e.diff.is_none()));
}

#[tokio::test]
async fn changed_entry_is_diffed_against_previous_comparable_in_window() {
    let store = MemoryStore::new();
    let id = store.add_resource("https://example.com");
    let t0 = Utc::now();
    store.push(id, t0, baseline(PAGE_V1));
    store.push(id, t0 + Duration::seconds(1), failed());
    store.push(id, t0 + Duration::seconds(2), changed(PAGE_V2));

    let entries = load_history(store.as_ref(), id, HISTORY_LENGTH)
        .await
        .expect("history");

    assert_eq!(entries[0].observation.outcome.kind(), OutcomeKind::Changed);
    let diff = entries[0].diff.as_ref().expect("diff recomputed");
    assert_eq!(reconstruct(diff, SegmentKind::Added), PAGE_V1);
    assert_eq!(reconstruct(diff, SegmentKind::Removed), PAGE_V2);
    assert!(entries[1].diff.is_none());
    assert!(entries[2].diff.is_none());
}

#[tokio::test]
async fn previous_outside_window_is_loaded_from_store() {
    let store = MemoryStore::new();
    let id = store.add_resource("https://example.com");
    let t0 = Utc::now();
    store.push(id, t0, baseline(PAGE_V1));
    store.push(id, t0 + Duration::seconds(1), changed(PAGE_V2));

    let entries = load_history(store.as_ref(), id, 1).await.expect("history");

    assert_eq!(entries.len(), 1);
    let diff = entries[0].diff.as_ref().expect("diff recomputed");
    assert_eq!(reconstruct(diff, SegmentKind::Added), PAGE_V1);
}

#[tokio::test]
async fn history_of_unknown_resource_is_not_found() {
    let checker = pipeline(
        FakeFetcher::serving(vec![]),
        MemoryStore::new(),
        Arc::new(NoopSummarizer),
    );

    let err = checker
        .history(Uuid::new_v4(), HISTORY_LENGTH)
        .await
        .expect_err("unknown resource");
    assert!(matches!(err, CheckError::ResourceNotFound(_)));
}

#[test]
fn history_entry_serializes_flat() {
    let entry = pagewatch_check::HistoryEntry {
        observation: pagewatch_core::Observation {
            id: Uuid::nil(),
            resource_id: Uuid::nil(),
            fetched_at: Utc::now(),
            outcome: failed(),
        },
        diff: None,
    };
    let json = serde_json::to_value(&entry).expect("serialize");
    assert_eq!(json["outcome"], "failed");
    assert!(json["diff"].is_null());
    assert!(json["error"].as_str().is_some_and(|e| e.contains("502")));
}
