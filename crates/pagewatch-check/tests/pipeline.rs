//! Branch-by-branch tests for `CheckPipeline::run` using in-memory fakes.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::{
    page, pipeline, summary, FakeFetcher, FakePage, FakeSummarizer, MemoryStore, SummaryMode,
    PAGE_V1, PAGE_V2,
};
use pagewatch_check::{reconstruct, CheckError, NoopSummarizer, SegmentKind};
use pagewatch_core::{Outcome, OutcomeKind};
use uuid::Uuid;

#[tokio::test]
async fn unknown_resource_is_not_found_and_nothing_is_recorded() {
    let store = MemoryStore::new();
    let fetcher = FakeFetcher::serving(vec![]);
    let checker = pipeline(fetcher.clone(), store, FakeSummarizer::summarizing("x"));

    let missing = Uuid::new_v4();
    let err = checker.run(missing).await.expect_err("must fail");

    assert!(matches!(err, CheckError::ResourceNotFound(id) if id == missing));
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn first_check_records_baseline_without_diff() {
    let store = MemoryStore::new();
    let id = store.add_resource("https://example.com/hours");
    let summarizer = FakeSummarizer::summarizing("An office hours page.");
    let checker = pipeline(
        FakeFetcher::serving(vec![FakePage::Html(page(PAGE_V1))]),
        store.clone(),
        summarizer.clone(),
    );

    let report = checker.run(id).await.expect("check");

    assert_eq!(report.outcome, OutcomeKind::Baseline);
    assert!(report.diff.is_none());
    assert_eq!(report.observation.outcome.text(), Some(PAGE_V1));
    assert_eq!(
        report.observation.outcome.summary(),
        Some(&summary("An office hours page."))
    );
    assert_eq!(summarizer.baseline_calls.load(Ordering::SeqCst), 1);
    assert_eq!(summarizer.diff_calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.observations_for(id).len(), 1);
}

#[tokio::test]
async fn identical_content_is_unchanged_without_summarizer_call() {
    let store = MemoryStore::new();
    let id = store.add_resource("https://example.com/hours");
    let summarizer = FakeSummarizer::summarizing("An office hours page.");
    let checker = pipeline(
        FakeFetcher::serving(vec![
            FakePage::Html(page(PAGE_V1)),
            FakePage::Html(page(PAGE_V1)),
        ]),
        store.clone(),
        summarizer.clone(),
    );

    let first = checker.run(id).await.expect("first");
    let second = checker.run(id).await.expect("second");

    assert_eq!(second.outcome, OutcomeKind::Unchanged);
    assert!(second.diff.is_none());
    assert!(second.observation.outcome.summary().is_none());
    assert_eq!(second.observation.outcome.text(), Some(PAGE_V1));
    assert_eq!(
        second.observation.outcome.fingerprint(),
        first.observation.outcome.fingerprint()
    );
    assert_eq!(summarizer.baseline_calls.load(Ordering::SeqCst), 1);
    assert_eq!(summarizer.diff_calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.observations_for(id).len(), 2);
}

#[tokio::test]
async fn changed_content_returns_diff_and_summary() {
    let store = MemoryStore::new();
    let id = store.add_resource("https://example.com/hours");
    let summarizer = FakeSummarizer::summarizing("Hours extended.");
    let checker = pipeline(
        FakeFetcher::serving(vec![
            FakePage::Html(page(PAGE_V1)),
            FakePage::Html(page(PAGE_V2)),
        ]),
        store.clone(),
        summarizer.clone(),
    );

    checker.run(id).await.expect("baseline");
    let report = checker.run(id).await.expect("changed");

    assert_eq!(report.outcome, OutcomeKind::Changed);
    let diff = report.diff.expect("diff present");
    assert_eq!(reconstruct(&diff, SegmentKind::Added), PAGE_V1);
    assert_eq!(reconstruct(&diff, SegmentKind::Removed), PAGE_V2);
    assert_eq!(
        report.observation.outcome.summary(),
        Some(&summary("Hours extended."))
    );
    assert_eq!(summarizer.diff_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn change_is_recorded_even_when_summary_is_unavailable() {
    let store = MemoryStore::new();
    let id = store.add_resource("https://example.com/hours");
    let summarizer = FakeSummarizer::new(SummaryMode::SoftFailure);
    let checker = pipeline(
        FakeFetcher::serving(vec![
            FakePage::Html(page(PAGE_V1)),
            FakePage::Html(page(PAGE_V2)),
        ]),
        store.clone(),
        summarizer,
    );

    let baseline = checker.run(id).await.expect("baseline");
    assert!(baseline.observation.outcome.summary().is_none());

    let report = checker.run(id).await.expect("changed");
    assert_eq!(report.outcome, OutcomeKind::Changed);
    assert!(report.observation.outcome.summary().is_none());
    assert!(report.diff.is_some());
    assert_eq!(store.observations_for(id).len(), 2);
}

#[tokio::test]
async fn overloaded_summarizer_aborts_without_recording() {
    let store = MemoryStore::new();
    let id = store.add_resource("https://example.com/hours");
    let summarizer = FakeSummarizer::summarizing("ok");
    let checker = pipeline(
        FakeFetcher::serving(vec![
            FakePage::Html(page(PAGE_V1)),
            FakePage::Html(page(PAGE_V2)),
        ]),
        store.clone(),
        summarizer.clone(),
    );

    checker.run(id).await.expect("baseline");
    summarizer.set_mode(SummaryMode::Overloaded);

    let err = checker.run(id).await.expect_err("overload must abort");
    assert!(matches!(err, CheckError::SummarizerOverloaded));
    assert_eq!(store.observations_for(id).len(), 1);
}

#[tokio::test]
async fn http_error_records_failed_observation() {
    let store = MemoryStore::new();
    let id = store.add_resource("https://example.com/gone");
    let summarizer = FakeSummarizer::summarizing("x");
    let checker = pipeline(
        FakeFetcher::serving(vec![FakePage::Status(404)]),
        store.clone(),
        summarizer.clone(),
    );

    let report = checker.run(id).await.expect("failure is a report");

    assert_eq!(report.outcome, OutcomeKind::Failed);
    assert!(report.diff.is_none());
    let error = report.observation.outcome.error().expect("error detail");
    assert!(error.contains("404"), "unexpected message: {error}");
    assert_eq!(summarizer.baseline_calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.observations_for(id).len(), 1);
}

#[tokio::test]
async fn fetch_timeout_records_failed_observation() {
    let store = MemoryStore::new();
    let id = store.add_resource("https://example.com/slow");
    let checker = pipeline(
        FakeFetcher::serving(vec![FakePage::Hang]),
        store.clone(),
        Arc::new(NoopSummarizer),
    );

    let report = checker.run(id).await.expect("failure is a report");

    assert_eq!(report.outcome, OutcomeKind::Failed);
    assert!(report
        .observation
        .outcome
        .error()
        .is_some_and(|e| e.contains("timed out")));
}

#[tokio::test]
async fn unreadable_page_records_failed_observation() {
    let store = MemoryStore::new();
    let id = store.add_resource("https://example.com/tiny");
    let checker = pipeline(
        FakeFetcher::serving(vec![FakePage::Html(page("Hello"))]),
        store.clone(),
        FakeSummarizer::summarizing("x"),
    );

    let report = checker.run(id).await.expect("failure is a report");

    assert_eq!(report.outcome, OutcomeKind::Failed);
    let error = report.observation.outcome.error().expect("error detail");
    assert!(error.starts_with("content not extractable"), "unexpected message: {error}");
    assert!(report.observation.outcome.text().is_none());
}

#[tokio::test]
async fn failures_never_advance_the_baseline() {
    let store = MemoryStore::new();
    let id = store.add_resource("https://example.com/hours");
    let checker = pipeline(
        FakeFetcher::serving(vec![
            FakePage::Status(500),
            FakePage::Html(page(PAGE_V1)),
            FakePage::Status(503),
            FakePage::Html(page(PAGE_V2)),
        ]),
        store.clone(),
        Arc::new(NoopSummarizer),
    );

    assert_eq!(checker.run(id).await.expect("1").outcome, OutcomeKind::Failed);
    assert_eq!(checker.run(id).await.expect("2").outcome, OutcomeKind::Baseline);
    assert_eq!(checker.run(id).await.expect("3").outcome, OutcomeKind::Failed);

    let report = checker.run(id).await.expect("4");
    assert_eq!(report.outcome, OutcomeKind::Changed);
    let diff = report.diff.expect("diff");
    assert_eq!(reconstruct(&diff, SegmentKind::Added), PAGE_V1);
}

#[tokio::test]
async fn storage_failure_is_a_distinct_error() {
    let store = MemoryStore::new();
    let id = store.add_resource("https://example.com/hours");
    store.fail_inserts.store(true, Ordering::SeqCst);
    let checker = pipeline(
        FakeFetcher::serving(vec![FakePage::Html(page(PAGE_V1))]),
        store.clone(),
        Arc::new(NoopSummarizer),
    );

    let err = checker.run(id).await.expect_err("storage must fail");
    assert!(matches!(err, CheckError::Storage(_)));
    assert!(store.observations_for(id).is_empty());
}

#[tokio::test]
async fn script_payload_never_reaches_stored_text() {
    let store = MemoryStore::new();
    let id = store.add_resource("https://example.com/hours");
    let checker = pipeline(
        FakeFetcher::serving(vec![FakePage::Html(page(PAGE_V1))]),
        store.clone(),
        Arc::new(NoopSummarizer),
    );

    let report = checker.run(id).await.expect("check");
    match report.observation.outcome {
        Outcome::Baseline { text, summary, .. } => {
            assert!(!text.contains("var x"));
            assert!(summary.is_none());
        }
        other => panic!("expected baseline, got {other:?}"),
    }
}

#[tokio::test]
async fn hanging_summarizer_records_without_summary() {
    let store = MemoryStore::new();
    let id = store.add_resource("https://example.com/hours");
    let summarizer = FakeSummarizer::new(SummaryMode::Hang);
    let checker = pipeline(
        FakeFetcher::serving(vec![
            FakePage::Html(page(PAGE_V1)),
            FakePage::Html(page(PAGE_V2)),
        ]),
        store.clone(),
        summarizer.clone(),
    );

    let baseline = checker.run(id).await.expect("baseline");
    assert_eq!(baseline.outcome, OutcomeKind::Baseline);
    assert!(baseline.observation.outcome.summary().is_none());

    let report = checker.run(id).await.expect("changed");
    assert_eq!(report.outcome, OutcomeKind::Changed);
    assert!(report.observation.outcome.summary().is_none());
    assert!(report.diff.is_some());
    assert_eq!(summarizer.diff_calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.observations_for(id).len(), 2);
}

#[tokio::test]
async fn resource_deleted_mid_check_is_not_found() {
    let store = MemoryStore::new();
    let id = store.add_resource("https://example.com/hours");
    let deleting = store.clone();
    let checker = pipeline(
        FakeFetcher::serving(vec![FakePage::HtmlThen(
            page(PAGE_V1),
            Box::new(move || deleting.remove_resource(id)),
        )]),
        store.clone(),
        Arc::new(NoopSummarizer),
    );

    let err = checker.run(id).await.expect_err("resource is gone");

    assert!(matches!(err, CheckError::ResourceNotFound(gone) if gone == id));
    assert!(store.observations_for(id).is_empty());
}
