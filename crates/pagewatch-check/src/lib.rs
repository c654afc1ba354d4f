//! The "check now" pipeline: fetch a monitored page, extract its text,
//! compare it with the last good observation, and record what happened.

pub mod diff;
pub mod error;
pub mod fingerprint;
pub mod history;
pub mod pipeline;
pub mod traits;

pub use diff::{added_text, diff_words, reconstruct, removed_text, DiffSegment, SegmentKind};
pub use error::CheckError;
pub use fingerprint::fingerprint;
pub use history::{load_history, HistoryEntry, HISTORY_LENGTH};
pub use pipeline::{CheckPipeline, CheckReport, CheckSettings};
pub use traits::{ChangeSummarizer, CheckStore, NoopSummarizer, PageFetcher};
