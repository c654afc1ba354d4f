use pagewatch_db::DbError;
use thiserror::Error;
use uuid::Uuid;

/// Failures that abort a check without recording an observation.
///
/// Fetch and extraction problems are not errors here: they are recorded as
/// `failed` observations and returned as a normal report.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("resource {0} not found")]
    ResourceNotFound(Uuid),

    #[error("the summarization service is overloaded; try again shortly")]
    SummarizerOverloaded,

    #[error("storage error: {0}")]
    Storage(#[from] DbError),
}
