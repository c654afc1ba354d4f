//! Database operations for the `observations` table.
//!
//! Observations are append-only. Ordering is `(fetched_at, id)` so that two
//! checks landing in the same instant still have a stable sequence.

use chrono::{DateTime, Utc};
use pagewatch_core::{ChangeSummary, Observation, Outcome, OutcomeKind};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from `observations`, joined to its resource's public id.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ObservationRow {
    pub id: i64,
    pub public_id: Uuid,
    pub resource_public_id: Uuid,
    pub fetched_at: DateTime<Utc>,
    pub outcome: String,
    pub content_text: Option<String>,
    pub fingerprint: Option<String>,
    pub summary: Option<serde_json::Value>,
    pub error_message: Option<String>,
}

const OBSERVATION_COLUMNS: &str = "o.id, o.public_id, r.public_id AS resource_public_id, \
     o.fetched_at, o.outcome, o.content_text, o.fingerprint, o.summary, o.error_message";

fn missing(field: &str, id: Uuid) -> DbError {
    DbError::InvalidRow(format!("observation {id} has no {field}"))
}

impl TryFrom<ObservationRow> for Observation {
    type Error = DbError;

    fn try_from(row: ObservationRow) -> Result<Self, Self::Error> {
        let id = row.public_id;
        let kind: OutcomeKind = row
            .outcome
            .parse()
            .map_err(|e: pagewatch_core::CoreError| DbError::InvalidRow(e.to_string()))?;

        let summary = row
            .summary
            .map(serde_json::from_value::<ChangeSummary>)
            .transpose()?;

        let outcome = if kind == OutcomeKind::Failed {
            Outcome::Failed {
                error: row.error_message.ok_or_else(|| missing("error_message", id))?,
            }
        } else {
            let text = row.content_text.ok_or_else(|| missing("content_text", id))?;
            let fingerprint = row.fingerprint.ok_or_else(|| missing("fingerprint", id))?;
            match kind {
                OutcomeKind::Baseline => Outcome::Baseline {
                    text,
                    fingerprint,
                    summary,
                },
                OutcomeKind::Changed => Outcome::Changed {
                    text,
                    fingerprint,
                    summary,
                },
                _ => Outcome::Unchanged { text, fingerprint },
            }
        };

        Ok(Observation {
            id,
            resource_id: row.resource_public_id,
            fetched_at: row.fetched_at,
            outcome,
        })
    }
}

/// Appends one observation for the resource with public id `resource_id`.
///
/// # Errors
///
/// - [`DbError::NotFound`] if the resource no longer exists.
/// - [`DbError::Json`] if the summary cannot be serialized.
/// - [`DbError::Sqlx`] if the insert fails, including when the row would
///   violate the payload constraints.
pub async fn insert_observation(
    pool: &PgPool,
    resource_id: Uuid,
    fetched_at: DateTime<Utc>,
    outcome: &Outcome,
) -> Result<Observation, DbError> {
    let public_id = Uuid::new_v4();
    let summary = outcome.summary().map(serde_json::to_value).transpose()?;

    let result = sqlx::query(
        "INSERT INTO observations \
             (public_id, resource_id, fetched_at, outcome, content_text, fingerprint, \
              summary, error_message) \
         SELECT $1, r.id, $3, $4, $5, $6, $7, $8 \
         FROM monitored_resources r \
         WHERE r.public_id = $2",
    )
    .bind(public_id)
    .bind(resource_id)
    .bind(fetched_at)
    .bind(outcome.kind().as_str())
    .bind(outcome.text())
    .bind(outcome.fingerprint())
    .bind(summary)
    .bind(outcome.error())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(Observation {
        id: public_id,
        resource_id,
        fetched_at,
        outcome: outcome.clone(),
    })
}

/// Most recent observations for a resource, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_observations(
    pool: &PgPool,
    resource_id: Uuid,
    limit: i64,
) -> Result<Vec<ObservationRow>, DbError> {
    let rows = sqlx::query_as::<_, ObservationRow>(&format!(
        "SELECT {OBSERVATION_COLUMNS} \
         FROM observations o \
         JOIN monitored_resources r ON r.id = o.resource_id \
         WHERE r.public_id = $1 \
         ORDER BY o.fetched_at DESC, o.id DESC \
         LIMIT $2"
    ))
    .bind(resource_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// The newest non-failed observation: the resource's current state.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn latest_comparable_observation(
    pool: &PgPool,
    resource_id: Uuid,
) -> Result<Option<ObservationRow>, DbError> {
    let row = sqlx::query_as::<_, ObservationRow>(&format!(
        "SELECT {OBSERVATION_COLUMNS} \
         FROM observations o \
         JOIN monitored_resources r ON r.id = o.resource_id \
         WHERE r.public_id = $1 AND o.outcome <> 'failed' \
         ORDER BY o.fetched_at DESC, o.id DESC \
         LIMIT 1"
    ))
    .bind(resource_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// The newest non-failed observation strictly older than `before`.
///
/// Returns `None` when `before` does not belong to the resource or nothing
/// comparable precedes it.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn previous_comparable_observation(
    pool: &PgPool,
    resource_id: Uuid,
    before: Uuid,
) -> Result<Option<ObservationRow>, DbError> {
    let row = sqlx::query_as::<_, ObservationRow>(&format!(
        "SELECT {OBSERVATION_COLUMNS} \
         FROM observations o \
         JOIN monitored_resources r ON r.id = o.resource_id \
         JOIN observations pivot ON pivot.public_id = $2 AND pivot.resource_id = r.id \
         WHERE r.public_id = $1 \
           AND o.outcome <> 'failed' \
           AND (o.fetched_at, o.id) < (pivot.fetched_at, pivot.id) \
         ORDER BY o.fetched_at DESC, o.id DESC \
         LIMIT 1"
    ))
    .bind(resource_id)
    .bind(before)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}
