//! Database operations for the `monitored_resources` table.

use chrono::{DateTime, Utc};
use pagewatch_core::MonitoredResource;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{is_unique_violation, DbError};

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `monitored_resources` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ResourceRow {
    pub id: i64,
    pub public_id: Uuid,
    pub url: String,
    pub title: Option<String>,
    pub group_label: String,
    pub created_at: DateTime<Utc>,
}

impl ResourceRow {
    #[must_use]
    pub fn into_resource(self) -> MonitoredResource {
        MonitoredResource {
            id: self.public_id,
            url: self.url,
            title: self.title,
            group_label: self.group_label,
            created_at: self.created_at,
        }
    }
}

/// A resource joined with its most recent observation of any outcome.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ResourceStatusRow {
    pub public_id: Uuid,
    pub url: String,
    pub title: Option<String>,
    pub group_label: String,
    pub created_at: DateTime<Utc>,
    pub last_outcome: Option<String>,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

pub struct NewResource<'a> {
    /// Must already be normalized.
    pub url: &'a str,
    pub title: Option<&'a str>,
    pub group_label: &'a str,
}

const RESOURCE_COLUMNS: &str = "id, public_id, url, title, group_label, created_at";

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Inserts a resource after checking the URL is unused and the cap is not hit.
///
/// The table is locked for the duration of the transaction so that two
/// concurrent adds cannot both slip under the cap.
///
/// # Errors
///
/// - [`DbError::Duplicate`] if the normalized URL is already tracked.
/// - [`DbError::LimitReached`] if `max_resources` resources already exist.
/// - [`DbError::Sqlx`] on any other database failure.
pub async fn create_resource(
    pool: &PgPool,
    new: &NewResource<'_>,
    max_resources: i64,
) -> Result<ResourceRow, DbError> {
    let mut tx = pool.begin().await?;

    sqlx::query("LOCK TABLE monitored_resources IN SHARE ROW EXCLUSIVE MODE")
        .execute(&mut *tx)
        .await?;

    let existing = sqlx::query_scalar::<_, i64>("SELECT id FROM monitored_resources WHERE url = $1")
        .bind(new.url)
        .fetch_optional(&mut *tx)
        .await?;
    if existing.is_some() {
        return Err(DbError::Duplicate {
            url: new.url.to_owned(),
        });
    }

    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM monitored_resources")
        .fetch_one(&mut *tx)
        .await?;
    if count >= max_resources {
        return Err(DbError::LimitReached { max: max_resources });
    }

    let row = sqlx::query_as::<_, ResourceRow>(&format!(
        "INSERT INTO monitored_resources (public_id, url, title, group_label) \
         VALUES ($1, $2, $3, $4) \
         RETURNING {RESOURCE_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(new.url)
    .bind(new.title)
    .bind(new.group_label)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            DbError::Duplicate {
                url: new.url.to_owned(),
            }
        } else {
            DbError::Sqlx(e)
        }
    })?;

    tx.commit().await?;
    Ok(row)
}

/// Deletes a resource; its observations go with it via `ON DELETE CASCADE`.
///
/// Returns `false` when no resource had the given id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_resource(pool: &PgPool, public_id: Uuid) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM monitored_resources WHERE public_id = $1")
        .bind(public_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_resource(pool: &PgPool, public_id: Uuid) -> Result<Option<ResourceRow>, DbError> {
    let row = sqlx::query_as::<_, ResourceRow>(&format!(
        "SELECT {RESOURCE_COLUMNS} FROM monitored_resources WHERE public_id = $1"
    ))
    .bind(public_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Looks a resource up by its normalized URL.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_resource_by_url(pool: &PgPool, url: &str) -> Result<Option<ResourceRow>, DbError> {
    let row = sqlx::query_as::<_, ResourceRow>(&format!(
        "SELECT {RESOURCE_COLUMNS} FROM monitored_resources WHERE url = $1"
    ))
    .bind(url)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_resources(pool: &PgPool) -> Result<i64, DbError> {
    Ok(
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM monitored_resources")
            .fetch_one(pool)
            .await?,
    )
}

/// Returns every resource with its latest observation, newest resources first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_resources(pool: &PgPool) -> Result<Vec<ResourceStatusRow>, DbError> {
    let rows = sqlx::query_as::<_, ResourceStatusRow>(
        "SELECT r.public_id, r.url, r.title, r.group_label, r.created_at, \
                o.outcome AS last_outcome, o.fetched_at AS last_checked_at, \
                o.error_message AS last_error \
         FROM monitored_resources r \
         LEFT JOIN LATERAL ( \
             SELECT outcome, fetched_at, error_message \
             FROM observations \
             WHERE resource_id = r.id \
             ORDER BY fetched_at DESC, id DESC \
             LIMIT 1 \
         ) o ON TRUE \
         ORDER BY r.created_at DESC, r.id DESC",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
