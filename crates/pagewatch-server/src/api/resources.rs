//! Monitored resource handlers.
//!
//! - `GET    /api/v1/resources`       list with latest observation status
//! - `POST   /api/v1/resources`       add a URL
//! - `GET    /api/v1/resources/{id}`  one resource with its latest observation
//! - `DELETE /api/v1/resources/{id}`  remove a resource and its history

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use pagewatch_core::{MonitoredResource, Observation};
use pagewatch_db::{DbError, NewResource};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, parse_resource_id, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct CreateResourceRequest {
    pub url: String,
    pub title: Option<String>,
    pub group_label: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct ResourceListItem {
    pub id: Uuid,
    pub url: String,
    pub title: Option<String>,
    pub group_label: String,
    pub created_at: DateTime<Utc>,
    pub last_outcome: Option<String>,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl From<pagewatch_db::ResourceStatusRow> for ResourceListItem {
    fn from(row: pagewatch_db::ResourceStatusRow) -> Self {
        Self {
            id: row.public_id,
            url: row.url,
            title: row.title,
            group_label: row.group_label,
            created_at: row.created_at,
            last_outcome: row.last_outcome,
            last_checked_at: row.last_checked_at,
            last_error: row.last_error,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct ResourceDetail {
    #[serde(flatten)]
    pub resource: MonitoredResource,
    pub latest_observation: Option<Observation>,
}

fn map_create_error(req_id: &str, e: &DbError) -> ApiError {
    match e {
        DbError::Duplicate { url } => ApiError::new(
            req_id,
            "conflict",
            format!("{url} is already being monitored"),
        ),
        DbError::LimitReached { max } => ApiError::new(
            req_id,
            "limit_reached",
            format!("cannot monitor more than {max} resources"),
        ),
        other => map_db_error(req_id.to_owned(), other),
    }
}

async fn resolve_resource(
    state: &AppState,
    id: Uuid,
    request_id: &str,
) -> Result<MonitoredResource, ApiError> {
    pagewatch_db::get_resource(&state.pool, id)
        .await
        .map_err(|e| map_db_error(request_id.to_owned(), &e))?
        .map(pagewatch_db::ResourceRow::into_resource)
        .ok_or_else(|| ApiError::new(request_id, "not_found", format!("resource {id} not found")))
}

/// GET /api/v1/resources
pub(super) async fn list_resources(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<ResourceListItem>>>, ApiError> {
    let rows = pagewatch_db::list_resources(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(ResourceListItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/resources
///
/// The URL is normalized before the duplicate check, so trivially different
/// spellings of one page are rejected as conflicts.
pub(super) async fn create_resource(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    payload: Result<Json<CreateResourceRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<MonitoredResource>>), ApiError> {
    let rid = &req_id.0;
    let Json(body) = payload.map_err(|rejection| {
        ApiError::new(rid, "bad_request", rejection.body_text())
    })?;

    let url = pagewatch_core::normalize_url(&body.url)
        .map_err(|e| ApiError::new(rid, "validation_error", e.to_string()))?;
    let title = pagewatch_core::validate_title(body.title.as_deref())
        .map_err(|e| ApiError::new(rid, "validation_error", e.to_string()))?;
    let group_label = pagewatch_core::validate_group_label(body.group_label.as_deref())
        .map_err(|e| ApiError::new(rid, "validation_error", e.to_string()))?;

    let row = pagewatch_db::create_resource(
        &state.pool,
        &NewResource {
            url: &url,
            title: title.as_deref(),
            group_label: &group_label,
        },
        state.max_resources,
    )
    .await
    .map_err(|e| map_create_error(rid, &e))?;

    tracing::info!(resource_id = %row.public_id, url = %row.url, "resource added");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: row.into_resource(),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// GET /api/v1/resources/{id}
pub(super) async fn get_resource(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(raw_id): Path<String>,
) -> Result<Json<ApiResponse<ResourceDetail>>, ApiError> {
    let rid = &req_id.0;
    let id = parse_resource_id(rid, &raw_id)?;
    let resource = resolve_resource(&state, id, rid).await?;

    let latest_observation = pagewatch_db::list_observations(&state.pool, id, 1)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .into_iter()
        .next()
        .map(Observation::try_from)
        .transpose()
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: ResourceDetail {
            resource,
            latest_observation,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// DELETE /api/v1/resources/{id}
pub(super) async fn delete_resource(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(raw_id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let rid = &req_id.0;
    let id = parse_resource_id(rid, &raw_id)?;

    let deleted = pagewatch_db::delete_resource(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    if !deleted {
        return Err(ApiError::new(rid, "not_found", format!("resource {id} not found")));
    }

    tracing::info!(resource_id = %id, "resource deleted");

    Ok(Json(ApiResponse {
        data: serde_json::json!({ "deleted": true }),
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_maps_to_conflict() {
        let err = map_create_error(
            "req-1",
            &DbError::Duplicate {
                url: "https://example.com".to_owned(),
            },
        );
        assert_eq!(err.error.code, "conflict");
        assert!(err.error.message.contains("https://example.com"));
    }

    #[test]
    fn cap_maps_to_limit_reached() {
        let err = map_create_error("req-1", &DbError::LimitReached { max: 50 });
        assert_eq!(err.error.code, "limit_reached");
        assert!(err.error.message.contains("50"));
    }

    #[test]
    fn other_storage_errors_are_internal() {
        let err = map_create_error("req-1", &DbError::NotFound);
        assert_eq!(err.error.code, "internal_error");
    }

    #[test]
    fn detail_serializes_resource_fields_flat() {
        let detail = ResourceDetail {
            resource: MonitoredResource {
                id: Uuid::nil(),
                url: "https://example.com".to_owned(),
                title: None,
                group_label: "default".to_owned(),
                created_at: Utc::now(),
            },
            latest_observation: None,
        };
        let json = serde_json::to_value(&detail).expect("serialize");
        assert_eq!(json["url"], "https://example.com");
        assert!(json["latest_observation"].is_null());
    }
}
