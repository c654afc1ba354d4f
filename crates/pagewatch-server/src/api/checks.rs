//! Check and history handlers.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use pagewatch_check::{CheckError, CheckReport, HistoryEntry, HISTORY_LENGTH};

use crate::middleware::RequestId;

use super::{parse_resource_id, ApiError, ApiResponse, AppState, ResponseMeta};

fn map_check_error(request_id: &str, error: &CheckError) -> ApiError {
    match error {
        CheckError::ResourceNotFound(id) => {
            ApiError::new(request_id, "not_found", format!("resource {id} not found"))
        }
        CheckError::SummarizerOverloaded => {
            ApiError::new(request_id, "service_overloaded", error.to_string())
        }
        CheckError::Storage(e) => {
            tracing::error!(error = %e, "check storage failure");
            ApiError::new(request_id, "internal_error", "failed to record check result")
        }
    }
}

/// POST /api/v1/resources/{id}/check
///
/// A page that cannot be fetched or read is still a successful response
/// whose outcome is `failed`.
pub(super) async fn run_check(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(raw_id): Path<String>,
) -> Result<Json<ApiResponse<CheckReport>>, ApiError> {
    let rid = &req_id.0;
    let id = parse_resource_id(rid, &raw_id)?;

    let report = state
        .checker
        .run(id)
        .await
        .map_err(|e| map_check_error(rid, &e))?;

    Ok(Json(ApiResponse {
        data: report,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/resources/{id}/history
pub(super) async fn get_history(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(raw_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<HistoryEntry>>>, ApiError> {
    let rid = &req_id.0;
    let id = parse_resource_id(rid, &raw_id)?;

    let entries = state
        .checker
        .history(id, HISTORY_LENGTH)
        .await
        .map_err(|e| map_check_error(rid, &e))?;

    Ok(Json(ApiResponse {
        data: entries,
        meta: ResponseMeta::new(req_id.0),
    }))
}
