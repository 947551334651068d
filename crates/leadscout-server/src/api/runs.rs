use axum::{extract::State, Extension, Json};
use serde::Serialize;

use leadscout_engine::TickSummary;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

/// Manually triggers one scheduling pass.
///
/// Safe to call while the cron tick is running: the engine no-ops on
/// overlap in-process, and the database claim protects against other
/// instances.
pub(super) async fn trigger_run(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<TickSummary>>, ApiError> {
    let summary = state
        .engine
        .process_due_jobs()
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: summary,
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Serialize)]
pub(super) struct SchedulerStatus {
    /// Whether a tick is executing in this process right now.
    is_running: bool,
    /// Jobs currently eligible for the next tick.
    due_jobs: usize,
}

pub(super) async fn scheduler_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<SchedulerStatus>>, ApiError> {
    let due = leadscout_db::list_due_jobs(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: SchedulerStatus {
            is_running: state.engine.is_running(),
            due_jobs: due.len(),
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
