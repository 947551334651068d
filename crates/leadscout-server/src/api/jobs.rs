use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

const DEFAULT_JOB_TYPE: &str = "reddit_discovery";

#[derive(Debug, Deserialize)]
pub(super) struct JobsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateJobBody {
    owner_id: Uuid,
    product_id: Uuid,
    job_type: Option<String>,
    interval_minutes: i32,
}

#[derive(Debug, Serialize)]
pub(super) struct JobItem {
    job_id: Uuid,
    owner_id: Uuid,
    product_id: Uuid,
    job_type: String,
    interval_minutes: i32,
    status: String,
    next_run: DateTime<Utc>,
    last_run: Option<DateTime<Utc>>,
    retry_count: i32,
    created_at: DateTime<Utc>,
}

impl From<leadscout_db::JobRow> for JobItem {
    fn from(row: leadscout_db::JobRow) -> Self {
        JobItem {
            job_id: row.public_id,
            owner_id: row.owner_id,
            product_id: row.product_id,
            job_type: row.job_type,
            interval_minutes: row.interval_minutes,
            status: row.status,
            next_run: row.next_run,
            last_run: row.last_run,
            retry_count: row.retry_count,
            created_at: row.created_at,
        }
    }
}

pub(super) async fn list_jobs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<JobsQuery>,
) -> Result<Json<ApiResponse<Vec<JobItem>>>, ApiError> {
    let rows = leadscout_db::list_jobs(&state.pool, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(JobItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn create_job(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateJobBody>,
) -> Result<Json<ApiResponse<JobItem>>, ApiError> {
    if body.interval_minutes <= 0 {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "interval_minutes must be positive",
        ));
    }

    let job_type = body.job_type.as_deref().unwrap_or(DEFAULT_JOB_TYPE);

    let row = leadscout_db::create_job(
        &state.pool,
        body.owner_id,
        body.product_id,
        job_type,
        body.interval_minutes,
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: JobItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Serialize)]
pub(super) struct CancelResult {
    job_id: Uuid,
    cancelled: bool,
}

pub(super) async fn cancel_job(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<ApiResponse<CancelResult>>, ApiError> {
    let cancelled = leadscout_db::cancel_job(&state.pool, job_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    if !cancelled {
        return Err(ApiError::new(
            req_id.0,
            "not_found",
            "job does not exist or is already cancelled",
        ));
    }

    Ok(Json(ApiResponse {
        data: CancelResult {
            job_id,
            cancelled,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
