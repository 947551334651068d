use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use leadscout_core::Verdict;

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct LeadsQuery {
    pub owner_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct LeadItem {
    lead_id: Uuid,
    owner_id: Uuid,
    product_id: Uuid,
    external_id: String,
    title: String,
    source_community: String,
    author: String,
    score: i64,
    comment_count: i64,
    url: String,
    status: String,
    verdict: Verdict,
    created_at: DateTime<Utc>,
}

impl From<leadscout_db::LeadRow> for LeadItem {
    fn from(row: leadscout_db::LeadRow) -> Self {
        LeadItem {
            lead_id: row.public_id,
            owner_id: row.owner_id,
            product_id: row.product_id,
            external_id: row.external_id,
            title: row.title,
            source_community: row.source_community,
            author: row.author,
            score: row.score,
            comment_count: row.comment_count,
            url: row.url,
            status: row.status,
            verdict: row.verdict.0,
            created_at: row.created_at,
        }
    }
}

pub(super) async fn list_leads(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<LeadsQuery>,
) -> Result<Json<ApiResponse<Vec<LeadItem>>>, ApiError> {
    let rows = leadscout_db::list_leads(
        &state.pool,
        query.owner_id,
        query.product_id,
        normalize_limit(query.limit),
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(LeadItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}
