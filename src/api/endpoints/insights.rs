//! Diagnostic insight endpoints — the four cache operations.
//!
//! `GET    /api/insights/:test_result_id`          fetch-or-initiate
//! `POST   /api/insights/:test_result_id/analyze`  force refresh
//! `GET    /api/insights/:test_result_id/status`   poll the state machine
//! `DELETE /api/insights/:test_result_id`          remove the record

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::InsightRecord;
use crate::pipeline::analysis::AnalysisContext;
use crate::pipeline::StatusView;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightResponse {
    pub data: InsightRecord,
    pub cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub message: &'static str,
}

/// `GET /api/insights/:test_result_id` — cached insight or initiate
/// analysis. 200 with `cached: true` on a hit, 202 with `cached: false`
/// when a computation is pending or was just launched.
pub async fn fetch(
    State(ctx): State<ApiContext>,
    Path(test_result_id): Path<String>,
) -> Result<(StatusCode, Json<InsightResponse>), ApiError> {
    let outcome = ctx.insights.fetch_or_initiate(&test_result_id)?;
    if outcome.cached {
        Ok((
            StatusCode::OK,
            Json(InsightResponse {
                data: outcome.record,
                cached: true,
                message: None,
            }),
        ))
    } else {
        Ok((
            StatusCode::ACCEPTED,
            Json(InsightResponse {
                data: outcome.record,
                cached: false,
                message: Some("AI analysis initiated. Please check back in a few moments.".into()),
            }),
        ))
    }
}

/// `POST /api/insights/:test_result_id/analyze` — force a refresh.
/// Optional JSON body supplies extra engine context.
pub async fn analyze(
    State(ctx): State<ApiContext>,
    Path(test_result_id): Path<String>,
    payload: Option<Json<AnalysisContext>>,
) -> Result<(StatusCode, Json<InsightResponse>), ApiError> {
    let context = payload.map(|Json(c)| c).unwrap_or_default();
    let record = ctx.insights.force_refresh(&test_result_id, context)?;
    Ok((
        StatusCode::ACCEPTED,
        Json(InsightResponse {
            data: record,
            cached: false,
            message: Some("AI analysis triggered successfully.".into()),
        }),
    ))
}

/// `GET /api/insights/:test_result_id/status` — poll processing state.
pub async fn status(
    State(ctx): State<ApiContext>,
    Path(test_result_id): Path<String>,
) -> Result<Json<StatusView>, ApiError> {
    Ok(Json(ctx.insights.status(&test_result_id)?))
}

/// `DELETE /api/insights/:test_result_id` — remove the cached insight.
pub async fn remove(
    State(ctx): State<ApiContext>,
    Path(test_result_id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    ctx.insights.delete(&test_result_id)?;
    Ok(Json(DeleteResponse {
        message: "Insights deleted successfully",
    }))
}
