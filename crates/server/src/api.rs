use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use sightline_common::models::ReportDescriptor;
use sightline_error::{ErrorCode, SightlineError};
use sightline_runtime::{DateRangeSelector, ReportingEngine};

use crate::REPORT_REQUESTS;

pub fn create_api_router(engine: Arc<ReportingEngine>) -> Router {
    Router::new()
        .route("/kpi", get(list_reports))
        .route("/kpi/{report}", get(run_report))
        .with_state(engine)
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportParams {
    /// Optional date-range override; absent means "latest".
    #[serde(default)]
    pub range: Option<DateRangeSelector>,
}

async fn list_reports(
    State(engine): State<Arc<ReportingEngine>>,
) -> Json<Vec<ReportDescriptor>> {
    Json(engine.report_descriptors())
}

async fn run_report(
    State(engine): State<Arc<ReportingEngine>>,
    Path(report): Path<String>,
    Query(params): Query<ReportParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    REPORT_REQUESTS.inc();
    tracing::info!(report = %report, range = ?params.range, "Serving report");

    let body = engine
        .run_report(&report, params.range)
        .await
        .map_err(ApiError)?;
    Ok(Json(body))
}

/// Wrapper giving typed errors an HTTP rendering: the mapped status code
/// with the error's JSON serialization as body.
pub struct ApiError(pub SightlineError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0.code);
        tracing::error!(code = %self.0.code, status = status.as_u16(), "{}", self.0);
        (status, Json(self.0)).into_response()
    }
}

/// Status mapping per error kind: not-found conditions are client-visible
/// 404s, bad report names 400, upstream warehouse failures 502/504.
pub fn status_for(code: &ErrorCode) -> StatusCode {
    match code {
        ErrorCode::TableNotFound | ErrorCode::DatasetEmpty => StatusCode::NOT_FOUND,
        ErrorCode::UnknownReport => StatusCode::BAD_REQUEST,
        ErrorCode::ConnectionTimeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorCode::WarehouseUnavailable
        | ErrorCode::QueryExecution
        | ErrorCode::CredentialRejected => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
