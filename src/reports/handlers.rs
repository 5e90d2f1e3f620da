use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use tracing::instrument;

use super::aggregation::{self, BreakdownReport, DashboardStats, ReportParams};
use crate::{
    auth::{extractors::CurrentUser, policy::require_admin},
    error::AppError,
    response::ApiResponse,
    state::AppState,
};

pub fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/reports", get(breakdown))
        .route("/reports/dashboard", get(dashboard))
}

#[instrument(skip(state, current))]
pub async fn dashboard(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<ApiResponse<DashboardStats>>, AppError> {
    require_admin(&current.principal)?;
    let stats = aggregation::dashboard_stats(state.store.as_ref()).await?;
    Ok(ApiResponse::ok(stats))
}

#[instrument(skip(state, current))]
pub async fn breakdown(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(params): Query<ReportParams>,
) -> Result<Json<ApiResponse<BreakdownReport>>, AppError> {
    require_admin(&current.principal)?;
    let report = aggregation::breakdown_report(state.store.as_ref(), &params).await?;
    Ok(ApiResponse::ok(report))
}
