use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;

use super::dto::{
    CreateWasteRequest, LogResponse, LogsResponse, RecentParams, UpdateWasteRequest, WastePage,
};
use super::query::{recent_limit, WasteListParams};
use super::services;
use crate::{
    auth::extractors::CurrentUser, error::AppError, response::ApiResponse, state::AppState,
    validation::ValidJson,
};

pub fn waste_routes() -> Router<AppState> {
    Router::new()
        .route("/waste", get(list_waste).post(create_waste))
        .route("/waste/recent", get(recent_waste))
        .route(
            "/waste/:id",
            get(get_waste).put(update_waste).delete(delete_waste),
        )
}

#[instrument(skip(state, current, payload))]
pub async fn create_waste(
    State(state): State<AppState>,
    current: CurrentUser,
    ValidJson(payload): ValidJson<CreateWasteRequest>,
) -> Result<(StatusCode, Json<ApiResponse<LogResponse>>), AppError> {
    let new = payload.parse().map_err(AppError::Validation)?;
    let log = services::create(state.store.as_ref(), &current.user, new).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(LogResponse { log })))
}

#[instrument(skip(state, current))]
pub async fn list_waste(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(params): Query<WasteListParams>,
) -> Result<Json<ApiResponse<WastePage>>, AppError> {
    let page = services::list(state.store.as_ref(), &current.principal, &params).await?;
    Ok(ApiResponse::ok(page))
}

#[instrument(skip(state, current))]
pub async fn recent_waste(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(params): Query<RecentParams>,
) -> Result<Json<ApiResponse<LogsResponse>>, AppError> {
    let limit = recent_limit(params.limit.as_deref());
    let logs = services::recent(state.store.as_ref(), &current.principal, limit).await?;
    Ok(ApiResponse::ok(LogsResponse { logs }))
}

#[instrument(skip(state, current))]
pub async fn get_waste(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<LogResponse>>, AppError> {
    let log = services::get(state.store.as_ref(), &current.principal, &id).await?;
    Ok(ApiResponse::ok(LogResponse { log }))
}

#[instrument(skip(state, current, payload))]
pub async fn update_waste(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    ValidJson(payload): ValidJson<UpdateWasteRequest>,
) -> Result<Json<ApiResponse<LogResponse>>, AppError> {
    let changes = payload.parse().map_err(AppError::Validation)?;
    let log = services::update(state.store.as_ref(), &current.principal, &id, changes).await?;
    Ok(ApiResponse::ok_with_message("Log updated", LogResponse { log }))
}

#[instrument(skip(state, current))]
pub async fn delete_waste(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    services::delete(state.store.as_ref(), &current.principal, &id).await?;
    Ok(ApiResponse::message("Log deleted"))
}
