use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use tracing::instrument;

use super::dto::{UpdateUserRequest, UserListParams, UserPage, UserResponse};
use super::services;
use crate::{
    auth::extractors::CurrentUser, error::AppError, response::ApiResponse, state::AppState,
    validation::ValidJson,
};

pub fn user_routes() -> Router<AppState> {
    Router::new().route("/users", get(list_users)).route(
        "/users/:id",
        get(get_user).put(update_user).delete(delete_user),
    )
}

#[instrument(skip(state, current))]
pub async fn list_users(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(params): Query<UserListParams>,
) -> Result<Json<ApiResponse<UserPage>>, AppError> {
    let page = services::list(state.store.as_ref(), &current.principal, &params).await?;
    Ok(ApiResponse::ok(page))
}

#[instrument(skip(state, current))]
pub async fn get_user(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<UserResponse>>, AppError> {
    let user = services::get(state.store.as_ref(), &current.principal, &id).await?;
    Ok(ApiResponse::ok(UserResponse { user }))
}

#[instrument(skip(state, current, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    ValidJson(payload): ValidJson<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, AppError> {
    let user = services::update(state.store.as_ref(), &current.principal, &id, &payload).await?;
    Ok(ApiResponse::ok_with_message("User updated", UserResponse { user }))
}

#[instrument(skip(state, current))]
pub async fn delete_user(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    services::delete(state.store.as_ref(), &current.principal, &id).await?;
    Ok(ApiResponse::message("User deleted"))
}
