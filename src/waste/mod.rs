mod dto;
pub mod handlers;
pub mod model;
pub mod query;
mod services;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::waste_routes()
}
