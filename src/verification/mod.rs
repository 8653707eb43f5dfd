use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod handlers;
pub mod request_id;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
