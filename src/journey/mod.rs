mod dto;
pub mod engine;
pub mod handlers;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub use engine::{RingColor, JOURNEY_WEEKS};

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::read_routes())
        .merge(handlers::write_routes())
}
