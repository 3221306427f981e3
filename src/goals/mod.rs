//! Legacy goals: dated checklist items. Separate from the three weekly focus
//! activities on the journey, which are rated each week instead of ticked off.

mod dto;
pub mod handlers;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::read_routes())
        .merge(handlers::write_routes())
}
