pub mod dto;
pub mod entry;
pub mod handlers;
pub mod records;
pub mod repo;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::entry_routes())
        .merge(handlers::record_routes())
        .merge(handlers::water_routes())
        .merge(handlers::progress_routes())
}
