mod dto;
mod handlers;
mod jwt;
mod password;
mod repo;

pub use jwt::AuthUser;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::auth_routes())
        .merge(handlers::me_routes())
}
