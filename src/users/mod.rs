use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::state::AppState;

pub mod handlers;
pub mod repo;
pub mod repo_types;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(handlers::list_users))
        .route("/users/me", get(handlers::me))
        .route("/users/:id/approve", post(handlers::approve_user))
        .route("/users/:id/reject", post(handlers::reject_user))
        .route("/users/:id", delete(handlers::delete_user))
}
