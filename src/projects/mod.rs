use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub mod dto;
pub mod fields;
pub mod handlers;
pub mod repo;
pub mod repo_types;
pub mod services;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/applications",
            get(handlers::list_applications).post(handlers::submit),
        )
        .route("/applications/:id/approve", post(handlers::approve_project))
        .route("/applications/:id/reject", post(handlers::reject_project))
        .route("/projects", get(handlers::list_projects))
        .route(
            "/projects/:id",
            get(handlers::get_project)
                .put(handlers::update_project)
                .delete(handlers::delete_project),
        )
        .route("/stats", get(handlers::stats))
}
