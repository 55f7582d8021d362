use axum::{routing::post, Router};

use crate::state::AppState;

pub mod claims;
pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod rate_limit;
pub mod repo;
pub mod repo_types;
pub mod services;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/login", post(handlers::admin_login))
        .route("/auth/refresh", post(handlers::refresh))
        .route("/users/register", post(handlers::register))
        .route("/users/login", post(handlers::user_login))
}
