use axum::{
    Router,
    routing::{delete, get},
};

pub mod system;
pub mod users;

/// Router for every `/api` endpoint.
pub fn router() -> Router {
    Router::new()
        .route("/healthz", get(system::healthz))
        .route(
            "/users",
            get(users::find_users).post(users::create_user).put(users::update_user),
        )
        .route("/users/:id", delete(users::remove_user))
}
