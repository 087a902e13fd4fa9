use axum::Router;

use crate::state::AppState;

pub mod admin;
pub mod auth;
pub mod courses;
pub mod curriculum;
pub mod dashboard;
pub mod doc;
pub mod enrollments;
pub mod health;
pub mod params;
pub mod payments;
pub mod users;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/courses", courses::router())
        .nest("/modules", curriculum::modules_router())
        .nest("/lessons", curriculum::lessons_router())
        .nest("/enrollments", enrollments::router())
        .nest("/me", enrollments::me_router())
        .nest("/users", users::router())
        .nest("/admin", admin::router())
        .nest("/payments", payments::router())
        .nest("/dashboard", dashboard::router())
}
