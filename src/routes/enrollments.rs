use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, patch, post, put},
};
use uuid::Uuid;

use crate::{
    dto::enrollments::{
        CertificateOverview, ProgressOverview, ProgressRequest, UpdateEnrollmentRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::Enrollment,
    response::ApiResponse,
    services::enrollment_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}", patch(update_enrollment).delete(unenroll))
        .route("/{id}/progress", put(update_progress))
        .route("/{id}/certificate", post(issue_certificate))
}

/// Routes scoped to the caller, mounted under `/me`.
pub fn me_router() -> Router<AppState> {
    Router::new()
        .route("/progress", get(my_progress))
        .route("/certificates", get(my_certificates))
}

#[utoipa::path(
    patch,
    path = "/api/enrollments/{id}",
    params(("id" = Uuid, Path, description = "Enrollment ID")),
    request_body = UpdateEnrollmentRequest,
    responses(
        (status = 200, description = "Update enrollment fields", body = ApiResponse<Enrollment>),
        (status = 403, description = "Not the course owner"),
        (status = 404, description = "Enrollment not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Enrollments"
)]
pub async fn update_enrollment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateEnrollmentRequest>,
) -> AppResult<Json<ApiResponse<Enrollment>>> {
    let resp = enrollment_service::update_enrollment(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/enrollments/{id}",
    params(("id" = Uuid, Path, description = "Enrollment ID")),
    responses(
        (status = 200, description = "Remove enrollment"),
        (status = 403, description = "Neither the student nor the course owner"),
        (status = 404, description = "Enrollment not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Enrollments"
)]
pub async fn unenroll(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = enrollment_service::unenroll_student(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/enrollments/{id}/progress",
    params(("id" = Uuid, Path, description = "Enrollment ID")),
    request_body = ProgressRequest,
    responses(
        (status = 200, description = "Record progress", body = ApiResponse<Enrollment>),
        (status = 400, description = "Progress outside 0..=100"),
        (status = 403, description = "Neither the student nor the course owner")
    ),
    security(("bearer_auth" = [])),
    tag = "Enrollments"
)]
pub async fn update_progress(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProgressRequest>,
) -> AppResult<Json<ApiResponse<Enrollment>>> {
    let resp = enrollment_service::update_progress(&state, &user, id, payload.progress).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/enrollments/{id}/certificate",
    params(("id" = Uuid, Path, description = "Enrollment ID")),
    responses(
        (status = 200, description = "Issue completion certificate", body = ApiResponse<Enrollment>),
        (status = 400, description = "Course not completed or certificates disabled")
    ),
    security(("bearer_auth" = [])),
    tag = "Enrollments"
)]
pub async fn issue_certificate(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Enrollment>>> {
    let resp = enrollment_service::issue_certificate(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/me/progress",
    responses(
        (status = 200, description = "Caller's learning progress", body = ApiResponse<ProgressOverview>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Enrollments"
)]
pub async fn my_progress(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<ProgressOverview>>> {
    let resp = enrollment_service::my_progress(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/me/certificates",
    responses(
        (status = 200, description = "Caller's completed courses", body = ApiResponse<CertificateOverview>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Enrollments"
)]
pub async fn my_certificates(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<CertificateOverview>>> {
    let resp = enrollment_service::my_certificates(&state, &user).await?;
    Ok(Json(resp))
}
