use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{patch, post, put},
};
use uuid::Uuid;

use crate::{
    dto::curriculum::{
        CreateLessonRequest, ReorderRequest, ReorderResult, UpdateLessonRequest,
        UpdateModuleRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::{Lesson, Module},
    response::ApiResponse,
    services::curriculum_service,
    state::AppState,
};

pub fn modules_router() -> Router<AppState> {
    Router::new()
        .route("/{id}", patch(update_module).delete(delete_module))
        .route("/{id}/lessons", post(create_lesson))
        .route("/{id}/lessons/reorder", put(reorder_lessons))
}

pub fn lessons_router() -> Router<AppState> {
    Router::new().route("/{id}", patch(update_lesson).delete(delete_lesson))
}

#[utoipa::path(
    patch,
    path = "/api/modules/{id}",
    params(("id" = Uuid, Path, description = "Module ID")),
    request_body = UpdateModuleRequest,
    responses(
        (status = 200, description = "Update module", body = ApiResponse<Module>),
        (status = 403, description = "Not the course owner"),
        (status = 404, description = "Module not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Curriculum"
)]
pub async fn update_module(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateModuleRequest>,
) -> AppResult<Json<ApiResponse<Module>>> {
    let resp = curriculum_service::update_module(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/modules/{id}",
    params(("id" = Uuid, Path, description = "Module ID")),
    responses(
        (status = 200, description = "Delete module and its lessons"),
        (status = 403, description = "Not the course owner"),
        (status = 404, description = "Module not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Curriculum"
)]
pub async fn delete_module(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = curriculum_service::delete_module(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/modules/{id}/lessons",
    params(("id" = Uuid, Path, description = "Module ID")),
    request_body = CreateLessonRequest,
    responses(
        (status = 200, description = "Create lesson", body = ApiResponse<Lesson>),
        (status = 403, description = "Not the course owner"),
        (status = 404, description = "Module not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Curriculum"
)]
pub async fn create_lesson(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateLessonRequest>,
) -> AppResult<Json<ApiResponse<Lesson>>> {
    let resp = curriculum_service::create_lesson(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/modules/{id}/lessons/reorder",
    params(("id" = Uuid, Path, description = "Module ID")),
    request_body = ReorderRequest,
    responses(
        (status = 200, description = "Per-id outcome of the reorder", body = ApiResponse<ReorderResult>),
        (status = 403, description = "Not the course owner")
    ),
    security(("bearer_auth" = [])),
    tag = "Curriculum"
)]
pub async fn reorder_lessons(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReorderRequest>,
) -> AppResult<Json<ApiResponse<ReorderResult>>> {
    let resp = curriculum_service::reorder_lessons(&state, &user, id, payload.ids).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/lessons/{id}",
    params(("id" = Uuid, Path, description = "Lesson ID")),
    request_body = UpdateLessonRequest,
    responses(
        (status = 200, description = "Update lesson", body = ApiResponse<Lesson>),
        (status = 403, description = "Not the course owner"),
        (status = 404, description = "Lesson not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Curriculum"
)]
pub async fn update_lesson(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateLessonRequest>,
) -> AppResult<Json<ApiResponse<Lesson>>> {
    let resp = curriculum_service::update_lesson(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/lessons/{id}",
    params(("id" = Uuid, Path, description = "Lesson ID")),
    responses(
        (status = 200, description = "Delete lesson"),
        (status = 403, description = "Not the course owner"),
        (status = 404, description = "Lesson not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Curriculum"
)]
pub async fn delete_lesson(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = curriculum_service::delete_lesson(&state, &user, id).await?;
    Ok(Json(resp))
}
