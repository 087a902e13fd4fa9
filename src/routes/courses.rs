use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post, put},
};
use uuid::Uuid;

use crate::{
    dto::{
        courses::{CourseAnalytics, CourseDetail, CourseList, CreateCourseRequest, UpdateCourseRequest},
        curriculum::{CreateModuleRequest, ReorderRequest, ReorderResult},
        enrollments::{BulkEnrollRequest, EnrollRequest, EnrolledStudentList, EnrollmentList},
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::{Course, Enrollment, Module},
    response::ApiResponse,
    routes::params::CourseQuery,
    services::{course_service, curriculum_service, enrollment_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_courses).post(create_course))
        .route(
            "/{id}",
            get(get_course).patch(update_course).delete(delete_course),
        )
        .route("/{id}/duplicate", post(duplicate_course))
        .route("/{id}/publish", post(publish_course))
        .route("/{id}/unpublish", post(unpublish_course))
        .route("/{id}/analytics", get(course_analytics))
        .route("/{id}/modules", post(create_module))
        .route("/{id}/modules/reorder", put(reorder_modules))
        .route(
            "/{id}/enrollments",
            get(list_enrollments).post(enroll_student),
        )
        .route("/{id}/enrollments/bulk", post(bulk_enroll))
}

#[utoipa::path(
    get,
    path = "/api/courses",
    params(CourseQuery),
    responses(
        (status = 200, description = "List courses", body = ApiResponse<CourseList>),
        (status = 500, description = "Internal Server Error")
    ),
    tag = "Courses"
)]
pub async fn list_courses(
    State(state): State<AppState>,
    Query(query): Query<CourseQuery>,
) -> AppResult<Json<ApiResponse<CourseList>>> {
    let resp = course_service::list_courses(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/courses",
    request_body = CreateCourseRequest,
    responses(
        (status = 200, description = "Create course", body = ApiResponse<Course>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin or instructor role required"),
        (status = 409, description = "Slug already used")
    ),
    security(("bearer_auth" = [])),
    tag = "Courses"
)]
pub async fn create_course(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateCourseRequest>,
) -> AppResult<Json<ApiResponse<Course>>> {
    let resp = course_service::create_course(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/courses/{id}",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Course with curriculum", body = ApiResponse<CourseDetail>),
        (status = 404, description = "Course not found")
    ),
    tag = "Courses"
)]
pub async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<CourseDetail>>> {
    let resp = course_service::get_course(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/courses/{id}",
    params(("id" = Uuid, Path, description = "Course ID")),
    request_body = UpdateCourseRequest,
    responses(
        (status = 200, description = "Update course", body = ApiResponse<Course>),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Course not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Courses"
)]
pub async fn update_course(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCourseRequest>,
) -> AppResult<Json<ApiResponse<Course>>> {
    let resp = course_service::update_course(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/courses/{id}",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Delete course and its curriculum"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Course not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Courses"
)]
pub async fn delete_course(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = course_service::delete_course(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/courses/{id}/duplicate",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Unpublished copy of the course", body = ApiResponse<Course>),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Course not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Courses"
)]
pub async fn duplicate_course(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Course>>> {
    let resp = course_service::duplicate_course(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/courses/{id}/publish",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Publish course", body = ApiResponse<Course>),
        (status = 403, description = "Not the owner")
    ),
    security(("bearer_auth" = [])),
    tag = "Courses"
)]
pub async fn publish_course(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Course>>> {
    let resp = course_service::publish_course(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/courses/{id}/unpublish",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Unpublish course", body = ApiResponse<Course>),
        (status = 403, description = "Not the owner")
    ),
    security(("bearer_auth" = [])),
    tag = "Courses"
)]
pub async fn unpublish_course(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Course>>> {
    let resp = course_service::unpublish_course(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/courses/{id}/analytics",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Enrollment analytics", body = ApiResponse<CourseAnalytics>),
        (status = 403, description = "Not the owner")
    ),
    security(("bearer_auth" = [])),
    tag = "Courses"
)]
pub async fn course_analytics(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<CourseAnalytics>>> {
    let resp = course_service::get_course_analytics(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/courses/{id}/modules",
    params(("id" = Uuid, Path, description = "Course ID")),
    request_body = CreateModuleRequest,
    responses(
        (status = 200, description = "Create module", body = ApiResponse<Module>),
        (status = 403, description = "Not the owner")
    ),
    security(("bearer_auth" = [])),
    tag = "Curriculum"
)]
pub async fn create_module(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateModuleRequest>,
) -> AppResult<Json<ApiResponse<Module>>> {
    let resp = curriculum_service::create_module(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/courses/{id}/modules/reorder",
    params(("id" = Uuid, Path, description = "Course ID")),
    request_body = ReorderRequest,
    responses(
        (status = 200, description = "Per-id outcome of the reorder", body = ApiResponse<ReorderResult>),
        (status = 403, description = "Not the owner")
    ),
    security(("bearer_auth" = [])),
    tag = "Curriculum"
)]
pub async fn reorder_modules(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReorderRequest>,
) -> AppResult<Json<ApiResponse<ReorderResult>>> {
    let resp = curriculum_service::reorder_modules(&state, &user, id, payload.ids).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/courses/{id}/enrollments",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Enrolled students", body = ApiResponse<EnrolledStudentList>),
        (status = 403, description = "Not the owner")
    ),
    security(("bearer_auth" = [])),
    tag = "Enrollments"
)]
pub async fn list_enrollments(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<EnrolledStudentList>>> {
    let resp = enrollment_service::list_course_enrollments(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/courses/{id}/enrollments",
    params(("id" = Uuid, Path, description = "Course ID")),
    request_body = EnrollRequest,
    responses(
        (status = 200, description = "Enroll a student", body = ApiResponse<Enrollment>),
        (status = 403, description = "Not allowed to enroll this user"),
        (status = 409, description = "Student is already enrolled")
    ),
    security(("bearer_auth" = [])),
    tag = "Enrollments"
)]
pub async fn enroll_student(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<EnrollRequest>,
) -> AppResult<Json<ApiResponse<Enrollment>>> {
    let resp = enrollment_service::enroll_student(&state, &user, id, payload.user_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/courses/{id}/enrollments/bulk",
    params(("id" = Uuid, Path, description = "Course ID")),
    request_body = BulkEnrollRequest,
    responses(
        (status = 200, description = "Enroll several students at once", body = ApiResponse<EnrollmentList>),
        (status = 400, description = "Empty list"),
        (status = 409, description = "One of the students is already enrolled")
    ),
    security(("bearer_auth" = [])),
    tag = "Enrollments"
)]
pub async fn bulk_enroll(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<BulkEnrollRequest>,
) -> AppResult<Json<ApiResponse<EnrollmentList>>> {
    let resp = enrollment_service::bulk_enroll_students(&state, &user, id, payload.user_ids).await?;
    Ok(Json(resp))
}
