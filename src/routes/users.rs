use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch, post},
};
use uuid::Uuid;

use crate::{
    dto::users::{
        AdminCheck, AdminCheckQuery, BulkRoleResult, BulkUpdateRolesRequest, EmailQuery,
        EmailRequest, ProfileList, UpdateProfileRequest, UpdateRoleRequest, UserListQuery,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::Profile,
    response::ApiResponse,
    services::user_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/by-email", get(get_user_by_email))
        .route("/is-admin", get(check_is_admin))
        .route("/role", patch(update_role))
        .route("/roles/bulk", post(bulk_update_roles))
        .route("/grant-admin", post(grant_admin))
        .route("/revoke-admin", post(revoke_admin))
        .route("/{id}/profile", patch(update_profile))
}

#[utoipa::path(
    get,
    path = "/api/users",
    params(UserListQuery),
    responses(
        (status = 200, description = "List profiles, newest first", body = ApiResponse<ProfileList>),
        (status = 403, description = "Admin role required")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<UserListQuery>,
) -> AppResult<Json<ApiResponse<ProfileList>>> {
    let resp = user_service::list_users(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/users/by-email",
    params(EmailQuery),
    responses(
        (status = 200, description = "Profile for an email", body = ApiResponse<Profile>),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn get_user_by_email(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<EmailQuery>,
) -> AppResult<Json<ApiResponse<Profile>>> {
    let resp = user_service::get_user_by_email(&state, &user, &query.email).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/users/is-admin",
    params(AdminCheckQuery),
    responses(
        (status = 200, description = "Whether the profile has the admin role", body = ApiResponse<AdminCheck>)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn check_is_admin(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<AdminCheckQuery>,
) -> Json<ApiResponse<AdminCheck>> {
    Json(user_service::check_user_is_admin(&state, &user, query.user_id).await)
}

#[utoipa::path(
    patch,
    path = "/api/users/role",
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Change a user's role", body = ApiResponse<Profile>),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn update_role(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdateRoleRequest>,
) -> AppResult<Json<ApiResponse<Profile>>> {
    let resp = user_service::update_user_role(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/users/roles/bulk",
    request_body = BulkUpdateRolesRequest,
    responses(
        (status = 200, description = "Per-user outcome", body = ApiResponse<BulkRoleResult>),
        (status = 403, description = "Admin role required")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn bulk_update_roles(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<BulkUpdateRolesRequest>,
) -> AppResult<Json<ApiResponse<BulkRoleResult>>> {
    let resp = user_service::bulk_update_user_roles(&state, &user, payload.updates).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/users/grant-admin",
    request_body = EmailRequest,
    responses(
        (status = 200, description = "Grant the admin role", body = ApiResponse<Profile>),
        (status = 403, description = "Admin role required")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn grant_admin(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<EmailRequest>,
) -> AppResult<Json<ApiResponse<Profile>>> {
    let resp = user_service::grant_admin_access(&state, &user, &payload.email).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/users/revoke-admin",
    request_body = EmailRequest,
    responses(
        (status = 200, description = "Demote to student", body = ApiResponse<Profile>),
        (status = 403, description = "Admin role required")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn revoke_admin(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<EmailRequest>,
) -> AppResult<Json<ApiResponse<Profile>>> {
    let resp = user_service::revoke_admin_access(&state, &user, &payload.email).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/users/{id}/profile",
    params(("id" = Uuid, Path, description = "Profile ID")),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Update profile details", body = ApiResponse<Profile>),
        (status = 403, description = "Only the owner or an admin"),
        (status = 404, description = "Profile not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<ApiResponse<Profile>>> {
    let resp = user_service::update_user_profile(&state, &user, id, payload).await?;
    Ok(Json(resp))
}
