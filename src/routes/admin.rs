use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::HeaderMap,
    routing::{get, patch, post},
};
use uuid::Uuid;

use crate::{
    dto::{
        audit::{AuditLogList, AuditLogQuery},
        payments::{PaymentReport, UpdatePaymentStatusRequest},
        users::{
            CreateIdentityRequest, DeletedIdentity, EmailRequest, IdentityList, PromotedProfile,
            UpdateIdentityRequest,
        },
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, MaybeAuthUser},
    models::{Identity, Payment},
    response::ApiResponse,
    routes::params::PageQuery,
    services::{
        audit_service, identity_service, payment_service,
        user_service::{self, PromotionAuthority},
    },
    state::AppState,
};

pub const SERVICE_KEY_HEADER: &str = "x-service-key";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/update-role", post(promote_to_admin))
        .route("/identities", get(list_identities).post(create_identity))
        .route(
            "/identities/{id}",
            patch(update_identity).delete(delete_identity),
        )
        .route("/payments", get(list_payments))
        .route("/payments/{id}/status", patch(update_payment_status))
        .route("/audit-logs", get(list_audit_logs))
}

#[utoipa::path(
    post,
    path = "/api/admin/update-role",
    request_body = EmailRequest,
    params(("x-service-key" = Option<String>, Header, description = "Service credential, accepted instead of an admin session")),
    responses(
        (status = 200, description = "User promoted to admin", body = ApiResponse<PromotedProfile>),
        (status = 401, description = "Neither a session nor a valid service key"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn promote_to_admin(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    headers: HeaderMap,
    Json(payload): Json<EmailRequest>,
) -> AppResult<Json<ApiResponse<PromotedProfile>>> {
    let service_key = headers
        .get(SERVICE_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    let authority = match (service_key, user.as_ref()) {
        (Some(key), _) => PromotionAuthority::ServiceKey(key),
        (None, Some(user)) => PromotionAuthority::Session(user),
        (None, None) => return Err(AppError::Unauthorized),
    };

    let resp = user_service::promote_to_admin(&state, authority, &payload.email).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/identities",
    params(PageQuery),
    responses(
        (status = 200, description = "List identities", body = ApiResponse<IdentityList>),
        (status = 403, description = "Admin role required")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_identities(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<ApiResponse<IdentityList>>> {
    let resp = identity_service::list_identities(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/identities",
    request_body = CreateIdentityRequest,
    responses(
        (status = 200, description = "Create identity and profile", body = ApiResponse<Identity>),
        (status = 403, description = "Admin role required"),
        (status = 409, description = "Email already registered")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_identity(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateIdentityRequest>,
) -> AppResult<Json<ApiResponse<Identity>>> {
    let resp = identity_service::create_identity_admin(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/admin/identities/{id}",
    params(("id" = Uuid, Path, description = "Identity ID")),
    request_body = UpdateIdentityRequest,
    responses(
        (status = 200, description = "Update identity", body = ApiResponse<Identity>),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_identity(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateIdentityRequest>,
) -> AppResult<Json<ApiResponse<Identity>>> {
    let resp = identity_service::update_identity(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/admin/identities/{id}",
    params(("id" = Uuid, Path, description = "Identity ID")),
    responses(
        (status = 200, description = "Delete identity and profile", body = ApiResponse<DeletedIdentity>),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_identity(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<DeletedIdentity>>> {
    let resp = identity_service::delete_identity(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/payments",
    responses(
        (status = 200, description = "Latest payments with revenue stats", body = ApiResponse<PaymentReport>),
        (status = 403, description = "Admin role required")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_payments(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<PaymentReport>>> {
    let resp = payment_service::list_payments(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/admin/payments/{id}/status",
    params(("id" = Uuid, Path, description = "Payment ID")),
    request_body = UpdatePaymentStatusRequest,
    responses(
        (status = 200, description = "Update payment status", body = ApiResponse<Payment>),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Payment not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_payment_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePaymentStatusRequest>,
) -> AppResult<Json<ApiResponse<Payment>>> {
    let resp = payment_service::update_payment_status(&state, &user, id, payload.status).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/audit-logs",
    params(AuditLogQuery),
    responses(
        (status = 200, description = "Audit trail, newest first", body = ApiResponse<AuditLogList>),
        (status = 403, description = "Admin role required")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_audit_logs(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<AuditLogQuery>,
) -> AppResult<Json<ApiResponse<AuditLogList>>> {
    let resp = audit_service::list_audit_logs(&state, &user, query).await?;
    Ok(Json(resp))
}
