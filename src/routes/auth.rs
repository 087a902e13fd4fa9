use axum::{
    Json, Router,
    extract::{Query, State},
    response::Redirect,
    routing::{get, post},
};

use crate::{
    dto::auth::{
        CallbackQuery, ChangePasswordRequest, ForgotPasswordRequest, LoginRequest,
        ResetPasswordRequest, Session, SessionUser, SignupRequest,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Identity,
    response::ApiResponse,
    services::auth_service::{self, exchange_code, safe_next_path},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/me", get(me))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
        .route("/password", post(change_password))
}

#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 200, description = "Register user", body = ApiResponse<Identity>),
        (status = 400, description = "Invalid email or password"),
        (status = 409, description = "Email already registered")
    ),
    tag = "Auth"
)]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> AppResult<Json<ApiResponse<Identity>>> {
    let resp = auth_service::signup(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login user", body = ApiResponse<Session>),
        (status = 400, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<Session>>> {
    let resp = auth_service::login(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current identity and profile", body = ApiResponse<SessionUser>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn me(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<SessionUser>>> {
    let resp = auth_service::me(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset link issued when the email is registered", body = ApiResponse<serde_json::Value>)
    ),
    tag = "Auth"
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = auth_service::forgot_password(&state, &payload.email).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password replaced", body = ApiResponse<Identity>),
        (status = 400, description = "Password too short"),
        (status = 404, description = "Invalid or expired code")
    ),
    tag = "Auth"
)]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> AppResult<Json<ApiResponse<Identity>>> {
    let resp = auth_service::reset_password(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/auth/password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = ApiResponse<Identity>),
        (status = 400, description = "Current password is incorrect"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn change_password(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> AppResult<Json<ApiResponse<Identity>>> {
    let resp = auth_service::change_password(&state, &user, payload).await?;
    Ok(Json(resp))
}

/// Landing point of confirmation links. Always answers with a redirect.
#[utoipa::path(
    get,
    path = "/auth/callback",
    params(CallbackQuery),
    responses(
        (status = 303, description = "Redirect to the requested page, or to the login page with an error code")
    ),
    tag = "Auth"
)]
pub async fn callback(State(state): State<AppState>, Query(query): Query<CallbackQuery>) -> Redirect {
    let base = &state.config.public_url;
    let Some(code) = query.code.as_deref().filter(|c| !c.is_empty()) else {
        return Redirect::to(&format!("{base}/auth/login?error=missing_code"));
    };

    match exchange_code(&state, code).await {
        Ok(identity) => {
            tracing::info!(user_id = %identity.id, "confirmation code exchanged");
            let next = safe_next_path(query.next.as_deref());
            Redirect::to(&format!("{base}{next}"))
        }
        Err(AppError::NotFound(_)) => Redirect::to(&format!("{base}/auth/login?error=invalid_code")),
        Err(err) => {
            tracing::error!(error = %err, "code exchange failed");
            Redirect::to(&format!("{base}/auth/login?error=exchange_failed"))
        }
    }
}
