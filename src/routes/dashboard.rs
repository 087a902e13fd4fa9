use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::dashboard::DashboardView,
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::dashboard_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(dashboard))
}

#[utoipa::path(
    get,
    path = "/api/dashboard",
    responses(
        (status = 200, description = "Role-specific dashboard figures", body = ApiResponse<DashboardView>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn dashboard(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<DashboardView>>> {
    let resp = dashboard_service::get_dashboard(&state, &user).await?;
    Ok(Json(resp))
}
