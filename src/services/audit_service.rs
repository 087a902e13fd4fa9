use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect};

use crate::{
    authz::require_admin,
    dto::audit::{AuditLogList, AuditLogQuery},
    entity::audit_logs::{Column as AuditCol, Entity as AuditLogs},
    error::AppResult,
    middleware::auth::AuthUser,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    services::mapping::audit_log_from_entity,
    state::AppState,
};

pub async fn list_audit_logs(
    state: &AppState,
    user: &AuthUser,
    query: AuditLogQuery,
) -> AppResult<ApiResponse<AuditLogList>> {
    require_admin(&state.orm, user).await?;
    let (page, limit, offset) = Pagination {
        page: query.page,
        per_page: query.per_page,
    }
    .normalize();

    let mut finder = AuditLogs::find().order_by_desc(AuditCol::CreatedAt);
    if let Some(user_id) = query.user_id {
        finder = finder.filter(AuditCol::UserId.eq(user_id));
    }
    if let Some(action) = query.action.filter(|a| !a.is_empty()) {
        finder = finder.filter(AuditCol::Action.eq(action));
    }

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(audit_log_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Audit logs",
        AuditLogList { items },
        Some(Meta::new(page, limit, total)),
    ))
}
