//! Admin-side management of identity records, the counterpart of a hosted auth admin API.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, EntityTrait, PaginatorTrait, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    audit,
    authz::require_admin,
    dto::users::{CreateIdentityRequest, DeletedIdentity, IdentityList, UpdateIdentityRequest},
    entity::auth_users::{ActiveModel as AuthUserActive, Column as AuthUserCol, Entity as AuthUsers},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Identity, Role},
    response::{ApiResponse, Meta},
    routes::params::PageQuery,
    services::{
        auth_service::{create_identity, hash_password, validate_password},
        mapping::identity_from_entity,
    },
    state::AppState,
};

pub async fn list_identities(
    state: &AppState,
    user: &AuthUser,
    query: PageQuery,
) -> AppResult<ApiResponse<IdentityList>> {
    require_admin(&state.orm, user).await?;
    let (page, limit, offset) = query.pagination().normalize();

    let finder = AuthUsers::find().order_by_desc(AuthUserCol::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(identity_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Identities",
        IdentityList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn create_identity_admin(
    state: &AppState,
    user: &AuthUser,
    payload: CreateIdentityRequest,
) -> AppResult<ApiResponse<Identity>> {
    require_admin(&state.orm, user).await?;

    let role = payload.role.unwrap_or(Role::Student);
    let metadata = payload.user_metadata.unwrap_or_else(|| json!({}));

    let txn = state.orm.begin().await?;
    let (identity, _) = create_identity(
        &txn,
        &payload.email,
        &payload.password,
        metadata,
        payload.email_confirm,
        role,
    )
    .await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "identity_create",
        "auth_users",
        json!({ "user_id": identity.id, "role": role }),
    )
    .await;

    Ok(ApiResponse::success("User created", identity_from_entity(identity), Some(Meta::empty()))
        .revalidating(["/admin/users"]))
}

pub async fn update_identity(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateIdentityRequest,
) -> AppResult<ApiResponse<Identity>> {
    require_admin(&state.orm, user).await?;

    let identity = AuthUsers::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    let now = Utc::now();
    let mut active: AuthUserActive = identity.into();
    if let Some(password) = payload.password {
        validate_password(&password)?;
        active.password_hash = Set(hash_password(&password)?);
    }
    match payload.email_confirm {
        Some(true) => {
            active.email_confirmed_at = Set(Some(now.into()));
            active.confirmation_code = Set(None);
        }
        Some(false) => active.email_confirmed_at = Set(None),
        None => {}
    }
    if let Some(metadata) = payload.user_metadata {
        if !matches!(metadata, Value::Object(_)) {
            return Err(AppError::bad_request("user_metadata must be an object"));
        }
        active.user_metadata = Set(metadata);
    }
    active.updated_at = Set(now.into());
    let identity = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "identity_update",
        "auth_users",
        json!({ "user_id": identity.id }),
    )
    .await;

    Ok(ApiResponse::success("User updated", identity_from_entity(identity), Some(Meta::empty())))
}

/// Deleting the identity removes its profile through the foreign key.
pub async fn delete_identity(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<DeletedIdentity>> {
    require_admin(&state.orm, user).await?;
    if id == user.user_id {
        return Err(AppError::bad_request("Admins cannot delete their own account"));
    }

    let result = AuthUsers::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::not_found("User not found"));
    }

    audit::record(
        &state.pool,
        Some(user.user_id),
        "identity_delete",
        "auth_users",
        json!({ "user_id": id }),
    )
    .await;

    Ok(ApiResponse::success("User deleted", DeletedIdentity { id }, Some(Meta::empty()))
        .revalidating(["/admin/users"]))
}
