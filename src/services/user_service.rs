use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde_json::{Value, json};
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::{
    audit,
    authz::{load_profile, require_admin},
    dto::users::{
        AdminCheck, BulkRoleError, BulkRoleResult, BulkRoleSuccess, ProfileList,
        PromotedProfile, UpdateProfileRequest, UpdateRoleRequest, UserListQuery,
    },
    entity::{
        auth_users::{ActiveModel as AuthUserActive, Column as AuthUserCol, Entity as AuthUsers},
        profiles::{
            ActiveModel as ProfileActive, Column as ProfileCol, Entity as Profiles,
            Model as ProfileModel,
        },
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Profile, Role},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    services::{
        auth_service::{display_name, normalize_email},
        mapping::profile_from_entity,
    },
    state::AppState,
};

async fn find_profile_by_email<C: ConnectionTrait>(db: &C, email: &str) -> AppResult<ProfileModel> {
    Profiles::find()
        .filter(ProfileCol::Email.eq(normalize_email(email)))
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found(format!("User with email {email} not found")))
}

/// Set the role of the profile owning `email`. Callers are responsible for authorization.
async fn apply_role<C: ConnectionTrait>(db: &C, email: &str, role: Role) -> AppResult<ProfileModel> {
    let profile = find_profile_by_email(db, email).await?;
    let mut active: ProfileActive = profile.into();
    active.role = Set(role.as_str().to_string());
    active.updated_at = Set(Utc::now().into());
    Ok(active.update(db).await?)
}

pub async fn update_user_role(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateRoleRequest,
) -> AppResult<ApiResponse<Profile>> {
    require_admin(&state.orm, user).await?;

    let profile = apply_role(&state.orm, &payload.email, payload.role).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "user_role_update",
        "profiles",
        json!({ "user_id": profile.id, "role": payload.role }),
    )
    .await;

    Ok(ApiResponse::success(
        format!("Role updated to {}", payload.role),
        profile_from_entity(profile),
        Some(Meta::empty()),
    )
    .revalidating(["/admin/users"]))
}

pub async fn get_user_by_email(
    state: &AppState,
    _user: &AuthUser,
    email: &str,
) -> AppResult<ApiResponse<Profile>> {
    let profile = find_profile_by_email(&state.orm, email).await?;
    Ok(ApiResponse::success("User", profile_from_entity(profile), Some(Meta::empty())))
}

pub async fn list_users(
    state: &AppState,
    user: &AuthUser,
    query: UserListQuery,
) -> AppResult<ApiResponse<ProfileList>> {
    require_admin(&state.orm, user).await?;
    let (page, limit, offset) = Pagination {
        page: query.page,
        per_page: query.per_page,
    }
    .normalize();

    let mut finder = Profiles::find().order_by_desc(ProfileCol::CreatedAt);
    if let Some(role) = query.role {
        finder = finder.filter(ProfileCol::Role.eq(role.as_str()));
    }

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(profile_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Users",
        ProfileList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

/// Applies each update independently and concurrently; failures do not undo successes.
pub async fn bulk_update_user_roles(
    state: &AppState,
    user: &AuthUser,
    updates: Vec<UpdateRoleRequest>,
) -> AppResult<ApiResponse<BulkRoleResult>> {
    require_admin(&state.orm, user).await?;

    let mut tasks = JoinSet::new();
    for update in updates {
        let db = state.orm.clone();
        tasks.spawn(async move {
            let outcome = apply_role(&db, &update.email, update.role).await;
            (update.email, outcome)
        });
    }

    let mut results = Vec::new();
    let mut errors = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((email, Ok(_))) => results.push(BulkRoleSuccess {
                email,
                success: true,
            }),
            Ok((email, Err(err))) => errors.push(BulkRoleError {
                email,
                error: err.to_string(),
            }),
            Err(err) => tracing::error!(error = %err, "role update task aborted"),
        }
    }

    audit::record(
        &state.pool,
        Some(user.user_id),
        "user_role_bulk_update",
        "profiles",
        json!({ "updated": results.len(), "errors": errors.len() }),
    )
    .await;

    let message = format!("Updated {} users, {} errors", results.len(), errors.len());
    Ok(ApiResponse::success(message, BulkRoleResult { results, errors }, Some(Meta::empty()))
        .revalidating(["/admin/users"]))
}

pub async fn grant_admin_access(
    state: &AppState,
    user: &AuthUser,
    email: &str,
) -> AppResult<ApiResponse<Profile>> {
    update_user_role(
        state,
        user,
        UpdateRoleRequest {
            email: email.to_string(),
            role: Role::Admin,
        },
    )
    .await
}

pub async fn revoke_admin_access(
    state: &AppState,
    user: &AuthUser,
    email: &str,
) -> AppResult<ApiResponse<Profile>> {
    update_user_role(
        state,
        user,
        UpdateRoleRequest {
            email: email.to_string(),
            role: Role::Student,
        },
    )
    .await
}

/// Never fails: any lookup error reads as "not an admin".
pub async fn check_user_is_admin(
    state: &AppState,
    user: &AuthUser,
    user_id: Option<Uuid>,
) -> ApiResponse<AdminCheck> {
    let target = user_id.unwrap_or(user.user_id);
    let is_admin = match Profiles::find_by_id(target).one(&state.orm).await {
        Ok(Some(profile)) => Role::from_db(&profile.role) == Role::Admin,
        Ok(None) => false,
        Err(err) => {
            tracing::warn!(error = %err, user_id = %target, "admin check failed");
            false
        }
    };
    ApiResponse::success("Admin check", AdminCheck { is_admin }, Some(Meta::empty()))
}

pub async fn update_user_profile(
    state: &AppState,
    user: &AuthUser,
    user_id: Uuid,
    payload: UpdateProfileRequest,
) -> AppResult<ApiResponse<Profile>> {
    if user_id != user.user_id {
        require_admin(&state.orm, user).await?;
    }

    let profile = Profiles::find_by_id(user_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Profile not found"))?;

    let mut active: ProfileActive = profile.into();
    if let Some(full_name) = payload.full_name {
        active.full_name = Set(Some(full_name));
    }
    if let Some(avatar_url) = payload.avatar_url {
        active.avatar_url = Set(Some(avatar_url));
    }
    if let Some(bio) = payload.bio {
        active.bio = Set(Some(bio));
    }
    active.updated_at = Set(Utc::now().into());
    let profile = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Profile updated",
        profile_from_entity(profile),
        Some(Meta::empty()),
    )
    .revalidating(["/dashboard/profile", "/admin/users"]))
}

/// Who may promote through the operational endpoint.
pub enum PromotionAuthority<'a> {
    ServiceKey(&'a str),
    Session(&'a AuthUser),
}

async fn authorize_promotion(state: &AppState, authority: &PromotionAuthority<'_>) -> AppResult<Option<Uuid>> {
    match authority {
        PromotionAuthority::ServiceKey(key) => match state.config.service_role_key.as_deref() {
            Some(expected) if expected == *key => Ok(None),
            _ => Err(AppError::Unauthorized),
        },
        PromotionAuthority::Session(user) => {
            let profile = load_profile(&state.orm, user).await?;
            if Role::from_db(&profile.role) != Role::Admin {
                return Err(AppError::forbidden(
                    "Insufficient permissions. Admin role required.",
                ));
            }
            Ok(Some(user.user_id))
        }
    }
}

/// Promote the identity owning `email` to admin, creating its profile when it has none
/// yet, and mirror the role into the identity metadata. Returns whether a profile was created.
pub async fn promote_identity(
    orm: &DatabaseConnection,
    email: &str,
) -> AppResult<(ProfileModel, bool)> {
    let email = normalize_email(email);

    let txn = orm.begin().await?;
    let identity = AuthUsers::find()
        .filter(AuthUserCol::Email.eq(email.as_str()))
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    let existing = Profiles::find_by_id(identity.id).one(&txn).await?;
    let created = existing.is_none();
    let profile = match existing {
        Some(profile) => {
            let mut active: ProfileActive = profile.into();
            active.role = Set(Role::Admin.as_str().to_string());
            active.updated_at = Set(Utc::now().into());
            active.update(&txn).await?
        }
        None => {
            ProfileActive {
                id: Set(identity.id),
                email: Set(identity.email.clone()),
                full_name: Set(Some(display_name(&identity.user_metadata, &identity.email))),
                avatar_url: Set(None),
                bio: Set(None),
                role: Set(Role::Admin.as_str().to_string()),
                created_at: NotSet,
                updated_at: NotSet,
            }
            .insert(&txn)
            .await?
        }
    };

    let metadata = with_role(identity.user_metadata.clone(), Role::Admin);
    let mut active: AuthUserActive = identity.into();
    active.user_metadata = Set(metadata);
    active.updated_at = Set(Utc::now().into());
    active.update(&txn).await?;

    txn.commit().await?;
    tracing::info!(user_id = %profile.id, created, "user promoted to admin");
    Ok((profile, created))
}

pub async fn promote_to_admin(
    state: &AppState,
    authority: PromotionAuthority<'_>,
    email: &str,
) -> AppResult<ApiResponse<PromotedProfile>> {
    let actor = authorize_promotion(state, &authority).await?;
    let (profile, created) = promote_identity(&state.orm, email).await?;

    audit::record(
        &state.pool,
        actor,
        "user_promote_admin",
        "profiles",
        json!({ "user_id": profile.id, "profile_created": created }),
    )
    .await;

    Ok(ApiResponse::success(
        "User promoted to admin",
        PromotedProfile {
            created,
            profile: profile_from_entity(profile),
        },
        Some(Meta::empty()),
    )
    .revalidating(["/admin/users"]))
}

/// Write `role` into identity metadata, replacing non-object metadata.
pub fn with_role(metadata: Value, role: Role) -> Value {
    let mut map = match metadata {
        Value::Object(map) => map,
        _ => serde_json::Map::new(),
    };
    map.insert("role".into(), Value::String(role.as_str().to_string()));
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_is_merged_into_metadata() {
        let merged = with_role(json!({ "full_name": "Ada" }), Role::Admin);
        assert_eq!(merged, json!({ "full_name": "Ada", "role": "admin" }));

        let replaced = with_role(json!("legacy"), Role::Admin);
        assert_eq!(replaced, json!({ "role": "admin" }));
    }
}
