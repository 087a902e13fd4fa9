use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::models::{Identity, Profile, Role};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateRoleRequest {
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkUpdateRolesRequest {
    pub updates: Vec<UpdateRoleRequest>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BulkRoleSuccess {
    pub email: String,
    pub success: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BulkRoleError {
    pub email: String,
    pub error: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BulkRoleResult {
    pub results: Vec<BulkRoleSuccess>,
    pub errors: Vec<BulkRoleError>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct EmailQuery {
    pub email: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct UserListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub role: Option<Role>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProfileList {
    #[schema(value_type = Vec<Profile>)]
    pub items: Vec<Profile>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminCheck {
    pub is_admin: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PromotedProfile {
    pub created: bool,
    pub profile: Profile,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateIdentityRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub email_confirm: bool,
    #[schema(value_type = Option<Object>)]
    pub user_metadata: Option<Value>,
    pub role: Option<Role>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateIdentityRequest {
    pub password: Option<String>,
    pub email_confirm: Option<bool>,
    #[schema(value_type = Option<Object>)]
    pub user_metadata: Option<Value>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct IdentityList {
    #[schema(value_type = Vec<Identity>)]
    pub items: Vec<Identity>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeletedIdentity {
    pub id: Uuid,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct AdminCheckQuery {
    /// Profile to check; defaults to the caller.
    pub user_id: Option<Uuid>,
}
