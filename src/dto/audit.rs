use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::models::AuditLog;

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct AuditLogList {
    #[schema(value_type = Vec<AuditLog>)]
    pub items: Vec<AuditLog>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct AuditLogQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub user_id: Option<Uuid>,
    pub action: Option<String>,
}
