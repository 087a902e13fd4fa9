//! Append-only trail of privileged mutations, read back by `GET /api/admin/audit-logs`.

use serde_json::Value;
use uuid::Uuid;

use crate::db::DbPool;

/// Write one audit row for `action` on `resource`. `actor` is `None` for calls made with
/// the service key.
///
/// The trail is best effort: a failed insert is logged and the caller carries on.
pub async fn record(pool: &DbPool, actor: Option<Uuid>, action: &str, resource: &str, metadata: Value) {
    let written = sqlx::query(
        "INSERT INTO audit_logs (id, user_id, action, resource, metadata) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(Uuid::new_v4())
    .bind(actor)
    .bind(action)
    .bind(resource)
    .bind(&metadata)
    .execute(pool)
    .await;

    match written {
        Ok(_) => tracing::debug!(action, resource, actor = ?actor, "audit entry written"),
        Err(err) => tracing::warn!(error = %err, action, resource, "audit entry not written"),
    }
}
