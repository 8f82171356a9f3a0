use serde_json::Value;
use uuid::Uuid;

use crate::{db::DbPool, error::AppResult};

pub async fn log_audit(
    pool: &DbPool,
    user_id: Option<Uuid>,
    action: &str,
    resource: Option<&str>,
    resource_id: Option<&str>,
    metadata: Option<Value>,
) -> AppResult<()> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO audit_logs (id, user_id, action, resource, resource_id, metadata)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(action)
    .bind(resource)
    .bind(resource_id)
    .bind(metadata)
    .execute(pool)
    .await?;

    Ok(())
}

/// Records a quote action; a failing audit insert is logged and swallowed.
pub async fn audit_quote(
    pool: &DbPool,
    user_id: Option<Uuid>,
    action: &str,
    quote_id: &str,
    metadata: Value,
) {
    if let Err(err) = log_audit(
        pool,
        user_id,
        action,
        Some("quotes"),
        Some(quote_id),
        Some(metadata),
    )
    .await
    {
        tracing::warn!(error = %err, quote_id, action, "audit log failed");
    }
}
