//! Audit log operations

use sqlx::PgPool;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Write an audit log entry
pub async fn log(
    pool: &PgPool,
    user_id: &str,
    action: &str,
    detail: Option<&serde_json::Value>,
    actor: Option<&str>,
    now: i64,
) -> Result<(), BoxError> {
    sqlx::query(
        "INSERT INTO audit_logs (user_id, action, detail, actor, created_at) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(user_id)
    .bind(action)
    .bind(detail)
    .bind(actor)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

/// Query audit log entries for a user (paginated)
#[derive(sqlx::FromRow, serde::Serialize)]
pub struct AuditEntry {
    pub id: i64,
    pub action: String,
    pub detail: Option<serde_json::Value>,
    pub actor: Option<String>,
    pub created_at: i64,
}

pub async fn query(
    pool: &PgPool,
    user_id: &str,
    limit: i32,
    offset: i32,
) -> Result<Vec<AuditEntry>, BoxError> {
    let rows: Vec<AuditEntry> = sqlx::query_as(
        "SELECT id, action, detail, actor, created_at FROM audit_logs
         WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
