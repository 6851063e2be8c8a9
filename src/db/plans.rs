//! Plan catalog lookups
//!
//! The catalog is owned by the plan-management collaborator; this service
//! only ever reads it.

use sqlx::PgPool;

/// Plan catalog row
#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct Plan {
    pub id: i64,
    pub name: String,
    pub plan_type: String,
    /// Price in major currency units; 0 means not self-purchasable
    pub price: i64,
    pub duration_days: i32,
    pub features: Vec<String>,
    pub is_active: bool,
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Plan>, sqlx::Error> {
    sqlx::query_as::<_, Plan>(
        "SELECT id, name, plan_type, price, duration_days, features, is_active
         FROM plans WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}
