//! Subscription repository
//!
//! The one-active-per-user invariant lives in the database: a partial
//! unique index on `(user_id) WHERE status = 'active'` makes the
//! check-and-insert in [`create`] atomic under concurrent callers.

use sqlx::PgPool;

/// Subscription row. `days_remaining` is derived at read time and never
/// stored; `status` is authoritative for active/history partitioning.
#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct Subscription {
    pub id: String,
    pub user_id: String,
    pub plan_id: i64,
    pub status: String,
    pub start_date: i64,
    pub end_date: i64,
    pub source: String,
    pub notes: Option<String>,
    pub created_at: i64,
}

pub struct NewSubscription<'a> {
    pub id: &'a str,
    pub user_id: &'a str,
    pub plan_id: i64,
    pub start_date: i64,
    pub end_date: i64,
    pub source: &'a str,
    pub notes: Option<&'a str>,
    pub now: i64,
}

/// Insert failure modes the caller must tell apart.
#[derive(Debug)]
pub enum CreateError {
    /// The partial unique index rejected a second active row for the user.
    ActiveExists,
    Db(sqlx::Error),
}

/// Insert a new active subscription.
///
/// Fails with [`CreateError::ActiveExists`] when the user already holds an
/// active subscription at the instant of insertion.
pub async fn create(pool: &PgPool, sub: &NewSubscription<'_>) -> Result<(), CreateError> {
    sqlx::query(
        "INSERT INTO subscriptions
             (id, user_id, plan_id, status, start_date, end_date, source, notes, created_at)
         VALUES ($1, $2, $3, 'active', $4, $5, $6, $7, $8)",
    )
    .bind(sub.id)
    .bind(sub.user_id)
    .bind(sub.plan_id)
    .bind(sub.start_date)
    .bind(sub.end_date)
    .bind(sub.source)
    .bind(sub.notes)
    .bind(sub.now)
    .execute(pool)
    .await
    .map_err(|e| {
        if e.as_database_error()
            .is_some_and(|db| db.is_unique_violation())
        {
            CreateError::ActiveExists
        } else {
            CreateError::Db(e)
        }
    })?;
    Ok(())
}

pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Subscription>, sqlx::Error> {
    sqlx::query_as::<_, Subscription>(
        "SELECT id, user_id, plan_id, status, start_date, end_date, source, notes, created_at
         FROM subscriptions WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// The user's current active subscription, if any.
pub async fn find_active(pool: &PgPool, user_id: &str) -> Result<Option<Subscription>, sqlx::Error> {
    sqlx::query_as::<_, Subscription>(
        "SELECT id, user_id, plan_id, status, start_date, end_date, source, notes, created_at
         FROM subscriptions WHERE user_id = $1 AND status = 'active'",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Full subscription history for a user, newest first.
pub async fn list_by_user(pool: &PgPool, user_id: &str) -> Result<Vec<Subscription>, sqlx::Error> {
    sqlx::query_as::<_, Subscription>(
        "SELECT id, user_id, plan_id, status, start_date, end_date, source, notes, created_at
         FROM subscriptions WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

#[derive(Debug)]
pub enum UpdateError {
    /// Target status is not a legal transition out of `active`.
    InvalidTarget,
    Db(sqlx::Error),
}

impl From<sqlx::Error> for UpdateError {
    fn from(e: sqlx::Error) -> Self {
        UpdateError::Db(e)
    }
}

/// Transition an active subscription to a terminal status.
///
/// The only legal transitions are active -> cancelled and active ->
/// expired. The `status = 'active'` guard makes this a compare-and-swap:
/// returns false when the row is missing or already terminal.
pub async fn update_status(
    pool: &PgPool,
    id: &str,
    new_status: &str,
) -> Result<bool, UpdateError> {
    if !matches!(new_status, "cancelled" | "expired") {
        return Err(UpdateError::InvalidTarget);
    }
    let result = sqlx::query("UPDATE subscriptions SET status = $2 WHERE id = $1 AND status = 'active'")
        .bind(id)
        .bind(new_status)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Unconditional removal, used only for administrative data correction.
/// Returns false when no row matched.
pub async fn hard_delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM subscriptions WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Ids of active subscriptions whose term has elapsed.
pub async fn list_due(pool: &PgPool, now: i64) -> Result<Vec<String>, sqlx::Error> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT id FROM subscriptions WHERE status = 'active' AND end_date <= $1",
    )
    .bind(now)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|r| r.0).collect())
}
