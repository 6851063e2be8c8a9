//! Entitlement lifecycle manager
//!
//! Per user the state collapses to the single active-or-none subscription:
//!
//! ```text
//! NONE --assign--> ACTIVE --cancel(soft)--> CANCELLED (terminal)
//! ACTIVE --expiry sweep--> EXPIRED (terminal)
//! ACTIVE --cancel(hard)--> NONE (row removed)
//! CANCELLED/EXPIRED --assign--> ACTIVE (new row, old one untouched)
//! ```
//!
//! Terminal rows are never reactivated; re-subscription inserts a new row.

use sqlx::PgPool;

use crate::db::subscriptions::{CreateError, NewSubscription, Subscription, UpdateError};
use crate::db::{audit, plans, subscriptions};
use crate::error::{AppError, ErrorCode};
use crate::models::{SubscriptionSource, SubscriptionStatus};
use crate::services::ServiceResult;
use crate::util;

pub struct AssignRequest<'a> {
    pub user_id: &'a str,
    pub plan_id: i64,
    pub notes: Option<&'a str>,
    /// Defaults to now when omitted
    pub start_date: Option<i64>,
    pub source: SubscriptionSource,
    /// Who initiated this, recorded in the audit trail
    pub actor: &'a str,
}

/// Grant entitlement by creating an active subscription.
///
/// The insert carries every derived field, so a timed-out request either
/// commits the whole row or nothing. A concurrent assign for the same user
/// loses on the partial unique index and surfaces `ActiveSubscriptionExists`.
pub async fn assign(pool: &PgPool, req: &AssignRequest<'_>) -> ServiceResult<Subscription> {
    let plan = plans::find_by_id(pool, req.plan_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::PlanNotFound))?;
    if !plan.is_active {
        return Err(AppError::new(ErrorCode::PlanInactive).into());
    }

    let now = util::now_millis();
    let start_date = req.start_date.unwrap_or(now);
    let end_date = util::end_date_for(start_date, plan.duration_days);
    let id = uuid::Uuid::new_v4().to_string();

    let new_sub = NewSubscription {
        id: &id,
        user_id: req.user_id,
        plan_id: plan.id,
        start_date,
        end_date,
        source: req.source.as_db(),
        notes: req.notes,
        now,
    };
    match subscriptions::create(pool, &new_sub).await {
        Ok(()) => {}
        Err(CreateError::ActiveExists) => {
            return Err(AppError::new(ErrorCode::ActiveSubscriptionExists).into());
        }
        Err(CreateError::Db(e)) => return Err(e.into()),
    }

    let detail = serde_json::json!({
        "subscription_id": id,
        "plan_id": plan.id,
        "source": req.source.as_db(),
    });
    if let Err(e) = audit::log(
        pool,
        req.user_id,
        "subscription_assigned",
        Some(&detail),
        Some(req.actor),
        now,
    )
    .await
    {
        tracing::warn!(error = %e, "Failed to write audit entry");
    }

    tracing::info!(
        user_id = %req.user_id,
        plan_id = plan.id,
        subscription_id = %id,
        source = req.source.as_db(),
        end_date,
        "Subscription assigned"
    );

    Ok(Subscription {
        id,
        user_id: req.user_id.to_string(),
        plan_id: plan.id,
        status: SubscriptionStatus::Active.as_db().to_string(),
        start_date,
        end_date,
        source: req.source.as_db().to_string(),
        notes: req.notes.map(String::from),
        created_at: now,
    })
}

/// End a subscription.
///
/// Soft cancel flips status to `cancelled` and keeps the row; end_date is
/// left as the recorded term. Hard delete removes the row entirely; it is
/// an admin correction tool, not a cancellation.
pub async fn cancel(
    pool: &PgPool,
    subscription_id: &str,
    soft_delete: bool,
    actor: &str,
) -> ServiceResult<()> {
    let sub = subscriptions::find_by_id(pool, subscription_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::SubscriptionNotFound))?;

    if soft_delete {
        // Terminal rows stay terminal; only the CAS below is authoritative,
        // this just gives a precise error for the common case.
        if SubscriptionStatus::from_db(&sub.status)
            .is_some_and(|s| s != SubscriptionStatus::Active)
        {
            return Err(AppError::new(ErrorCode::SubscriptionAlreadyTerminal).into());
        }
        let updated =
            match subscriptions::update_status(pool, subscription_id, SubscriptionStatus::Cancelled.as_db())
                .await
            {
                Ok(updated) => updated,
                Err(UpdateError::InvalidTarget) => {
                    return Err(AppError::new(ErrorCode::InvalidTransition).into());
                }
                Err(UpdateError::Db(e)) => return Err(e.into()),
            };
        if !updated {
            // Already terminal, or concurrently replaced; no silent no-op.
            return Err(AppError::new(ErrorCode::SubscriptionAlreadyTerminal).into());
        }
    } else {
        let removed = subscriptions::hard_delete(pool, subscription_id).await?;
        if !removed {
            return Err(AppError::new(ErrorCode::SubscriptionNotFound).into());
        }
    }

    let now = util::now_millis();
    let action = if soft_delete {
        "subscription_cancelled"
    } else {
        "subscription_deleted"
    };
    let detail = serde_json::json!({ "subscription_id": subscription_id });
    if let Err(e) = audit::log(pool, &sub.user_id, action, Some(&detail), Some(actor), now).await {
        tracing::warn!(error = %e, "Failed to write audit entry");
    }

    tracing::info!(
        subscription_id = %subscription_id,
        user_id = %sub.user_id,
        soft_delete,
        "Subscription cancelled"
    );
    Ok(())
}

/// Current entitlement view: the active subscription plus derived
/// days-remaining, or None.
#[derive(Debug, serde::Serialize)]
pub struct CurrentStatus {
    pub subscription: Subscription,
    pub days_remaining: i64,
}

pub async fn current_status(pool: &PgPool, user_id: &str) -> ServiceResult<Option<CurrentStatus>> {
    let Some(sub) = subscriptions::find_active(pool, user_id).await? else {
        return Ok(None);
    };
    let days_remaining = util::days_remaining(sub.end_date, util::now_millis());
    Ok(Some(CurrentStatus {
        subscription: sub,
        days_remaining,
    }))
}

/// Expiry sweep: flip every active subscription past its end date to
/// `expired`. This is the only producer of `expired`; read paths never
/// fake the status from dates.
///
/// Individual row failures are logged and skipped so one bad row cannot
/// abort the whole batch. Returns the number of rows expired.
pub async fn expire_due(pool: &PgPool) -> u64 {
    let now = util::now_millis();
    let due = match subscriptions::list_due(pool, now).await {
        Ok(ids) => ids,
        Err(e) => {
            tracing::error!(error = %e, "Expiry sweep query failed");
            return 0;
        }
    };

    let mut expired = 0u64;
    for id in due {
        match subscriptions::update_status(pool, &id, SubscriptionStatus::Expired.as_db()).await {
            Ok(true) => expired += 1,
            // Cancelled or hard-deleted since the scan; nothing to do.
            Ok(false) => {}
            Err(UpdateError::InvalidTarget) => unreachable!("expired is a legal target"),
            Err(UpdateError::Db(e)) => {
                tracing::warn!(subscription_id = %id, error = %e, "Failed to expire subscription");
            }
        }
    }

    if expired > 0 {
        tracing::info!(expired, "Expiry sweep completed");
    }
    expired
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ServiceError;

    async fn seed_plan(pool: &PgPool, id: i64, duration_days: i32) {
        sqlx::query(
            "INSERT INTO plans (id, name, plan_type, price, duration_days, features, is_active, created_at)
             VALUES ($1, $2, 'monthly', 500, $3, '{}', TRUE, $4)",
        )
        .bind(id)
        .bind(format!("plan-{id}"))
        .bind(duration_days)
        .bind(util::now_millis())
        .execute(pool)
        .await
        .unwrap();
    }

    fn assign_req<'a>(user_id: &'a str, plan_id: i64, start_date: Option<i64>) -> AssignRequest<'a> {
        AssignRequest {
            user_id,
            plan_id,
            notes: None,
            start_date,
            source: SubscriptionSource::AdminAssigned,
            actor: "admin-1",
        }
    }

    fn app_code(err: ServiceError) -> ErrorCode {
        match err {
            ServiceError::App(e) => e.code,
            ServiceError::Db(e) => panic!("unexpected db error: {e}"),
        }
    }

    #[sqlx::test]
    async fn test_second_assign_rejected_while_active(pool: PgPool) {
        seed_plan(&pool, 1, 30).await;
        seed_plan(&pool, 2, 365).await;

        assign(&pool, &assign_req("u1", 1, None)).await.unwrap();

        // Same plan or a different one, the active row blocks both
        let err = assign(&pool, &assign_req("u1", 1, None)).await.unwrap_err();
        assert_eq!(app_code(err), ErrorCode::ActiveSubscriptionExists);
        let err = assign(&pool, &assign_req("u1", 2, None)).await.unwrap_err();
        assert_eq!(app_code(err), ErrorCode::ActiveSubscriptionExists);

        // Other users are unaffected
        assign(&pool, &assign_req("u2", 1, None)).await.unwrap();
    }

    #[sqlx::test]
    async fn test_resubscribe_after_soft_cancel(pool: PgPool) {
        seed_plan(&pool, 1, 30).await;

        let first = assign(&pool, &assign_req("u1", 1, None)).await.unwrap();
        cancel(&pool, &first.id, true, "admin-1").await.unwrap();

        // Soft cancel keeps the row as history
        let history = subscriptions::list_by_user(&pool, "u1").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, "cancelled");
        assert_eq!(history[0].end_date, first.end_date);

        // A new assign creates a fresh row alongside it
        let second = assign(&pool, &assign_req("u1", 1, None)).await.unwrap();
        assert_ne!(second.id, first.id);
        let active = subscriptions::find_active(&pool, "u1").await.unwrap().unwrap();
        assert_eq!(active.id, second.id);
        assert_eq!(subscriptions::list_by_user(&pool, "u1").await.unwrap().len(), 2);
    }

    #[sqlx::test]
    async fn test_cancel_terminal_row_rejected(pool: PgPool) {
        seed_plan(&pool, 1, 30).await;

        let sub = assign(&pool, &assign_req("u1", 1, None)).await.unwrap();
        cancel(&pool, &sub.id, true, "admin-1").await.unwrap();

        let err = cancel(&pool, &sub.id, true, "admin-1").await.unwrap_err();
        assert_eq!(app_code(err), ErrorCode::SubscriptionAlreadyTerminal);
    }

    #[sqlx::test]
    async fn test_hard_delete_removes_row(pool: PgPool) {
        seed_plan(&pool, 1, 30).await;

        let sub = assign(&pool, &assign_req("u1", 1, None)).await.unwrap();
        cancel(&pool, &sub.id, false, "admin-1").await.unwrap();

        assert!(subscriptions::list_by_user(&pool, "u1").await.unwrap().is_empty());
        assert!(subscriptions::find_active(&pool, "u1").await.unwrap().is_none());

        let err = cancel(&pool, &sub.id, false, "admin-1").await.unwrap_err();
        assert_eq!(app_code(err), ErrorCode::SubscriptionNotFound);
    }

    #[sqlx::test]
    async fn test_expire_due_flips_elapsed_rows(pool: PgPool) {
        seed_plan(&pool, 1, 1).await;

        let start = util::now_millis() - 3 * util::DAY_MS;
        let sub = assign(&pool, &assign_req("u1", 1, Some(start))).await.unwrap();

        assert_eq!(expire_due(&pool).await, 1);
        let row = subscriptions::find_by_id(&pool, &sub.id).await.unwrap().unwrap();
        assert_eq!(row.status, "expired");
        assert!(subscriptions::find_active(&pool, "u1").await.unwrap().is_none());
        assert!(current_status(&pool, "u1").await.unwrap().is_none());

        // Second sweep finds nothing
        assert_eq!(expire_due(&pool).await, 0);
    }
}
