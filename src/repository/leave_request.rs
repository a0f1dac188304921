use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use sqlx::{MySqlConnection, MySqlPool};
use tracing::debug;

use crate::{
    error::{AppError, AppResult},
    model::leave_request::{
        BulkOutcome, LeaveRequest, LeaveRequestRow, LeaveStatus, NewLeaveRequest, decide,
        dedupe_ids, plan_bulk,
    },
    utils::db_utils::placeholders,
};

#[async_trait]
pub trait LeaveRequestRepository: Send + Sync {
    /// Stores a new request as `pending`.
    async fn create(&self, new: NewLeaveRequest) -> AppResult<LeaveRequest>;

    async fn find_by_id(&self, id: u64) -> AppResult<Option<LeaveRequest>>;

    async fn find_all(&self) -> AppResult<Vec<LeaveRequest>>;

    async fn find_by_user(&self, user_id: u64) -> AppResult<Vec<LeaveRequest>>;

    async fn find_by_status(&self, status: LeaveStatus) -> AppResult<Vec<LeaveRequest>>;

    /// Moves one pending request to `target`. `approved_by` is written only when given.
    async fn update_status(
        &self,
        id: u64,
        target: LeaveStatus,
        approved_by: Option<u64>,
    ) -> AppResult<LeaveRequest>;

    /// Best-effort over `ids`: pending ones move, the rest are reported per id.
    async fn update_status_bulk(
        &self,
        ids: &[u64],
        target: LeaveStatus,
        approved_by: Option<u64>,
    ) -> AppResult<BulkOutcome>;

    /// No error when the record is already gone.
    async fn delete(&self, id: u64) -> AppResult<()>;
}

/// Timestamps are stored with microsecond precision.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

const LEAVE_COLUMNS: &str = "id, user_id, leave_category, leave_from, leave_to, \
     contact_during_leave, reason, status, approved_by, created_at, updated_at";

fn parse_status(id: u64, raw: &str) -> AppResult<LeaveStatus> {
    raw.parse::<LeaveStatus>().map_err(|_| {
        AppError::Internal(format!("leave request {} has unknown status '{}'", id, raw))
    })
}

fn into_requests(rows: Vec<LeaveRequestRow>) -> AppResult<Vec<LeaveRequest>> {
    rows.into_iter().map(LeaveRequest::try_from).collect()
}

pub struct MySqlLeaveRequestRepository {
    pool: MySqlPool,
}

impl MySqlLeaveRequestRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn fetch_by_id(conn: &mut MySqlConnection, id: u64) -> AppResult<Option<LeaveRequest>> {
        let sql = format!("SELECT {} FROM leave_requests WHERE id = ?", LEAVE_COLUMNS);
        let row = sqlx::query_as::<_, LeaveRequestRow>(&sql)
            .bind(id)
            .fetch_optional(conn)
            .await?;

        row.map(LeaveRequest::try_from).transpose()
    }
}

#[async_trait]
impl LeaveRequestRepository for MySqlLeaveRequestRepository {
    async fn create(&self, new: NewLeaveRequest) -> AppResult<LeaveRequest> {
        new.check()?;

        let created_at = now();
        let mut conn = self.pool.acquire().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO leave_requests
                (user_id, leave_category, leave_from, leave_to,
                 contact_during_leave, reason, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(new.user)
        .bind(&new.leave_category)
        .bind(new.leave_from)
        .bind(new.leave_to)
        .bind(&new.contact_during_leave)
        .bind(&new.reason)
        .bind(LeaveStatus::Pending.as_ref())
        .bind(created_at)
        .bind(created_at)
        .execute(&mut *conn)
        .await?;

        let id = result.last_insert_id();
        debug!(leave_id = id, user_id = new.user, "Leave request stored");

        Ok(LeaveRequest {
            id,
            user: new.user,
            leave_category: new.leave_category,
            leave_from: new.leave_from,
            leave_to: new.leave_to,
            contact_during_leave: new.contact_during_leave,
            reason: new.reason,
            status: LeaveStatus::Pending,
            approved_by: None,
            created_at,
            updated_at: created_at,
        })
    }

    async fn find_by_id(&self, id: u64) -> AppResult<Option<LeaveRequest>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_by_id(&mut conn, id).await
    }

    async fn find_all(&self) -> AppResult<Vec<LeaveRequest>> {
        let sql = format!("SELECT {} FROM leave_requests ORDER BY id", LEAVE_COLUMNS);
        let mut conn = self.pool.acquire().await?;
        let rows = sqlx::query_as::<_, LeaveRequestRow>(&sql)
            .fetch_all(&mut *conn)
            .await?;

        into_requests(rows)
    }

    async fn find_by_user(&self, user_id: u64) -> AppResult<Vec<LeaveRequest>> {
        let sql = format!(
            "SELECT {} FROM leave_requests WHERE user_id = ? ORDER BY id",
            LEAVE_COLUMNS
        );
        let mut conn = self.pool.acquire().await?;
        let rows = sqlx::query_as::<_, LeaveRequestRow>(&sql)
            .bind(user_id)
            .fetch_all(&mut *conn)
            .await?;

        into_requests(rows)
    }

    async fn find_by_status(&self, status: LeaveStatus) -> AppResult<Vec<LeaveRequest>> {
        let sql = format!(
            "SELECT {} FROM leave_requests WHERE status = ? ORDER BY id",
            LEAVE_COLUMNS
        );
        let mut conn = self.pool.acquire().await?;
        let rows = sqlx::query_as::<_, LeaveRequestRow>(&sql)
            .bind(status.as_ref())
            .fetch_all(&mut *conn)
            .await?;

        into_requests(rows)
    }

    async fn update_status(
        &self,
        id: u64,
        target: LeaveStatus,
        approved_by: Option<u64>,
    ) -> AppResult<LeaveRequest> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent decisions on the same request.
        let current: Option<(String,)> =
            sqlx::query_as("SELECT status FROM leave_requests WHERE id = ? FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some((raw,)) = current else {
            return Err(AppError::NotFound {
                resource: "Leave request",
                id,
            });
        };

        let next = decide(id, parse_status(id, &raw)?, target)?;

        sqlx::query(
            r#"
            UPDATE leave_requests
            SET status = ?, updated_at = ?, approved_by = COALESCE(?, approved_by)
            WHERE id = ?
            "#,
        )
        .bind(next.as_ref())
        .bind(now())
        .bind(approved_by)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let updated = Self::fetch_by_id(&mut tx, id)
            .await?
            .ok_or(AppError::NotFound {
                resource: "Leave request",
                id,
            })?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn update_status_bulk(
        &self,
        ids: &[u64],
        target: LeaveStatus,
        approved_by: Option<u64>,
    ) -> AppResult<BulkOutcome> {
        let ids = dedupe_ids(ids);
        if ids.is_empty() {
            return Err(AppError::validation("No leave requests selected"));
        }

        let mut tx = self.pool.begin().await?;

        let select_sql = format!(
            "SELECT id, status FROM leave_requests WHERE id IN ({}) FOR UPDATE",
            placeholders(ids.len())
        );
        let mut select = sqlx::query_as::<_, (u64, String)>(&select_sql);
        for id in &ids {
            select = select.bind(*id);
        }
        let rows = select.fetch_all(&mut *tx).await?;

        let current = rows
            .into_iter()
            .map(|(id, raw)| parse_status(id, &raw).map(|status| (id, status)))
            .collect::<AppResult<HashMap<_, _>>>()?;

        let plan = plan_bulk(&ids, &current, target)?;

        if !plan.to_update.is_empty() {
            let update_sql = format!(
                r#"
                UPDATE leave_requests
                SET status = ?, updated_at = ?, approved_by = COALESCE(?, approved_by)
                WHERE id IN ({})
                "#,
                placeholders(plan.to_update.len())
            );
            let mut update = sqlx::query(&update_sql)
                .bind(target.as_ref())
                .bind(now())
                .bind(approved_by);
            for id in &plan.to_update {
                update = update.bind(*id);
            }
            update.execute(&mut *tx).await?;
        }

        tx.commit().await?;

        debug!(
            requested = ids.len(),
            modified = plan.to_update.len(),
            status = %target,
            "Bulk status update applied"
        );

        Ok(plan.into_outcome())
    }

    async fn delete(&self, id: u64) -> AppResult<()> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("DELETE FROM leave_requests WHERE id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}
