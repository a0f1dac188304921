use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    /// The request left `pending` already.
    AlreadyDecided(LeaveStatus),
    /// Only `approved` and `rejected` can be targeted.
    InvalidTarget(LeaveStatus),
}

impl LeaveStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, LeaveStatus::Pending)
    }

    /// pending -> approved | rejected; everything else is refused.
    pub fn transition_to(self, target: LeaveStatus) -> Result<LeaveStatus, TransitionError> {
        if target == LeaveStatus::Pending {
            return Err(TransitionError::InvalidTarget(target));
        }
        if self.is_terminal() {
            return Err(TransitionError::AlreadyDecided(self));
        }
        Ok(target)
    }
}

/// Runs the transition for one stored record and maps refusals onto `AppError`.
pub fn decide(id: u64, current: LeaveStatus, target: LeaveStatus) -> AppResult<LeaveStatus> {
    current.transition_to(target).map_err(|e| match e {
        TransitionError::AlreadyDecided(status) => AppError::AlreadyDecided { id, status },
        TransitionError::InvalidTarget(status) => {
            AppError::validation(format!("Cannot move a leave request to '{status}'"))
        }
    })
}

/// Inclusive number of days between two dates, 0 when the range is inverted.
pub fn leave_days(from: NaiveDate, to: NaiveDate) -> i64 {
    if to < from {
        return 0;
    }
    (to - from).num_days() + 1
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeaveRequest {
    pub id: u64,
    pub user: u64,
    pub leave_category: String,
    pub leave_from: NaiveDate,
    pub leave_to: NaiveDate,
    pub contact_during_leave: String,
    pub reason: String,
    pub status: LeaveStatus,
    pub approved_by: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LeaveRequest {
    pub fn num_days(&self) -> i64 {
        leave_days(self.leave_from, self.leave_to)
    }
}

/// Row shape of the `leave_requests` table.
#[derive(Debug, sqlx::FromRow)]
pub struct LeaveRequestRow {
    pub id: u64,
    pub user_id: u64,
    pub leave_category: String,
    pub leave_from: NaiveDate,
    pub leave_to: NaiveDate,
    pub contact_during_leave: String,
    pub reason: String,
    pub status: String,
    pub approved_by: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<LeaveRequestRow> for LeaveRequest {
    type Error = AppError;

    fn try_from(row: LeaveRequestRow) -> Result<Self, Self::Error> {
        let status = row.status.parse::<LeaveStatus>().map_err(|_| {
            AppError::Internal(format!(
                "leave request {} has unknown status '{}'",
                row.id, row.status
            ))
        })?;

        Ok(LeaveRequest {
            id: row.id,
            user: row.user_id,
            leave_category: row.leave_category,
            leave_from: row.leave_from,
            leave_to: row.leave_to,
            contact_during_leave: row.contact_during_leave,
            reason: row.reason,
            status,
            approved_by: row.approved_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Fully validated input for `LeaveRequestRepository::create`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLeaveRequest {
    pub user: u64,
    pub leave_category: String,
    pub leave_from: NaiveDate,
    pub leave_to: NaiveDate,
    pub contact_during_leave: String,
    pub reason: String,
}

impl NewLeaveRequest {
    /// Invariants every store enforces before inserting.
    pub fn check(&self) -> AppResult<()> {
        if self.leave_category.trim().is_empty() {
            return Err(AppError::validation("leaveCategory must not be empty"));
        }
        if self.reason.trim().is_empty() {
            return Err(AppError::validation("reason must not be empty"));
        }
        if self.leave_from > self.leave_to {
            return Err(AppError::validation("startDate cannot be after endDate"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BulkItemOutcome {
    Updated,
    NotFound,
    AlreadyDecided,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BulkItemResult {
    #[schema(example = 1)]
    pub id: u64,
    pub outcome: BulkItemOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct BulkOutcome {
    #[schema(example = 2)]
    pub modified: u64,
    pub results: Vec<BulkItemResult>,
}

/// What a bulk transition will do, decided before anything is written.
#[derive(Debug, PartialEq, Eq)]
pub struct BulkPlan {
    pub to_update: Vec<u64>,
    pub results: Vec<BulkItemResult>,
}

impl BulkPlan {
    pub fn into_outcome(self) -> BulkOutcome {
        BulkOutcome {
            modified: self.to_update.len() as u64,
            results: self.results,
        }
    }
}

/// Drops repeated ids, keeping first-seen order.
pub fn dedupe_ids(ids: &[u64]) -> Vec<u64> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// `current` holds the stored status of every id that exists.
pub fn plan_bulk(
    ids: &[u64],
    current: &HashMap<u64, LeaveStatus>,
    target: LeaveStatus,
) -> AppResult<BulkPlan> {
    if target == LeaveStatus::Pending {
        return Err(AppError::validation(format!(
            "Cannot move a leave request to '{target}'"
        )));
    }

    let mut to_update = Vec::new();
    let mut results = Vec::with_capacity(ids.len());

    for id in dedupe_ids(ids) {
        let outcome = match current.get(&id) {
            None => BulkItemOutcome::NotFound,
            Some(status) => match status.transition_to(target) {
                Ok(_) => {
                    to_update.push(id);
                    BulkItemOutcome::Updated
                }
                Err(_) => BulkItemOutcome::AlreadyDecided,
            },
        };
        results.push(BulkItemResult { id, outcome });
    }

    Ok(BulkPlan { to_update, results })
}
