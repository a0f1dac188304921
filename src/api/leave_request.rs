use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::model::leave_category::{CategoryCatalog, CategoryListResponse};
use crate::model::leave_request::{
    BulkItemResult, BulkOutcome, LeaveRequest, LeaveStatus, NewLeaveRequest, leave_days,
};
use crate::repository::LeaveRequestRepository;
use actix_web::{HttpResponse, Responder, web};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

/// Body of `POST /leave-requests`. Every field is optional here so that
/// missing ones can be reported together.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRequestDraft {
    #[schema(example = "Sick Leave")]
    pub leave_category: Option<String>,
    #[schema(example = "2024-11-01", format = "date", value_type = String)]
    pub start_date: Option<NaiveDate>,
    #[schema(example = "2024-11-03", format = "date", value_type = String)]
    pub end_date: Option<NaiveDate>,
    #[schema(example = 3)]
    pub num_days: Option<i64>,
    #[schema(example = "flu")]
    pub reason: Option<String>,
    #[schema(example = "+91 98450 00000")]
    pub contact_during_leave: Option<String>,
}

fn blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

fn missing_fields(names: &[&str]) -> AppError {
    AppError::validation(format!("Missing required fields: {}", names.join(", ")))
}

impl LeaveRequestDraft {
    pub fn validate(self, user: u64, catalog: &CategoryCatalog) -> AppResult<NewLeaveRequest> {
        let mut missing = Vec::new();
        if blank(&self.leave_category) {
            missing.push("leaveCategory");
        }
        if self.start_date.is_none() {
            missing.push("startDate");
        }
        if self.end_date.is_none() {
            missing.push("endDate");
        }
        if self.num_days.unwrap_or(0) == 0 {
            missing.push("numDays");
        }
        if blank(&self.reason) {
            missing.push("reason");
        }

        let (Some(category), Some(from), Some(to), Some(num_days), Some(reason)) = (
            self.leave_category,
            self.start_date,
            self.end_date,
            self.num_days,
            self.reason,
        ) else {
            return Err(missing_fields(&missing));
        };
        if !missing.is_empty() {
            return Err(missing_fields(&missing));
        }

        let leave_category = catalog.resolve(&category).ok_or_else(|| {
            AppError::validation(format!("Unknown leave category '{}'", category.trim()))
        })?;

        if from > to {
            return Err(AppError::validation("startDate cannot be after endDate"));
        }

        let expected = leave_days(from, to);
        if num_days != expected {
            return Err(AppError::validation(format!(
                "numDays must be {expected} for the given dates"
            )));
        }

        let new = NewLeaveRequest {
            user,
            leave_category,
            leave_from: from,
            leave_to: to,
            contact_during_leave: self.contact_during_leave.unwrap_or_default().trim().to_string(),
            reason: reason.trim().to_string(),
        };
        new.check()?;
        Ok(new)
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaveResponse {
    #[schema(example = 1)]
    pub id: u64,
    /// id of the owning user
    #[schema(example = 12)]
    pub user: u64,
    #[schema(example = "Sick Leave")]
    pub leave_category: String,
    #[schema(example = "2024-11-01", format = "date", value_type = String)]
    pub leave_from: NaiveDate,
    #[schema(example = "2024-11-03", format = "date", value_type = String)]
    pub leave_to: NaiveDate,
    /// inclusive day count, derived from the dates
    #[schema(example = 3)]
    pub num_days: i64,
    pub contact_during_leave: String,
    #[schema(example = "flu")]
    pub reason: String,
    pub status: LeaveStatus,
    #[schema(example = 1, nullable = true)]
    pub approved_by: Option<u64>,
    #[schema(example = "2024-11-01T09:00:00Z", format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(example = "2024-11-01T09:00:00Z", format = "date-time", value_type = String)]
    pub updated_at: DateTime<Utc>,
}

impl From<LeaveRequest> for LeaveResponse {
    fn from(leave: LeaveRequest) -> Self {
        LeaveResponse {
            num_days: leave.num_days(),
            id: leave.id,
            user: leave.user,
            leave_category: leave.leave_category,
            leave_from: leave.leave_from,
            leave_to: leave.leave_to,
            contact_during_leave: leave.contact_during_leave,
            reason: leave.reason,
            status: leave.status,
            approved_by: leave.approved_by,
            created_at: leave.created_at,
            updated_at: leave.updated_at,
        }
    }
}

pub fn to_responses(leaves: Vec<LeaveRequest>) -> Vec<LeaveResponse> {
    leaves.into_iter().map(LeaveResponse::from).collect()
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LeaveFilter {
    /// Filter by leave status
    #[param(example = "pending")]
    pub status: Option<LeaveStatus>,
    /// Filter by owning user id
    #[param(example = 12)]
    pub user: Option<u64>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    #[schema(example = "approved")]
    pub status: LeaveStatus,
    /// id of the deciding user, recorded only when sent
    #[schema(example = 1)]
    pub approved_by: Option<u64>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkStatusUpdate {
    #[schema(example = json!([3, 4, 9]))]
    pub selected_requests: Vec<u64>,
    #[schema(example = "rejected")]
    pub status: LeaveStatus,
    #[schema(example = 1)]
    pub approved_by: Option<u64>,
}

/// Keeps the bulk `IN (...)` list well under MySQL's placeholder limit.
pub const MAX_BULK_SELECTION: usize = 1_000;

#[derive(Serialize, Deserialize, ToSchema)]
pub struct BulkResponse {
    #[schema(example = "Bulk action applied successfully")]
    pub message: String,
    #[schema(example = 2)]
    pub modified: u64,
    pub results: Vec<BulkItemResult>,
}

/* =========================
Create leave request
========================= */
/// Submits a leave request for the caller.
#[utoipa::path(
    post,
    path = "/api/leave-requests",
    request_body(
        content = LeaveRequestDraft,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request submitted successfully",
         body = Object,
         example = json!({
            "message": "Leave request submitted successfully",
            "id": 1,
            "status": "pending"
         })
        ),
        (status = 400, description = "Missing or invalid fields", body = Object, example = json!({
            "message": "Missing required fields: reason"
        })),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    leaves: web::Data<dyn LeaveRequestRepository>,
    config: web::Data<Config>,
    payload: web::Json<LeaveRequestDraft>,
) -> actix_web::Result<impl Responder> {
    let new = payload
        .into_inner()
        .validate(auth.user_id, &config.leave_categories)?;

    let created = leaves.create(new).await.map_err(|e| {
        tracing::error!(error = %e, user_id = auth.user_id, "Failed to create leave request");
        e
    })?;

    tracing::info!(leave_id = created.id, user_id = auth.user_id, "Leave request submitted");

    Ok(HttpResponse::Created().json(json!({
        "message": "Leave request submitted successfully",
        "id": created.id,
        "status": created.status
    })))
}

/// for getting leave applications endpoint
#[utoipa::path(
    get,
    path = "/api/leave-requests",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Leave requests", body = [LeaveResponse]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    leaves: web::Data<dyn LeaveRequestRepository>,
    query: web::Query<LeaveFilter>,
) -> actix_web::Result<impl Responder> {
    auth.require_decider()?;

    let found = match (query.user, query.status) {
        (Some(user), status) => {
            let mut owned = leaves.find_by_user(user).await?;
            if let Some(status) = status {
                owned.retain(|l| l.status == status);
            }
            owned
        }
        (None, Some(status)) => leaves.find_by_status(status).await?,
        (None, None) => leaves.find_all().await?,
    };

    Ok(HttpResponse::Ok().json(to_responses(found)))
}

/// for getting a leave application details endpoint
#[utoipa::path(
    get,
    path = "/api/leave-requests/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to fetch")
    ),
    responses(
        (status = 200, description = "Leave request found", body = LeaveResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found", body = Object, example = json!({
            "message": "Leave request 1 not found"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    leaves: web::Data<dyn LeaveRequestRepository>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_decider()?;

    let leave_id = path.into_inner();

    match leaves.find_by_id(leave_id).await? {
        Some(leave) => Ok(HttpResponse::Ok().json(LeaveResponse::from(leave))),
        None => Err(AppError::NotFound {
            resource: "Leave request",
            id: leave_id,
        }
        .into()),
    }
}

/// Zero-modified transitions are reported as 400 with the reason.
fn not_modified(e: AppError) -> actix_web::Result<HttpResponse> {
    match e {
        AppError::NotFound { .. } => Ok(HttpResponse::BadRequest().json(json!({
            "message": "Leave request not found"
        }))),
        AppError::AlreadyDecided { .. } => Ok(HttpResponse::BadRequest().json(json!({
            "message": e.to_string()
        }))),
        other => Err(other.into()),
    }
}

/* =========================
Approve / reject (deciders)
========================= */
/// Moves one pending leave request to approved or rejected.
#[utoipa::path(
    patch,
    path = "/api/leave-requests/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to decide")
    ),
    request_body(content = StatusUpdate, content_type = "application/json"),
    responses(
        (status = 200, description = "Status updated", body = Object, example = json!({
            "message": "Status updated successfully",
            "leaveRequest": { "id": 1, "status": "approved" }
        })),
        (status = 400, description = "Not found, already decided or invalid target", body = Object, example = json!({
            "message": "Leave request 1 is already approved"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn update_leave_status(
    auth: AuthUser,
    leaves: web::Data<dyn LeaveRequestRepository>,
    path: web::Path<u64>,
    payload: web::Json<StatusUpdate>,
) -> actix_web::Result<HttpResponse> {
    auth.require_decider()?;

    let leave_id = path.into_inner();

    match leaves
        .update_status(leave_id, payload.status, payload.approved_by)
        .await
    {
        Ok(updated) => {
            tracing::info!(leave_id, status = %updated.status, decided_by = auth.user_id, "Leave request decided");
            Ok(HttpResponse::Ok().json(json!({
                "message": "Status updated successfully",
                "leaveRequest": LeaveResponse::from(updated)
            })))
        }
        Err(e) => not_modified(e),
    }
}

/// Applies one decision to several leave requests.
#[utoipa::path(
    patch,
    path = "/api/leave-requests/bulk",
    request_body(content = BulkStatusUpdate, content_type = "application/json"),
    responses(
        (status = 200, description = "At least one request was updated", body = BulkResponse),
        (status = 400, description = "Nothing was updated, or the selection is empty", body = BulkResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn bulk_update_status(
    auth: AuthUser,
    leaves: web::Data<dyn LeaveRequestRepository>,
    payload: web::Json<BulkStatusUpdate>,
) -> actix_web::Result<impl Responder> {
    auth.require_decider()?;

    if payload.selected_requests.is_empty() {
        return Err(AppError::validation("No leave requests selected").into());
    }
    if payload.selected_requests.len() > MAX_BULK_SELECTION {
        return Err(AppError::validation(format!(
            "At most {MAX_BULK_SELECTION} leave requests can be selected at once"
        ))
        .into());
    }

    let BulkOutcome { modified, results } = leaves
        .update_status_bulk(&payload.selected_requests, payload.status, payload.approved_by)
        .await?;

    tracing::info!(
        requested = payload.selected_requests.len(),
        modified,
        status = %payload.status,
        "Bulk leave action applied"
    );

    if modified > 0 {
        Ok(HttpResponse::Ok().json(BulkResponse {
            message: "Bulk action applied successfully".into(),
            modified,
            results,
        }))
    } else {
        Ok(HttpResponse::BadRequest().json(BulkResponse {
            message: "Failed to apply bulk action".into(),
            modified,
            results,
        }))
    }
}

#[utoipa::path(
    delete,
    path = "/api/leave-requests/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to delete")
    ),
    responses(
        (status = 200, description = "Deleted, or already absent", body = Object, example = json!({
            "message": "Leave request deleted"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn delete_leave(
    auth: AuthUser,
    leaves: web::Data<dyn LeaveRequestRepository>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_decider()?;

    let leave_id = path.into_inner();
    leaves.delete(leave_id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Leave request deleted"
    })))
}

/// Lists the categories a leave request may use.
#[utoipa::path(
    get,
    path = "/api/leave-categories",
    responses(
        (status = 200, description = "Leave categories", body = CategoryListResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn list_categories(_auth: AuthUser, config: web::Data<Config>) -> impl Responder {
    HttpResponse::Ok().json(CategoryListResponse {
        categories: config.leave_categories.names(),
    })
}
