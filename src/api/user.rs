use crate::api::leave_request::{LeaveResponse, to_responses};
use crate::auth::{auth::AuthUser, password::hash_password};
use crate::error::AppError;
use crate::model::{
    role::Role,
    user::{NewUser, User, UserUpdate},
};
use crate::repository::{LeaveRequestRepository, UserRepository};
use crate::utils::email_index::EmailIndex;
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUser {
    #[schema(example = "Dr. Meera Iyer")]
    pub name: String,
    #[schema(example = "meera@college.edu", format = "email")]
    pub email: String,
    #[serde(default)]
    #[schema(example = "+91 98450 11111")]
    pub contact: String,
    #[schema(example = "s3cret-pass")]
    pub password: String,
    #[schema(example = "hod")]
    pub role: Role,
    pub course: Option<String>,
    pub semester: Option<u8>,
}

fn user_not_found(id: u64) -> AppError {
    AppError::NotFound {
        resource: "User",
        id,
    }
}

/// Creates an account with any role.
#[utoipa::path(
    post,
    path = "/api/users",
    request_body(content = CreateUser, content_type = "application/json"),
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Email already taken")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "User"
)]
pub async fn create_user(
    auth: AuthUser,
    users: web::Data<dyn UserRepository>,
    emails: web::Data<EmailIndex>,
    payload: web::Json<CreateUser>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let payload = payload.into_inner();
    let email = payload.email.trim().to_lowercase();

    if payload.password.is_empty() {
        return Err(AppError::validation("password must not be empty").into());
    }

    let new = NewUser {
        name: payload.name.trim().to_string(),
        email,
        contact: payload.contact.trim().to_string(),
        role: payload.role,
        course: payload.course,
        semester: payload.semester,
        password_hash: String::new(),
    };
    new.check()?;

    if !emails.is_available(&new.email, users.get_ref()).await? {
        return Err(AppError::Conflict("Email already taken".into()).into());
    }

    let password_hash = hash_password(&payload.password).map_err(|e| {
        tracing::error!(error = %e, "Failed to hash password");
        AppError::Internal("password hashing failed".into())
    })?;

    let created = users.create(NewUser { password_hash, ..new }).await?;
    emails.mark_taken(&created.email).await;

    tracing::info!(user_id = created.id, role = %created.role, created_by = auth.user_id, "User created");

    Ok(HttpResponse::Created().json(created))
}

#[utoipa::path(
    get,
    path = "/api/users",
    responses(
        (status = 200, description = "All users", body = [User]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "User"
)]
pub async fn list_users(
    auth: AuthUser,
    users: web::Data<dyn UserRepository>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    Ok(HttpResponse::Ok().json(users.find_all().await?))
}

#[utoipa::path(
    get,
    path = "/api/users/{user_id}",
    params(
        ("user_id" = u64, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User found", body = User),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "User"
)]
pub async fn get_user(
    auth: AuthUser,
    users: web::Data<dyn UserRepository>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let user_id = path.into_inner();
    let user = users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| user_not_found(user_id))?;

    Ok(HttpResponse::Ok().json(user))
}

/// Partial update. Only the fields present in the body change.
#[utoipa::path(
    patch,
    path = "/api/users/{user_id}",
    params(
        ("user_id" = u64, Path, description = "User ID")
    ),
    request_body(content = UserUpdate, content_type = "application/json"),
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 400, description = "No fields provided"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Email already taken")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "User"
)]
pub async fn update_user(
    auth: AuthUser,
    users: web::Data<dyn UserRepository>,
    emails: web::Data<EmailIndex>,
    path: web::Path<u64>,
    payload: web::Json<UserUpdate>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let user_id = path.into_inner();
    let mut changes = payload.into_inner();

    if changes.name.as_deref().is_some_and(|n| n.trim().is_empty())
        || changes.email.as_deref().is_some_and(|e| e.trim().is_empty())
    {
        return Err(AppError::validation("name and email must not be empty").into());
    }
    changes.email = changes.email.map(|e| e.trim().to_lowercase());

    let current = users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| user_not_found(user_id))?;

    let new_email = changes.email.clone().filter(|e| *e != current.email);
    if let Some(email) = &new_email {
        if !emails.is_available(email, users.get_ref()).await? {
            return Err(AppError::Conflict("Email already taken".into()).into());
        }
    }

    let updated = users.update(user_id, changes).await?;

    if let Some(email) = new_email {
        emails.forget(&current.email).await;
        emails.mark_taken(&email).await;
    }

    Ok(HttpResponse::Ok().json(updated))
}

/// Removes the account. Its leave requests are kept.
#[utoipa::path(
    delete,
    path = "/api/users/{user_id}",
    params(
        ("user_id" = u64, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User deleted", body = Object, example = json!({
            "message": "User deleted"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "User"
)]
pub async fn delete_user(
    auth: AuthUser,
    users: web::Data<dyn UserRepository>,
    emails: web::Data<EmailIndex>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let user_id = path.into_inner();
    let existing = users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| user_not_found(user_id))?;

    users.delete(user_id).await?;
    emails.forget(&existing.email).await;

    tracing::info!(user_id, deleted_by = auth.user_id, "User deleted");

    Ok(HttpResponse::Ok().json(json!({
        "message": "User deleted"
    })))
}

/// Leave requests owned by one user.
#[utoipa::path(
    get,
    path = "/api/users/{user_id}/leave-requests",
    params(
        ("user_id" = u64, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "The user's leave requests", body = [LeaveResponse]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "User"
)]
pub async fn user_leave_requests(
    auth: AuthUser,
    users: web::Data<dyn UserRepository>,
    leaves: web::Data<dyn LeaveRequestRepository>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let user_id = path.into_inner();
    auth.require_self_or_decider(user_id)?;

    if users.find_by_id(user_id).await?.is_none() {
        return Err(user_not_found(user_id).into());
    }

    let owned = leaves.find_by_user(user_id).await?;
    Ok(HttpResponse::Ok().json(to_responses(owned)))
}
