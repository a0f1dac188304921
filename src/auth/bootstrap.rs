use tracing::{info, warn};

use crate::{
    auth::password::hash_password,
    error::{AppError, AppResult},
    model::{role::Role, user::NewUser},
    repository::UserRepository,
};

/// Creates the first admin account when the store has none.
///
/// Returns the new admin's id, or `None` when an admin already exists or no
/// credentials were configured.
pub async fn ensure_admin(
    users: &dyn UserRepository,
    email: Option<&str>,
    password: Option<&str>,
) -> AppResult<Option<u64>> {
    if users
        .find_all()
        .await?
        .iter()
        .any(|u| u.role == Role::Admin)
    {
        return Ok(None);
    }

    let (Some(email), Some(password)) = (email, password) else {
        warn!("No admin account exists and ADMIN_EMAIL/ADMIN_PASSWORD are not set");
        return Ok(None);
    };

    let password_hash = hash_password(password)
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))?;

    let admin = users
        .create(NewUser {
            name: "Administrator".into(),
            email: email.trim().to_lowercase(),
            contact: String::new(),
            role: Role::Admin,
            course: None,
            semester: None,
            password_hash,
        })
        .await?;

    info!(user_id = admin.id, "Bootstrap admin created");
    Ok(Some(admin.id))
}
