use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    model::role::Role,
};

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Asha Rao")]
    pub name: String,
    #[schema(example = "asha@college.edu", format = "email")]
    pub email: String,
    #[schema(example = "+91 98450 00000")]
    pub contact: String,
    pub role: Role,
    #[schema(example = "B.Tech CSE", nullable = true)]
    pub course: Option<String>,
    #[schema(example = 5, nullable = true)]
    pub semester: Option<u8>,
    #[schema(example = json!([3, 8]))]
    pub leave_requests: Vec<u64>,
    #[schema(example = "2024-11-01T09:00:00Z", format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub password_hash: String,
}

/// Row shape of the `users` table.
#[derive(Debug, sqlx::FromRow)]
pub struct UserRow {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub contact: String,
    pub role: String,
    pub course: Option<String>,
    pub semester: Option<u8>,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl UserRow {
    pub fn into_user(self, leave_requests: Vec<u64>) -> AppResult<User> {
        let role = self.role.parse::<Role>().map_err(|_| {
            AppError::Internal(format!("user {} has unknown role '{}'", self.id, self.role))
        })?;

        Ok(User {
            id: self.id,
            name: self.name,
            email: self.email,
            contact: self.contact,
            role,
            course: self.course,
            semester: self.semester,
            leave_requests,
            created_at: self.created_at,
            password_hash: self.password_hash,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub contact: String,
    pub role: Role,
    pub course: Option<String>,
    pub semester: Option<u8>,
    pub password_hash: String,
}

impl NewUser {
    /// `course` and `semester` only make sense for students.
    pub fn check(&self) -> AppResult<()> {
        if self.name.trim().is_empty() || self.email.trim().is_empty() {
            return Err(AppError::validation("name and email must not be empty"));
        }
        if self.role != Role::Student && (self.course.is_some() || self.semester.is_some()) {
            return Err(AppError::validation(
                "course and semester are only allowed for students",
            ));
        }
        Ok(())
    }
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    #[schema(example = "Asha R.")]
    pub name: Option<String>,
    #[schema(example = "asha.r@college.edu")]
    pub email: Option<String>,
    pub contact: Option<String>,
    pub role: Option<Role>,
    pub course: Option<String>,
    #[schema(example = 6)]
    pub semester: Option<u8>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self == &UserUpdate::default()
    }

    pub fn apply(&self, user: &mut User) {
        if let Some(name) = &self.name {
            user.name = name.clone();
        }
        if let Some(email) = &self.email {
            user.email = email.clone();
        }
        if let Some(contact) = &self.contact {
            user.contact = contact.clone();
        }
        if let Some(role) = self.role {
            user.role = role;
        }
        if let Some(course) = &self.course {
            user.course = Some(course.clone());
        }
        if let Some(semester) = self.semester {
            user.semester = Some(semester);
        }
    }
}
