use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Serialize,
    Deserialize,
    ToSchema,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    Admin,
    Student,
    Hod,
    Faculty,
    LabStaff,
}

impl Role {
    /// Roles allowed to approve or reject leave requests.
    pub fn is_decider(self) -> bool {
        matches!(self, Role::Admin | Role::Hod | Role::Faculty)
    }
}
