use crate::api::leave_request::{
    BulkResponse, BulkStatusUpdate, LeaveRequestDraft, LeaveResponse, StatusUpdate,
};
use crate::api::user::CreateUser;
use crate::model::leave_category::CategoryListResponse;
use crate::model::leave_request::{BulkItemOutcome, BulkItemResult, LeaveStatus};
use crate::model::role::Role;
use crate::model::user::{User, UserUpdate};
use crate::models::{LoginReqDto, LoginResponse, RegisterReq};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Leave Desk API",
        version = "1.0.0",
        description = r#"
## Leave request management

Students submit leave requests; admins, HODs and faculty review them.

### Key Features
- **Leave Requests**
  - Submit a request, list and filter requests, approve or reject one request or a selection
- **Users**
  - Admin-managed accounts for students and staff, and each user's own leave history
- **Auth**
  - Student self-registration and email/password login

### Security
Every `/api` endpoint expects a **JWT Bearer** token from `/auth/login`.
Deciding and listing leave requests is limited to **admin**, **hod** and **faculty**.
Managing users is limited to **admin**.

### Response Format
- JSON bodies with camelCase fields
- Errors as `{"message": "..."}`
"#,
    ),
    paths(
        crate::auth::handlers::register,
        crate::auth::handlers::login,

        crate::api::leave_request::create_leave,
        crate::api::leave_request::leave_list,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::update_leave_status,
        crate::api::leave_request::bulk_update_status,
        crate::api::leave_request::delete_leave,
        crate::api::leave_request::list_categories,

        crate::api::user::create_user,
        crate::api::user::list_users,
        crate::api::user::get_user,
        crate::api::user::update_user,
        crate::api::user::delete_user,
        crate::api::user::user_leave_requests
    ),
    components(
        schemas(
            RegisterReq,
            LoginReqDto,
            LoginResponse,
            LeaveRequestDraft,
            LeaveResponse,
            LeaveStatus,
            StatusUpdate,
            BulkStatusUpdate,
            BulkResponse,
            BulkItemResult,
            BulkItemOutcome,
            CategoryListResponse,
            CreateUser,
            User,
            UserUpdate,
            Role
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration and login"),
        (name = "Leave", description = "Leave request APIs"),
        (name = "User", description = "User management APIs"),
    )
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
