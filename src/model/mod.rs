pub mod leave_category;
pub mod leave_request;
pub mod role;
pub mod user;
