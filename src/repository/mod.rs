pub mod leave_request;
pub mod user;

#[cfg(test)]
pub mod memory;

pub use leave_request::{LeaveRequestRepository, MySqlLeaveRequestRepository};
pub use user::{MySqlUserRepository, UserRepository};
