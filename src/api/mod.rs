pub mod leave_request;
pub mod user;

#[cfg(test)]
pub mod testing;
