//! Wiring shared by the handler tests: in-memory stores behind the real routes.

use std::sync::Arc;

use actix_web::{
    http::header,
    middleware::from_fn,
    web::{self, Data},
};
use chrono::NaiveDate;

use crate::{
    auth::{jwt::generate_access_token, middleware::auth_middleware},
    config::Config,
    model::{leave_request::NewLeaveRequest, role::Role, user::NewUser},
    repository::{
        LeaveRequestRepository, UserRepository,
        memory::{InMemoryLeaveRequests, InMemoryUsers},
    },
    routes,
    utils::email_index::EmailIndex,
};

pub struct TestApp {
    pub config: Config,
    pub leaves: Arc<InMemoryLeaveRequests>,
    pub users: Arc<InMemoryUsers>,
    pub emails: Arc<EmailIndex>,
}

impl TestApp {
    pub fn new() -> Self {
        let leaves = Arc::new(InMemoryLeaveRequests::default());
        let users = Arc::new(InMemoryUsers::new(leaves.clone()));
        Self {
            config: Config::for_tests(),
            leaves,
            users,
            emails: Arc::new(EmailIndex::default()),
        }
    }

    /// Same API scope as production, minus the rate limiter.
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        let leaves: Arc<dyn LeaveRequestRepository> = self.leaves.clone();
        let users: Arc<dyn UserRepository> = self.users.clone();

        cfg.app_data(Data::new(self.config.clone()))
            .app_data(Data::from(leaves))
            .app_data(Data::from(users))
            .app_data(Data::from(self.emails.clone()))
            .service(
                web::scope(&self.config.api_prefix)
                    .wrap(from_fn(auth_middleware))
                    .configure(routes::api_routes),
            );
    }

    pub async fn seed_user(&self, email: &str, role: Role) -> u64 {
        let user = self
            .users
            .create(NewUser {
                name: email.split('@').next().unwrap_or(email).to_string(),
                email: email.to_string(),
                contact: String::new(),
                role,
                course: None,
                semester: None,
                password_hash: String::new(),
            })
            .await
            .unwrap();
        self.emails.mark_taken(email).await;
        user.id
    }

    pub async fn seed_leave(&self, user: u64) -> u64 {
        self.leaves
            .create(NewLeaveRequest {
                user,
                leave_category: "Casual Leave".into(),
                leave_from: NaiveDate::from_ymd_opt(2024, 11, 4).unwrap(),
                leave_to: NaiveDate::from_ymd_opt(2024, 11, 5).unwrap(),
                contact_during_leave: String::new(),
                reason: "family function".into(),
            })
            .await
            .unwrap()
            .id
    }

    pub fn bearer(&self, user_id: u64, role: Role) -> (header::HeaderName, String) {
        let token = generate_access_token(
            user_id,
            format!("user{user_id}@college.edu"),
            role,
            &self.config.jwt_secret,
            self.config.access_token_ttl,
        )
        .unwrap();
        (header::AUTHORIZATION, format!("Bearer {token}"))
    }
}
