use crate::{
    api::{leave_request, user},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
    error::AppError,
};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use anyhow::{Context, Result};

type PeerLimit = GovernorConfig<PeerIpKeyExtractor, NoOpMiddleware>;

/// Per-peer-IP limits, built once and shared by every worker.
#[derive(Clone)]
pub struct RateLimits {
    login: PeerLimit,
    register: PeerLimit,
    protected: PeerLimit,
}

// Helper to build per-route limiter
fn build_limiter(requests_per_min: u32) -> Result<PeerLimit> {
    let requests_per_min = requests_per_min.max(1);
    GovernorConfigBuilder::default()
        .per_millisecond((60_000 / requests_per_min as u64).max(1))
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .with_context(|| format!("invalid rate limit of {requests_per_min}/min"))
}

impl RateLimits {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            login: build_limiter(config.rate_login_per_min)?,
            register: build_limiter(config.rate_register_per_min)?,
            protected: build_limiter(config.rate_protected_per_min)?,
        })
    }
}

/// Malformed JSON bodies and query strings become flat 400 messages.
fn extractor_configs(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::validation(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::validation(err.to_string()).into()),
    );
}

pub fn configure(cfg: &mut web::ServiceConfig, api_prefix: &str, limits: &RateLimits) {
    // Public routes
    cfg.service(
        web::scope("/auth")
            .configure(extractor_configs)
            .service(
                web::resource("/login")
                    .wrap(Governor::new(&limits.login))
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/register")
                    .wrap(Governor::new(&limits.register))
                    .route(web::post().to(handlers::register)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(Governor::new(&limits.protected)) // rate limiting
            .configure(api_routes),
    );
}

/// Everything behind the bearer-token middleware.
pub fn api_routes(cfg: &mut web::ServiceConfig) {
    extractor_configs(cfg);

    cfg.service(
        web::scope("/leave-requests")
            // /leave-requests
            .service(
                web::resource("")
                    .route(web::get().to(leave_request::leave_list))
                    .route(web::post().to(leave_request::create_leave)),
            )
            // /leave-requests/bulk, registered before /{id}
            .service(
                web::resource("/bulk").route(web::patch().to(leave_request::bulk_update_status)),
            )
            // /leave-requests/{id}
            .service(
                web::resource("/{id}")
                    .route(web::get().to(leave_request::get_leave))
                    .route(web::patch().to(leave_request::update_leave_status))
                    .route(web::delete().to(leave_request::delete_leave)),
            ),
    )
    .service(
        web::resource("/leave-categories").route(web::get().to(leave_request::list_categories)),
    )
    .service(
        web::scope("/users")
            // /users
            .service(
                web::resource("")
                    .route(web::get().to(user::list_users))
                    .route(web::post().to(user::create_user)),
            )
            // /users/{id}
            .service(
                web::resource("/{id}")
                    .route(web::get().to(user::get_user))
                    .route(web::patch().to(user::update_user))
                    .route(web::delete().to(user::delete_user)),
            )
            // /users/{id}/leave-requests
            .service(
                web::resource("/{id}/leave-requests")
                    .route(web::get().to(user::user_leave_requests)),
            ),
    );
}
