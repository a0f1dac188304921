use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use anyhow::Context;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod models;
mod repository;
mod routes;
mod utils;

use config::Config;
use repository::{
    LeaveRequestRepository, MySqlLeaveRequestRepository, MySqlUserRepository, UserRepository,
};
use routes::RateLimits;
use utils::email_index::EmailIndex;

use crate::docs::ApiDoc;
use tracing::{error, info};
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

const EMAIL_WARMUP_BATCH: usize = 500;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let pool = db::create_pool(
        &config.database_url,
        config.db_max_connections,
        config.db_acquire_timeout_secs,
    )
    .await
    .context("failed to connect to the database")?;

    if config.run_migrations {
        db::run_migrations(&pool)
            .await
            .context("failed to run migrations")?;
        info!("Migrations applied");
    }

    let leaves: Arc<dyn LeaveRequestRepository> =
        Arc::new(MySqlLeaveRequestRepository::new(pool.clone()));
    let users: Arc<dyn UserRepository> = Arc::new(MySqlUserRepository::new(pool));
    let emails = Data::new(EmailIndex::default());
    let limits = RateLimits::from_config(&config)?;

    auth::bootstrap::ensure_admin(
        users.as_ref(),
        config.admin_email.as_deref(),
        config.admin_password.as_deref(),
    )
    .await
    .context("failed to bootstrap the admin account")?;

    let warmup_users = users.clone();
    let warmup_index = emails.clone();
    actix_web::rt::spawn(async move {
        if let Err(e) = warmup_index
            .warmup(warmup_users.as_ref(), EMAIL_WARMUP_BATCH)
            .await
        {
            error!(error = ?e, "Failed to warm up email index");
        }
    });

    let server_addr = config.server_addr.clone();
    let leaves = Data::from(leaves);
    let users = Data::from(users);
    let config = Data::new(config);

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(config.clone())
            .app_data(leaves.clone())
            .app_data(users.clone())
            .app_data(emails.clone())
            // Configure auth + protected routes with rate limiting
            .configure(|cfg| routes::configure(cfg, &config.api_prefix, &limits))
    })
    .bind(&server_addr)
    .with_context(|| format!("failed to bind {server_addr}"))?
    .run()
    .await?;

    Ok(())
}
