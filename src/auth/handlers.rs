use crate::{
    auth::{
        jwt::generate_access_token,
        password::{hash_password, verify_password},
    },
    config::Config,
    error::AppError,
    model::{role::Role, user::NewUser},
    models::{LoginReqDto, LoginResponse, RegisterReq},
    repository::UserRepository,
    utils::email_index::EmailIndex,
};
use actix_web::{HttpResponse, Responder, web};
use serde_json::json;
use tracing::{debug, error, info, instrument};

// auth end points

/// Registers a student account.
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body(content = RegisterReq, content_type = "application/json"),
    responses(
        (status = 201, description = "User registered", body = Object, example = json!({
            "message": "User registered successfully",
            "id": 1
        })),
        (status = 400, description = "Blank field"),
        (status = 409, description = "Email already taken", body = Object, example = json!({
            "message": "Email already taken"
        }))
    ),
    tag = "Auth"
)]
pub async fn register(
    user: web::Json<RegisterReq>,
    users: web::Data<dyn UserRepository>,
    emails: web::Data<EmailIndex>,
) -> actix_web::Result<impl Responder> {
    let user = user.into_inner();
    let email = user.email.trim().to_lowercase();

    if user.name.trim().is_empty() || email.is_empty() || user.password.is_empty() {
        return Err(AppError::validation("Name, email and password must not be empty").into());
    }

    if !emails.is_available(&email, users.get_ref()).await? {
        return Err(AppError::Conflict("Email already taken".into()).into());
    }

    let password_hash = hash_password(&user.password).map_err(|e| {
        error!(error = %e, "Failed to hash password");
        AppError::Internal("password hashing failed".into())
    })?;

    // Safe to insert after the availability check; the unique key still guards races.
    let created = users
        .create(NewUser {
            name: user.name.trim().to_string(),
            email,
            contact: user.contact.trim().to_string(),
            role: Role::Student,
            course: user.course,
            semester: user.semester,
            password_hash,
        })
        .await?;

    emails.mark_taken(&created.email).await;
    info!(user_id = created.id, "User registered");

    Ok(HttpResponse::Created().json(json!({
        "message": "User registered successfully",
        "id": created.id
    })))
}

/// Exchanges email and password for an access token.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body(content = LoginReqDto, content_type = "application/json"),
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Username or password missing"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(users, config, user),
    fields(username = %user.username)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    users: web::Data<dyn UserRepository>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    info!("Login request received");

    if user.username.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty username or password");
        return Err(AppError::validation("Username or password required").into());
    }

    debug!("Fetching user from store");

    let db_user = match users
        .find_by_email(&user.username.trim().to_lowercase())
        .await?
    {
        Some(found) => {
            debug!(user_id = found.id, "User found");
            found
        }
        None => {
            info!("Invalid credentials: user not found");
            return Err(AppError::Unauthorized("Invalid credentials".into()).into());
        }
    };

    if let Err(e) = verify_password(&user.password, &db_user.password_hash) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(AppError::Unauthorized("Invalid credentials".into()).into());
    }

    debug!("Password verified, generating access token");

    let access_token = generate_access_token(
        db_user.id,
        db_user.email.clone(),
        db_user.role,
        &config.jwt_secret,
        config.access_token_ttl,
    )
    .map_err(|e| {
        error!(error = %e, "Failed to sign access token");
        AppError::Internal("token signing failed".into())
    })?;

    info!("Login successful");

    Ok(HttpResponse::Ok().json(LoginResponse { access_token }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        auth::jwt::verify_token,
        repository::memory::{InMemoryLeaveRequests, InMemoryUsers},
    };
    use actix_web::{App, http::StatusCode, test, web::Data};

    fn user_store() -> Data<dyn UserRepository> {
        let leaves = Arc::new(InMemoryLeaveRequests::default());
        let users: Arc<dyn UserRepository> = Arc::new(InMemoryUsers::new(leaves));
        Data::from(users)
    }

    #[actix_web::test]
    async fn register_then_login_issues_a_student_token() {
        let config = Config::for_tests();
        let app = test::init_service(
            App::new()
                .app_data(Data::new(config.clone()))
                .app_data(user_store())
                .app_data(Data::new(EmailIndex::default()))
                .route("/auth/register", web::post().to(register))
                .route("/auth/login", web::post().to(login)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/auth/register")
            .set_json(json!({
                "name": "Asha Rao",
                "email": "Asha@College.edu",
                "contact": "123",
                "password": "s3cret",
                "course": "B.Tech",
                "semester": 5
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let req = test::TestRequest::post()
            .uri("/auth/register")
            .set_json(json!({
                "name": "Someone Else",
                "email": "asha@college.edu",
                "contact": "",
                "password": "other"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let req = test::TestRequest::post()
            .uri("/auth/login")
            .set_json(json!({ "username": "asha@college.edu", "password": "s3cret" }))
            .to_request();
        let body: LoginResponse = test::call_and_read_body_json(&app, req).await;
        let claims = verify_token(&body.access_token, &config.jwt_secret).unwrap();
        assert_eq!(claims.role, "student");
        assert_eq!(claims.sub, "asha@college.edu");
    }

    #[actix_web::test]
    async fn wrong_password_is_unauthorized() {
        let config = Config::for_tests();
        let users = user_store();
        users
            .create(NewUser {
                name: "Admin".into(),
                email: "admin@college.edu".into(),
                contact: "".into(),
                role: Role::Admin,
                course: None,
                semester: None,
                password_hash: hash_password("right").unwrap(),
            })
            .await
            .unwrap();

        let app = test::init_service(
            App::new()
                .app_data(Data::new(config))
                .app_data(users)
                .route("/auth/login", web::post().to(login)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/auth/login")
            .set_json(json!({ "username": "admin@college.edu", "password": "wrong" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::post()
            .uri("/auth/login")
            .set_json(json!({ "username": "nobody@college.edu", "password": "right" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn blank_registration_is_rejected() {
        let app = test::init_service(
            App::new()
                .app_data(user_store())
                .app_data(Data::new(EmailIndex::default()))
                .route("/auth/register", web::post().to(register)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/auth/register")
            .set_json(json!({ "name": " ", "email": "x@y.z", "contact": "", "password": "p" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
