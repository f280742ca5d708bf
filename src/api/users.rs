//! Account endpoints: registration, login, profile, role management, and
//! transactional email.

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use axum_extra::extract::CookieJar;
use chrono::{Duration, Utc};
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

use crate::api::error::ApiError;
use crate::api::validation;
use crate::auth;
use crate::db::{
    AuthResponse, AuthUser, AutomatedEmailRequest, LoginRequest, MessageResponse,
    RegisterRequest, Role, UpdateProfileRequest, UpgradeRoleRequest, User, UserResponse,
    VerificationToken, AUTH_USER_COLUMNS,
};
use crate::email::{DispatchError, TemplateContext};
use crate::AppState;

fn session_ttl(state: &AppState) -> Duration {
    Duration::hours(state.config.auth.session_ttl_hours)
}

fn issue_token(state: &AppState, user_id: &str) -> Result<String, ApiError> {
    auth::issue_session_token(user_id, &state.config.auth.jwt_secret, session_ttl(state))
        .map_err(|e| ApiError::internal(format!("Failed to issue session token: {e}")))
}

/// Register a new account
///
/// POST /api/users/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>), ApiError> {
    validation::validate_name(&req.name).map_err(ApiError::validation)?;
    validation::validate_email(&req.email).map_err(ApiError::validation)?;
    validation::validate_password(&req.password).map_err(ApiError::validation)?;

    let existing: Option<(String,)> = sqlx::query_as("SELECT id FROM users WHERE email = ?")
        .bind(&req.email)
        .fetch_optional(&state.db)
        .await?;
    if existing.is_some() {
        return Err(ApiError::conflict("Email already registered, log in instead"));
    }

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());

    let id = uuid::Uuid::new_v4().to_string();
    let password_hash = auth::hash_password(&req.password)
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {e}")))?;
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        "INSERT INTO users (id, name, email, password_hash, role, is_verified, user_agent, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, 0, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&req.name)
    .bind(&req.email)
    .bind(&password_hash)
    .bind(Role::Regular)
    .bind(&user_agent)
    .bind(&now)
    .bind(&now)
    .execute(&state.db)
    .await?;

    info!(user_id = %id, "Registered new account");

    let token = issue_token(&state, &id)?;
    let jar = jar.add(auth::session_cookie(token.clone()));

    let user = UserResponse {
        id,
        name: req.name,
        email: req.email,
        number: None,
        bio: None,
        photo: None,
        role: Role::Regular,
        is_verified: false,
    };

    Ok((StatusCode::CREATED, jar, Json(AuthResponse { user, token })))
}

/// Log in with email and password
///
/// GET /api/users/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), ApiError> {
    if req.email.is_empty() || req.password.is_empty() {
        return Err(ApiError::validation("Please enter email and password"));
    }

    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = ?")
        .bind(&req.email)
        .fetch_optional(&state.db)
        .await?;
    let user = user.ok_or_else(|| ApiError::not_found("User does not exist"))?;

    if !auth::verify_password(&req.password, &user.password_hash) {
        return Err(ApiError::auth("Invalid email or password"));
    }

    // TODO: trigger a 2FA challenge when the User-Agent doesn't match the one
    // captured at registration.

    let token = issue_token(&state, &user.id)?;
    let jar = jar.add(auth::session_cookie(token.clone()));

    info!(user_id = %user.id, "User logged in");

    Ok((
        jar,
        Json(AuthResponse {
            user: user.into(),
            token,
        }),
    ))
}

/// Clear the session cookie. Client-side invalidation only: the token itself
/// stays valid until its embedded expiry.
///
/// GET /api/users/logOut
pub async fn log_out(jar: CookieJar) -> (CookieJar, Json<MessageResponse>) {
    (
        jar.add(auth::expired_session_cookie()),
        Json(MessageResponse::new("Logout successful")),
    )
}

/// Get the caller's profile
///
/// GET /api/users/getUser
pub async fn get_user(user: AuthUser) -> Json<UserResponse> {
    Json(user.into())
}

/// Update mutable profile fields. Email and role are immutable through this
/// path.
///
/// PATCH /api/users/updateUser
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    if let Some(name) = &req.name {
        validation::validate_name(name).map_err(ApiError::validation)?;
    }

    let result = sqlx::query(
        "UPDATE users SET \
             name = COALESCE(?, name), \
             number = COALESCE(?, number), \
             bio = COALESCE(?, bio), \
             photo = COALESCE(?, photo), \
             updated_at = ? \
         WHERE id = ?",
    )
    .bind(&req.name)
    .bind(&req.number)
    .bind(&req.bio)
    .bind(&req.photo)
    .bind(Utc::now().to_rfc3339())
    .bind(&user.id)
    .execute(&state.db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("User not found"));
    }

    let updated: AuthUser =
        sqlx::query_as(&format!("SELECT {AUTH_USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(&user.id)
            .fetch_one(&state.db)
            .await?;

    Ok(Json(updated.into()))
}

/// Delete an account (admin only)
///
/// DELETE /api/users/:id
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(&id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("User not found"));
    }

    info!(user_id = %id, "Account deleted");

    Ok(Json(MessageResponse::new("User deleted successfully")))
}

/// List all accounts, newest first (author/admin only)
///
/// GET /api/users/getAllUsers
pub async fn get_all_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users: Vec<AuthUser> = sqlx::query_as(&format!(
        "SELECT {AUTH_USER_COLUMNS} FROM users ORDER BY created_at DESC"
    ))
    .fetch_all(&state.db)
    .await?;

    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// Report whether the caller holds a valid session cookie
///
/// GET /api/users/loginStatus
pub async fn login_status(State(state): State<Arc<AppState>>, jar: CookieJar) -> Json<bool> {
    let token = jar.get(auth::SESSION_COOKIE).map(|c| c.value().to_string());
    Json(auth::verify_session_token(token.as_deref(), &state.config.auth.jwt_secret).is_ok())
}

/// Change an account's role (admin only). The role must parse into the closed
/// role set; arbitrary strings never reach the database.
///
/// POST /api/users/upgradeUser
pub async fn upgrade_user(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpgradeRoleRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let role = Role::from_str(&req.role)
        .map_err(|_| ApiError::validation(format!("Unknown role: {}", req.role)))?;

    let result = sqlx::query("UPDATE users SET role = ?, updated_at = ? WHERE id = ?")
        .bind(role)
        .bind(Utc::now().to_rfc3339())
        .bind(&req.id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("User not found"));
    }

    info!(user_id = %req.id, role = %role, "Role updated");

    Ok(Json(MessageResponse::new(format!(
        "User role updated to {role}"
    ))))
}

/// Send a templated email to a registered user
///
/// POST /api/users/sendAutomatedEmail
pub async fn send_automated_email(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Json(req): Json<AutomatedEmailRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if req.subject.is_empty()
        || req.send_to.is_empty()
        || req.reply_to.is_empty()
        || req.template.is_empty()
    {
        return Err(ApiError::validation("Missing email parameter"));
    }

    // The lookup only supplies the display name for the template; delivery
    // itself would not need an account to exist.
    let recipient: Option<AuthUser> =
        sqlx::query_as(&format!("SELECT {AUTH_USER_COLUMNS} FROM users WHERE email = ?"))
            .bind(&req.send_to)
            .fetch_optional(&state.db)
            .await?;
    let recipient = recipient.ok_or_else(|| ApiError::not_found("User not found"))?;

    let link = format!("{}{}", state.config.server.frontend_url, req.url);
    let ctx = TemplateContext {
        name: recipient.name,
        link,
    };

    state
        .mailer
        .send(&req.subject, &recipient.email, &req.reply_to, &req.template, &ctx)
        .await
        .map_err(|err| match err {
            DispatchError::UnknownTemplate(t) => {
                ApiError::validation(format!("Unknown email template: {t}"))
            }
            _ => ApiError::dispatch("Email not sent, please try again"),
        })?;

    Ok(Json(MessageResponse::new("Email sent")))
}

/// Create a fresh verification token for the caller and email the link.
/// A repeat request supersedes the previous token; the row persists even if
/// delivery fails.
///
/// POST /api/users/verificationEmail
pub async fn verification_email(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<MessageResponse>, ApiError> {
    if user.is_verified {
        return Err(ApiError::validation("Account already verified"));
    }

    let secret = auth::generate_opaque_secret();
    let secret_hash = auth::hash_opaque_secret(&secret);
    VerificationToken::upsert(
        &state.db,
        &user.id,
        &secret_hash,
        Duration::minutes(state.config.auth.verification_ttl_minutes),
    )
    .await?;

    let link = format!(
        "{}/verify/{}/{}",
        state.config.server.frontend_url, user.id, secret
    );
    let ctx = TemplateContext {
        name: user.name.clone(),
        link,
    };

    state
        .mailer
        .send("Verify your account", &user.email, "noreply", "verifyEmail", &ctx)
        .await
        .map_err(|_| ApiError::dispatch("Email not sent, please try again"))?;

    Ok(Json(MessageResponse::new("Verification email sent")))
}

/// Consume a verification link: check expiry, compare the secret against the
/// stored hash in constant time, then mark the account verified and delete
/// the token.
///
/// PATCH /api/users/verifyUser/:id/:secret
pub async fn verify_user(
    State(state): State<Arc<AppState>>,
    Path((id, secret)): Path<(String, String)>,
) -> Result<Json<MessageResponse>, ApiError> {
    let token = VerificationToken::find(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::auth("Invalid or expired verification link"))?;

    if token.is_expired() {
        VerificationToken::delete(&state.db, &id).await?;
        return Err(ApiError::auth("Invalid or expired verification link"));
    }

    if !auth::verify_opaque_secret(&secret, &token.secret_hash) {
        return Err(ApiError::auth("Invalid or expired verification link"));
    }

    sqlx::query("UPDATE users SET is_verified = 1, updated_at = ? WHERE id = ?")
        .bind(Utc::now().to_rfc3339())
        .bind(&id)
        .execute(&state.db)
        .await?;
    VerificationToken::delete(&state.db, &id).await?;

    info!(user_id = %id, "Account verified");

    Ok(Json(MessageResponse::new("Account verification successful")))
}
