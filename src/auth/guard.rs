//! Authorization gate: session resolution middleware plus stackable role
//! predicates.
//!
//! `require_session` turns a cookie into an [`AuthUser`] in the request
//! extensions (or a 401/403). The role predicates below it only look at that
//! resolved identity, so a route can stack e.g. session + verified + author.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use std::sync::Arc;
use tracing::warn;

use crate::api::error::ApiError;
use crate::auth::{self, SESSION_COOKIE};
use crate::db::{AuthUser, Role, AUTH_USER_COLUMNS};
use crate::AppState;

/// Resolve the caller's identity from the session cookie.
///
/// Any token problem (missing, malformed, expired) and a missing user record
/// all collapse to 401; a suspended account is 403.
pub async fn resolve_session(state: &AppState, jar: &CookieJar) -> Result<AuthUser, ApiError> {
    let token = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());

    let user_id = auth::verify_session_token(token.as_deref(), &state.config.auth.jwt_secret)
        .map_err(|err| {
            warn!(reason = %err, "session token rejected");
            ApiError::unauthorized("You are not authorized, please log in")
        })?;

    let user: Option<AuthUser> = sqlx::query_as(&format!(
        "SELECT {AUTH_USER_COLUMNS} FROM users WHERE id = ?"
    ))
    .bind(&user_id)
    .fetch_optional(&state.db)
    .await?;

    // Tokens are not invalidated when an account is deleted, so a verified
    // token can still point at a missing row.
    let user = user.ok_or_else(|| {
        warn!(user_id = %user_id, "session token for unknown user");
        ApiError::unauthorized("You are not authorized, please log in")
    })?;

    if user.role == Role::Suspended {
        return Err(ApiError::forbidden("Account suspended, please contact support"));
    }

    Ok(user)
}

/// Middleware gating all protected routes. On success the resolved identity
/// is attached to the request extensions for downstream handlers.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = resolve_session(&state, &jar).await?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Check whether a role satisfies a predicate's allowed set.
pub fn role_allows(role: Role, allowed: &[Role]) -> bool {
    allowed.contains(&role)
}

fn current_user(request: &Request) -> Result<&AuthUser, ApiError> {
    request
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| ApiError::unauthorized("You are not authorized, please log in"))
}

async fn require_role(
    request: Request,
    next: Next,
    allowed: &[Role],
    label: &str,
) -> Result<Response, ApiError> {
    let user = current_user(&request)?;
    if role_allows(user.role, allowed) {
        Ok(next.run(request).await)
    } else {
        warn!(user_id = %user.id, role = %user.role, required = label, "role predicate rejected");
        Err(ApiError::forbidden(format!(
            "You are not authorized as {label}"
        )))
    }
}

pub async fn admin_only(request: Request, next: Next) -> Result<Response, ApiError> {
    require_role(request, next, &[Role::Admin], "admin").await
}

pub async fn author_only(request: Request, next: Next) -> Result<Response, ApiError> {
    require_role(request, next, &[Role::Author, Role::Admin], "author").await
}

pub async fn rider_only(request: Request, next: Next) -> Result<Response, ApiError> {
    require_role(request, next, &[Role::Rider], "rider").await
}

pub async fn vendor_only(request: Request, next: Next) -> Result<Response, ApiError> {
    require_role(request, next, &[Role::Vendor], "vendor").await
}

/// Require the account's email to be verified.
pub async fn verified_only(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = current_user(&request)?;
    if user.is_verified {
        Ok(next.run(request).await)
    } else {
        Err(ApiError::forbidden("You are not authorized, account not verified"))
    }
}

/// Extractor for handlers running below `require_session`.
#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("You are not authorized, please log in"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_allows() {
        assert!(role_allows(Role::Admin, &[Role::Admin]));
        assert!(role_allows(Role::Admin, &[Role::Author, Role::Admin]));
        assert!(role_allows(Role::Author, &[Role::Author, Role::Admin]));
        assert!(!role_allows(Role::Regular, &[Role::Author, Role::Admin]));
        assert!(!role_allows(Role::Suspended, &[Role::Admin]));
        assert!(!role_allows(Role::Vendor, &[Role::Rider]));
    }
}
