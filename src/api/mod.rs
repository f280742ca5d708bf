pub mod error;
pub mod users;
pub mod validation;

use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::guard;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Public routes (no session required)
    let public_routes = Router::new()
        .route("/register", post(users::register))
        .route("/login", get(users::login))
        .route("/logOut", get(users::log_out))
        .route("/loginStatus", get(users::login_status))
        .route("/verifyUser/:id/:secret", patch(users::verify_user));

    // Routes requiring only an authenticated session
    let session_routes = Router::new()
        .route("/getUser", get(users::get_user))
        .route("/updateUser", patch(users::update_user))
        .route("/sendAutomatedEmail", post(users::send_automated_email))
        .route("/verificationEmail", post(users::verification_email));

    let author_routes = Router::new()
        .route("/getAllUsers", get(users::get_all_users))
        .route_layer(middleware::from_fn(guard::author_only));

    let admin_routes = Router::new()
        .route("/:id", delete(users::delete_user))
        .route("/upgradeUser", post(users::upgrade_user))
        .route_layer(middleware::from_fn(guard::admin_only));

    // Session resolution runs before any role predicate
    let protected_routes = session_routes
        .merge(author_routes)
        .merge(admin_routes)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            guard::require_session,
        ));

    let cors = CorsLayer::new()
        .allow_origin(
            state
                .config
                .server
                .frontend_url
                .parse::<HeaderValue>()
                .unwrap_or_else(|_| HeaderValue::from_static("http://localhost:3000")),
        )
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/users", public_routes.merge(protected_routes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
