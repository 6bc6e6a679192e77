use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints that need no bearer token: the health probe and the credential exchange.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        .nest(
            "/api/auth",
            Router::new()
                // POST /api/auth/register
                // Creates a user with a hashed password and one of the three roles.
                .route("/register", post(handlers::register_user))
                // POST /api/auth/login
                // Verifies the password and returns a signed, time-bounded token.
                .route("/login", post(handlers::login)),
        )
}
