use crate::{
    AppState,
    guard::{AllowedRoles, require_roles},
    handlers,
    models::Role,
};
use axum::{Router, middleware, routing::get};

/// Users Router Module
///
/// Role-gated endpoints. The caller (`create_router`) wraps this router in the
/// `authenticate` layer, so every route here sees verified claims before its role gate runs.
///
/// Each route declares its permitted roles once; `gated` turns the declaration into a
/// `require_roles` layer scoped to that route.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        // GET /api/users/admin
        .merge(gated(
            Router::new().route("/admin", get(handlers::admin_access)),
            Role::Admin,
        ))
        // GET /api/users/manager
        .merge(gated(
            Router::new().route("/manager", get(handlers::manager_access)),
            [Role::Manager, Role::Admin],
        ))
        // GET /api/users/user
        .merge(gated(
            Router::new().route("/user", get(handlers::user_access)),
            [Role::Manager, Role::Admin, Role::User],
        ))
        // GET /api/users/me
        // Any verified token.
        .route("/me", get(handlers::get_me))
}

fn gated(router: Router<AppState>, allowed: impl Into<AllowedRoles>) -> Router<AppState> {
    let allowed: AllowedRoles = allowed.into();
    router.route_layer(middleware::from_fn_with_state(allowed, require_roles))
}
