use crate::{
    credentials::CredentialService,
    error::AuthError,
    models::{
        LoginRequest, LoginResponse, MessageResponse, RegisterRequest, SessionInfo, UserProfile,
    },
    token::Claims,
};
use axum::{Json, extract::State, http::StatusCode};

// --- Credential Handlers ---

/// register_user
///
/// [Public Route] Creates a user record. The role must be one of admin, manager, user.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = UserProfile),
        (status = 400, description = "Invalid role or empty field", body = MessageResponse),
        (status = 409, description = "Username taken", body = MessageResponse)
    )
)]
pub async fn register_user(
    State(credentials): State<CredentialService>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserProfile>), AuthError> {
    let user = credentials
        .register(&payload.username, &payload.password, &payload.role)
        .await?;
    Ok((StatusCode::CREATED, Json(UserProfile::from(user))))
}

/// login
///
/// [Public Route] Exchanges a username and password for a signed bearer token.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = MessageResponse)
    )
)]
pub async fn login(
    State(credentials): State<CredentialService>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AuthError> {
    let issued = credentials
        .login(&payload.username, &payload.password)
        .await?;

    Ok(Json(LoginResponse {
        token: issued.token,
        token_type: "Bearer".to_string(),
        role: issued.claims.role,
        expires_at: issued.claims.expires_at(),
    }))
}

// --- Role-Gated Handlers ---
// The role check happens in the `require_roles` layer; these only run once it has passed.

/// admin_access
///
/// [Admin Route]
#[utoipa::path(
    get,
    path = "/api/users/admin",
    responses(
        (status = 200, description = "Admin access granted", body = MessageResponse),
        (status = 403, description = "Role not permitted", body = MessageResponse)
    ),
    security(("bearer" = []))
)]
pub async fn admin_access() -> Json<MessageResponse> {
    Json(MessageResponse::new("Admin access granted"))
}

/// manager_access
///
/// [Manager Route] Open to managers and admins.
#[utoipa::path(
    get,
    path = "/api/users/manager",
    responses(
        (status = 200, description = "Manager access granted", body = MessageResponse),
        (status = 403, description = "Role not permitted", body = MessageResponse)
    ),
    security(("bearer" = []))
)]
pub async fn manager_access() -> Json<MessageResponse> {
    Json(MessageResponse::new("Manager access granted"))
}

/// user_access
///
/// [User Route] Open to every role.
#[utoipa::path(
    get,
    path = "/api/users/user",
    responses((status = 200, description = "User access granted", body = MessageResponse)),
    security(("bearer" = []))
)]
pub async fn user_access() -> Json<MessageResponse> {
    Json(MessageResponse::new("User access granted"))
}

/// get_me
///
/// [Authenticated Route] Echoes the identity carried by the caller's verified token.
#[utoipa::path(
    get,
    path = "/api/users/me",
    responses((status = 200, description = "Session", body = SessionInfo)),
    security(("bearer" = []))
)]
pub async fn get_me(claims: Claims) -> Json<SessionInfo> {
    Json(SessionInfo {
        expires_at: claims.expires_at(),
        subject: claims.sub,
        role: claims.role,
    })
}
