use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod credentials;
pub mod error;
pub mod guard;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod token;

// Routing split into the public and the token-protected surface.
pub mod routes;
use routes::{public, users};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use credentials::CredentialService;
pub use error::{AuthError, AuthResult};
pub use guard::{AllowedRoles, authorize};
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};
pub use token::{Claims, TokenService};

/// ApiDoc
///
/// Generates the OpenAPI document served at `/api-docs/openapi.json` from the
/// `#[utoipa::path]` annotations on the handlers.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::register_user, handlers::login, handlers::admin_access,
        handlers::manager_access, handlers::user_access, handlers::get_me
    ),
    components(
        schemas(
            models::Role, models::RegisterRequest, models::LoginRequest, models::LoginResponse,
            models::UserProfile, models::SessionInfo, models::MessageResponse,
        )
    ),
    modifiers(&BearerSecurity),
    tags(
        (name = "role-gate", description = "Token issuance and role-gated access API")
    )
)]
struct ApiDoc;

/// Registers the `bearer` scheme referenced by the protected paths.
struct BearerSecurity;

impl Modify for BearerSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// AppState
///
/// The single, immutable container shared across all requests. Everything in it is built
/// once at startup from `AppConfig`.
#[derive(Clone)]
pub struct AppState {
    /// Credential store.
    pub repo: RepositoryState,
    /// Token issuance and verification, keyed with the configured secret.
    pub tokens: TokenService,
    /// Register/login on top of `repo` and `tokens`.
    pub credentials: CredentialService,
    /// The loaded configuration.
    pub config: AppConfig,
}

impl AppState {
    /// new
    ///
    /// Wires the token and credential services from the configuration.
    ///
    /// # Errors
    /// `AuthError::Configuration` for an empty secret, a zero ttl, or an invalid bcrypt cost.
    pub fn new(repo: RepositoryState, config: AppConfig) -> AuthResult<Self> {
        let tokens = TokenService::new(&config.jwt_secret, config.token_ttl)?;
        let credentials = CredentialService::new(repo.clone(), tokens.clone(), config.hash_cost)?;
        Ok(Self {
            repo,
            tokens,
            credentials,
            config,
        })
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for TokenService {
    fn from_ref(app_state: &AppState) -> TokenService {
        app_state.tokens.clone()
    }
}

impl FromRef<AppState> for CredentialService {
    fn from_ref(app_state: &AppState) -> CredentialService {
        app_state.credentials.clone()
    }
}

/// create_router
///
/// Assembles the routing structure, applies global and scoped middleware, and registers the
/// application state.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        // Every /api/users route is authenticated before its role gate runs.
        .nest(
            "/api/users",
            users::user_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth::authenticate,
            )),
        )
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the per-request span with method, URI and the `x-request-id` so every log line of
/// one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
