use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
};
use role_gate::{
    AppConfig, AppState, InMemoryRepository, RepositoryState, create_router,
    models::{LoginResponse, MessageResponse, Role, SessionInfo},
};
use serde_json::json;
use std::sync::Arc;
use tower::util::ServiceExt;

// --- Test Harness ---

struct TestApp {
    router: Router,
    state: AppState,
}

fn spawn_app() -> TestApp {
    let repo = Arc::new(InMemoryRepository::new()) as RepositoryState;
    let state = AppState::new(repo, AppConfig::default()).unwrap();
    TestApp {
        router: create_router(state.clone()),
        state,
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn post_json(&self, uri: &str, body: serde_json::Value) -> Response {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    async fn get(&self, uri: &str, authorization: Option<&str>) -> Response {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    /// Registers a user and logs in, returning the bearer token.
    async fn token_for(&self, username: &str, role: &str) -> String {
        let registered = self
            .post_json(
                "/api/auth/register",
                json!({ "username": username, "password": "pw", "role": role }),
            )
            .await;
        assert_eq!(registered.status(), StatusCode::CREATED);

        let login = self
            .post_json(
                "/api/auth/login",
                json!({ "username": username, "password": "pw" }),
            )
            .await;
        assert_eq!(login.status(), StatusCode::OK);
        let body: LoginResponse = read_json(login).await;
        body.token
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn message(response: Response) -> String {
    read_json::<MessageResponse>(response).await.message
}

// --- Public Routes ---

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app();
    let response = app.get("/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_register_rejects_unknown_role() {
    let app = spawn_app();
    let response = app
        .post_json(
            "/api/auth/register",
            json!({ "username": "eve", "password": "pw", "role": "root" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_failures_look_identical() {
    let app = spawn_app();
    app.token_for("alice", "user").await;

    let wrong_password = app
        .post_json(
            "/api/auth/login",
            json!({ "username": "alice", "password": "nope" }),
        )
        .await;
    let unknown_user = app
        .post_json(
            "/api/auth/login",
            json!({ "username": "nobody", "password": "pw" }),
        )
        .await;

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(message(wrong_password).await, message(unknown_user).await);
}

// --- Authentication Failures ---

#[tokio::test]
async fn test_missing_token_is_401() {
    let app = spawn_app();
    let response = app.get("/api/users/user", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(message(response).await, "Unauthorized, no token provided");
}

#[tokio::test]
async fn test_non_bearer_header_is_401() {
    let app = spawn_app();
    let response = app.get("/api/users/user", Some("Token abc")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(message(response).await, "Unauthorized, no token provided");
}

#[tokio::test]
async fn test_invalid_token_is_400() {
    let app = spawn_app();
    let response = app
        .get("/api/users/user", Some("Bearer not.a.token"))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(message(response).await, "Invalid token");
}

// --- Role Gates ---

#[tokio::test]
async fn test_admin_reaches_every_route() {
    let app = spawn_app();
    let token = format!("Bearer {}", app.token_for("root", "admin").await);

    for (path, expected) in [
        ("/api/users/admin", "Admin access granted"),
        ("/api/users/manager", "Manager access granted"),
        ("/api/users/user", "User access granted"),
    ] {
        let response = app.get(path, Some(&token)).await;
        assert_eq!(response.status(), StatusCode::OK, "{}", path);
        assert_eq!(message(response).await, expected);
    }
}

#[tokio::test]
async fn test_manager_is_denied_admin_route() {
    let app = spawn_app();
    let token = format!("Bearer {}", app.token_for("mia", "manager").await);

    let admin = app.get("/api/users/admin", Some(&token)).await;
    assert_eq!(admin.status(), StatusCode::FORBIDDEN);
    assert_eq!(message(admin).await, "Access denied");

    let manager = app.get("/api/users/manager", Some(&token)).await;
    assert_eq!(manager.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_user_only_reaches_user_route() {
    let app = spawn_app();
    let token = format!("Bearer {}", app.token_for("ulla", "user").await);

    assert_eq!(
        app.get("/api/users/admin", Some(&token)).await.status(),
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        app.get("/api/users/manager", Some(&token)).await.status(),
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        app.get("/api/users/user", Some(&token)).await.status(),
        StatusCode::OK
    );
}

#[tokio::test]
async fn test_me_returns_session() {
    let app = spawn_app();
    let raw = app.token_for("mia", "manager").await;
    let claims = app.state.tokens.verify(&raw).unwrap();

    let response = app
        .get("/api/users/me", Some(&format!("Bearer {}", raw)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let session: SessionInfo = read_json(response).await;
    assert_eq!(session.subject, claims.sub);
    assert_eq!(session.role, Role::Manager);
}

#[tokio::test]
async fn test_token_from_other_secret_is_rejected() {
    let app = spawn_app();
    let foreign = role_gate::TokenService::new("someone-else", std::time::Duration::from_secs(60))
        .unwrap()
        .issue("intruder", Role::Admin)
        .unwrap();

    let response = app
        .get("/api/users/admin", Some(&format!("Bearer {}", foreign.token)))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = spawn_app();
    let response = app.get("/api-docs/openapi.json", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let doc: serde_json::Value = read_json(response).await;
    assert!(doc["paths"].get("/api/auth/login").is_some());
    assert!(doc["paths"].get("/api/users/admin").is_some());
}
