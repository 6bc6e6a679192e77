use role_gate::{
    AuthError, CredentialService, InMemoryRepository, RepositoryState, TokenService,
    config::MIN_HASH_COST,
    credentials::MAX_PASSWORD_BYTES,
    models::{NewUser, Role},
    repository::UserRepository,
};
use std::{sync::Arc, time::Duration};

const SECRET: &str = "credential-test-secret";

fn tokens() -> TokenService {
    TokenService::new(SECRET, Duration::from_secs(3600)).unwrap()
}

fn setup() -> (Arc<InMemoryRepository>, CredentialService) {
    let repo = Arc::new(InMemoryRepository::new());
    let service =
        CredentialService::new(repo.clone() as RepositoryState, tokens(), MIN_HASH_COST).unwrap();
    (repo, service)
}

// --- Register ---

#[tokio::test]
async fn test_register_hashes_password() {
    let (repo, service) = setup();

    let user = service.register("alice", "s3cret", "manager").await.unwrap();

    assert_eq!(user.username, "alice");
    assert_eq!(user.role, Role::Manager);
    assert_ne!(user.password_hash, "s3cret");
    assert!(bcrypt::verify("s3cret", &user.password_hash).unwrap());
    assert_eq!(repo.count_users().await.unwrap(), 1);
}

#[tokio::test]
async fn test_register_with_unknown_role_writes_nothing() {
    let (repo, service) = setup();

    for role in ["superuser", "Admin", "", " user"] {
        let result = service.register("mallory", "pw", role).await;
        assert!(matches!(result, Err(AuthError::Validation(_))), "role {:?}", role);
    }

    assert_eq!(repo.count_users().await.unwrap(), 0);
}

#[tokio::test]
async fn test_register_rejects_empty_fields() {
    let (repo, service) = setup();

    let blank_name = service.register("   ", "pw", "user").await;
    assert!(matches!(blank_name, Err(AuthError::Validation(_))));

    let blank_password = service.register("dave", "", "user").await;
    assert!(matches!(blank_password, Err(AuthError::Validation(_))));

    assert_eq!(repo.count_users().await.unwrap(), 0);
}

#[tokio::test]
async fn test_duplicate_username_is_rejected() {
    let (repo, service) = setup();

    service.register("alice", "one", "user").await.unwrap();
    let second = service.register("alice", "two", "admin").await;

    assert!(matches!(second, Err(AuthError::DuplicateUser)));
    assert_eq!(repo.count_users().await.unwrap(), 1);
}

#[tokio::test]
async fn test_same_password_for_two_users_is_allowed() {
    let (repo, service) = setup();

    let a = service.register("erin", "shared", "user").await.unwrap();
    let b = service.register("frank", "shared", "user").await.unwrap();

    // Salted hashes differ even for identical passwords.
    assert_ne!(a.password_hash, b.password_hash);
    assert_eq!(repo.count_users().await.unwrap(), 2);
}

#[tokio::test]
async fn test_password_over_bcrypt_limit_is_rejected() {
    let (repo, service) = setup();

    let at_limit = "x".repeat(MAX_PASSWORD_BYTES);
    service.register("gina", &at_limit, "user").await.unwrap();

    let over_limit = format!("{}A", at_limit);
    let result = service.register("hank", &over_limit, "user").await;
    assert!(matches!(result, Err(AuthError::Validation(_))));
    assert_eq!(repo.count_users().await.unwrap(), 1);
}

// --- Login ---

#[tokio::test]
async fn test_login_issues_token_with_stored_role() {
    let (_repo, service) = setup();
    let user = service.register("alice", "s3cret", "admin").await.unwrap();

    let issued = service.login("alice", "s3cret").await.unwrap();
    let claims = tokens().verify(&issued.token).unwrap();

    assert_eq!(claims.sub, user.id.to_string());
    assert_eq!(claims.role, Role::Admin);
}

#[tokio::test]
async fn test_wrong_password_and_unknown_user_are_indistinguishable() {
    let (_repo, service) = setup();
    service.register("alice", "s3cret", "user").await.unwrap();

    let wrong_password = service.login("alice", "guess").await.unwrap_err();
    let unknown_user = service.login("nobody", "s3cret").await.unwrap_err();

    assert!(matches!(wrong_password, AuthError::InvalidCredentials));
    assert!(matches!(unknown_user, AuthError::InvalidCredentials));
    assert_eq!(wrong_password.status(), unknown_user.status());
    assert_eq!(wrong_password.public_message(), unknown_user.public_message());
}

#[tokio::test]
async fn test_login_trims_username_like_register() {
    let (_repo, service) = setup();
    service.register(" alice ", "pw", "user").await.unwrap();

    assert!(service.login(" alice ", "pw").await.is_ok());
    assert!(service.login("alice", "pw").await.is_ok());
}

#[tokio::test]
async fn test_password_sharing_first_72_bytes_does_not_log_in() {
    let (_repo, service) = setup();
    let stored = "x".repeat(MAX_PASSWORD_BYTES);
    service.register("ivy", &stored, "user").await.unwrap();

    let longer = format!("{}B", stored);
    let result = service.login("ivy", &longer).await;
    assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    assert!(service.login("ivy", &stored).await.is_ok());
}

// --- Store Failures ---

#[tokio::test]
async fn test_store_outage_is_not_invalid_credentials() {
    let repo = Arc::new(InMemoryRepository::new_failing()) as RepositoryState;
    let service = CredentialService::new(repo, tokens(), MIN_HASH_COST).unwrap();

    let login = service.login("alice", "s3cret").await;
    assert!(matches!(login, Err(AuthError::Internal(_))));

    let register = service.register("alice", "s3cret", "user").await;
    assert!(matches!(register, Err(AuthError::Internal(_))));
}

#[tokio::test]
async fn test_corrupt_stored_hash_is_internal_error() {
    let repo = Arc::new(InMemoryRepository::new());
    repo.create_user(NewUser {
        username: "jack".to_string(),
        password_hash: "not-a-bcrypt-hash".to_string(),
        role: Role::User,
    })
    .await
    .unwrap();
    let service =
        CredentialService::new(repo as RepositoryState, tokens(), MIN_HASH_COST).unwrap();

    let result = service.login("jack", "pw").await;
    assert!(matches!(result, Err(AuthError::Internal(_))));
}

#[test]
fn test_invalid_cost_is_configuration_error() {
    let repo = Arc::new(InMemoryRepository::new()) as RepositoryState;
    let result = CredentialService::new(repo, tokens(), 2);
    assert!(matches!(result, Err(AuthError::Configuration(_))));
}
