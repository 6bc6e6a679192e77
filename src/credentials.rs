use std::sync::Arc;

use crate::{
    error::{AuthError, AuthResult},
    models::{NewUser, Role, User},
    repository::RepositoryState,
    token::{IssuedToken, TokenService},
};

/// bcrypt only reads the first 72 bytes of its input; longer passwords are refused rather
/// than silently truncated.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Usernames are stored and looked up in this form.
fn normalize_username(username: &str) -> &str {
    username.trim()
}

/// CredentialService
///
/// Registration and login on top of the credential store and the token service.
/// bcrypt work is CPU-bound, so it runs on tokio's blocking pool.
#[derive(Clone)]
pub struct CredentialService {
    repo: RepositoryState,
    tokens: TokenService,
    hash_cost: u32,
    // Verified against when the username is unknown, so both login failures cost the same.
    dummy_hash: Arc<str>,
}

impl CredentialService {
    pub fn new(repo: RepositoryState, tokens: TokenService, hash_cost: u32) -> AuthResult<Self> {
        let dummy_hash = bcrypt::hash("role-gate-dummy-password", hash_cost)
            .map_err(|e| AuthError::Configuration(format!("invalid bcrypt cost: {}", e)))?;

        Ok(Self {
            repo,
            tokens,
            hash_cost,
            dummy_hash: dummy_hash.into(),
        })
    }

    /// register
    ///
    /// Validates the input, hashes the password and creates the user. Nothing is written to
    /// the store unless validation passes.
    pub async fn register(&self, username: &str, password: &str, role: &str) -> AuthResult<User> {
        let role: Role = role.parse()?;
        let username = normalize_username(username);
        if username.is_empty() {
            return Err(AuthError::Validation("username must not be empty".to_string()));
        }
        if password.is_empty() {
            return Err(AuthError::Validation("password must not be empty".to_string()));
        }
        if password.len() > MAX_PASSWORD_BYTES {
            return Err(AuthError::Validation(format!(
                "password must be at most {} bytes",
                MAX_PASSWORD_BYTES
            )));
        }

        let password = password.to_string();
        let cost = self.hash_cost;
        let password_hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| AuthError::Internal(format!("hashing task failed: {}", e)))?
            .map_err(|e| AuthError::Internal(format!("failed to hash password: {}", e)))?;

        let user = self
            .repo
            .create_user(NewUser {
                username: username.to_string(),
                password_hash,
                role,
            })
            .await?;

        tracing::info!(username = %user.username, role = %user.role, "user registered");
        Ok(user)
    }

    /// login
    ///
    /// Unknown user, wrong password and an over-long password all return
    /// `InvalidCredentials`. A store failure or an unreadable stored hash is reported as
    /// `Internal` so a fault never looks like a bad password.
    pub async fn login(&self, username: &str, password: &str) -> AuthResult<IssuedToken> {
        let username = normalize_username(username);
        let user = self.repo.find_by_username(username).await?;

        let hash = match &user {
            Some(user) => user.password_hash.clone(),
            None => self.dummy_hash.to_string(),
        };
        let candidate = password.to_string();
        let verified = tokio::task::spawn_blocking(move || bcrypt::verify(candidate, &hash))
            .await
            .map_err(|e| AuthError::Internal(format!("hashing task failed: {}", e)))?;

        let matches = match verified {
            Ok(matches) => matches && password.len() <= MAX_PASSWORD_BYTES,
            Err(e) => {
                tracing::error!(username = %username, error = %e, "stored password hash is unreadable");
                return Err(AuthError::Internal(format!("unreadable password hash: {}", e)));
            }
        };

        let user = match user {
            Some(user) if matches => user,
            _ => {
                tracing::warn!(username = %username, "login failed");
                return Err(AuthError::InvalidCredentials);
            }
        };

        let issued = self.tokens.issue(&user.id.to_string(), user.role)?;
        tracing::info!(username = %user.username, role = %user.role, "login succeeded");
        Ok(issued)
    }
}
