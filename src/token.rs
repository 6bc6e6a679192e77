use axum::http::{HeaderMap, header};
use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};

use crate::{
    error::{AuthError, AuthResult},
    models::Role,
};

/// Claims
///
/// The payload carried inside every token. Signed with the process secret on issue and
/// checked on every authenticated request. Once verified, downstream code trusts `role`
/// without consulting the store again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): identifier of the user the token was issued to.
    pub sub: String,
    /// The user's role at issuance time.
    pub role: Role,
    /// Issued At (iat), unix seconds.
    pub iat: i64,
    /// Expiration Time (exp), unix seconds. The token is rejected from this instant on.
    pub exp: i64,
}

impl Claims {
    pub fn expires_at(&self) -> DateTime<Utc> {
        timestamp(self.exp)
    }
}

fn timestamp(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// IssuedToken
///
/// A freshly signed token together with the claims it encodes.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

/// TokenService
///
/// Issues and verifies HS256 tokens. Holds no mutable state; clones share the same keys.
#[derive(Clone)]
pub struct TokenService {
    keys: Arc<Keys>,
    ttl_secs: i64,
}

impl TokenService {
    /// new
    ///
    /// # Errors
    /// `AuthError::Configuration` if the secret is empty, or the ttl is under one second or
    /// does not fit a unix timestamp offset. All are startup-fatal.
    pub fn new(secret: &str, ttl: Duration) -> AuthResult<Self> {
        if secret.is_empty() {
            return Err(AuthError::Configuration(
                "token signing secret is empty".to_string(),
            ));
        }
        // Claims carry whole seconds, so a sub-second ttl would issue already-expired tokens.
        let ttl_secs = i64::try_from(ttl.as_secs())
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or_else(|| {
                AuthError::Configuration(format!(
                    "token ttl must be between 1 and {} seconds",
                    i64::MAX
                ))
            })?;

        Ok(Self {
            keys: Arc::new(Keys {
                encoding: EncodingKey::from_secret(secret.as_bytes()),
                decoding: DecodingKey::from_secret(secret.as_bytes()),
            }),
            ttl_secs,
        })
    }

    /// Issues a token for `subject` valid from now until now + ttl.
    pub fn issue(&self, subject: &str, role: Role) -> AuthResult<IssuedToken> {
        self.issue_at(subject, role, Utc::now())
    }

    /// Same as `issue` with an explicit issuance instant.
    pub fn issue_at(&self, subject: &str, role: Role, now: DateTime<Utc>) -> AuthResult<IssuedToken> {
        if subject.is_empty() {
            return Err(AuthError::Validation(
                "token subject must not be empty".to_string(),
            ));
        }

        let iat = now.timestamp();
        let claims = Claims {
            sub: subject.to_string(),
            role,
            iat,
            exp: iat.saturating_add(self.ttl_secs),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.keys.encoding)
            .map_err(|e| AuthError::Internal(format!("failed to sign token: {}", e)))?;

        tracing::debug!(sub = %claims.sub, role = %claims.role, exp = claims.exp, "issued token");

        Ok(IssuedToken { token, claims })
    }

    /// Verifies signature and expiry against the current time.
    pub fn verify(&self, token: &str) -> AuthResult<Claims> {
        self.verify_at(token, Utc::now())
    }

    /// verify_at
    ///
    /// Checks the signature, decodes the payload and rejects the token if `now >= exp`.
    /// Expiry is checked here rather than by the JWT library so the boundary is exact (no
    /// leeway) and the clock can be fixed in tests.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> AuthResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let claims = match decode::<Claims>(token, &self.keys.decoding, &validation) {
            Ok(data) => data.claims,
            Err(e) => {
                tracing::debug!(error = ?e.kind(), "token rejected");
                return Err(AuthError::InvalidToken);
            }
        };

        if now.timestamp() >= claims.exp {
            tracing::debug!(sub = %claims.sub, exp = claims.exp, "token expired");
            return Err(AuthError::InvalidToken);
        }

        tracing::debug!(sub = %claims.sub, role = %claims.role, "decoded user");
        Ok(claims)
    }

    /// Extracts the bearer token from `headers` and verifies it.
    pub fn verify_headers(&self, headers: &HeaderMap) -> AuthResult<Claims> {
        let token = bearer_token(headers)?;
        self.verify(token)
    }
}

/// bearer_token
///
/// Pulls the token out of an `Authorization: Bearer <token>` header. HTTP header names are
/// case-insensitive, so `authorization` and `Authorization` resolve to the same entry.
///
/// The value must start with the literal `Bearer`; the token is the second segment after
/// splitting on a single space. Anything else is `MissingToken`.
pub fn bearer_token(headers: &HeaderMap) -> AuthResult<&str> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(AuthError::MissingToken)?;

    if !value.starts_with("Bearer") {
        return Err(AuthError::MissingToken);
    }

    value
        .split(' ')
        .nth(1)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::MissingToken)
}
