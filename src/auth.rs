use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};

use crate::{
    error::AuthError,
    token::{Claims, TokenService},
};

/// authenticate
///
/// Middleware that guards every route under `/api/users`. It extracts the bearer token,
/// verifies it, and stores the resulting `Claims` in the request extensions so the role gate
/// and the handlers see the authenticated identity.
///
/// Rejection: `MissingToken` (401) or `InvalidToken` (400); the handler never runs.
pub async fn authenticate(
    State(tokens): State<TokenService>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let claims = tokens.verify_headers(request.headers())?;
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Claims Extractor Implementation
///
/// Makes `Claims` usable as a handler argument. Behind the `authenticate` middleware the
/// already verified claims are reused; elsewhere the token is verified on the spot.
impl<S> FromRequestParts<S> for Claims
where
    S: Send + Sync,
    TokenService: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(claims) = parts.extensions.get::<Claims>() {
            return Ok(claims.clone());
        }

        let tokens = TokenService::from_ref(state);
        let claims = tokens.verify_headers(&parts.headers)?;
        parts.extensions.insert(claims.clone());
        Ok(claims)
    }
}
