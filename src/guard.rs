use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::collections::HashSet;

use crate::{error::AuthError, models::Role, token::Claims};

/// AllowedRoles
///
/// The statically declared set of roles permitted on a route. Routes may declare a single
/// role or a list; both normalize to the same set here, once, when the route is built.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AllowedRoles(HashSet<Role>);

impl AllowedRoles {
    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }
}

impl From<Role> for AllowedRoles {
    fn from(role: Role) -> Self {
        Self(HashSet::from([role]))
    }
}

impl<const N: usize> From<[Role; N]> for AllowedRoles {
    fn from(roles: [Role; N]) -> Self {
        roles.into_iter().collect()
    }
}

impl From<&[Role]> for AllowedRoles {
    fn from(roles: &[Role]) -> Self {
        roles.iter().copied().collect()
    }
}

impl From<Vec<Role>> for AllowedRoles {
    fn from(roles: Vec<Role>) -> Self {
        roles.into_iter().collect()
    }
}

impl FromIterator<Role> for AllowedRoles {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// authorize
///
/// The access decision: allow iff the verified role is in the route's permitted set.
/// Only ever called with claims that passed token verification.
pub fn authorize(claims: &Claims, allowed: &AllowedRoles) -> bool {
    allowed.contains(claims.role)
}

/// require_roles
///
/// Route-level middleware applied with `middleware::from_fn_with_state(allowed, require_roles)`.
/// It must sit inside the authentication layer, which places the verified `Claims` in the
/// request extensions. A request without claims is treated as unauthenticated.
pub async fn require_roles(
    State(allowed): State<AllowedRoles>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let claims = request
        .extensions()
        .get::<Claims>()
        .ok_or(AuthError::MissingToken)?;

    if !authorize(claims, &allowed) {
        tracing::warn!(
            sub = %claims.sub,
            role = %claims.role,
            path = %request.uri().path(),
            "access denied"
        );
        return Err(AuthError::Denied);
    }

    Ok(next.run(request).await)
}
