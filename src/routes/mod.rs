//! Router Module Index
//!
//! Splits the API into a public surface and a token-protected surface. Access control is
//! attached as Axum layers at the router level, so no handler can be reached without it.

/// Routes reachable without a token: health, registration and login.
pub mod public;

/// Routes under `/api/users`. Every request is authenticated first and then checked against
/// the route's declared roles.
pub mod users;
