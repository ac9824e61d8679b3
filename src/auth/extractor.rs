// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for authenticated requests.
//!
//! Use the `Auth` extractor in handlers to require authentication:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(user): Auth) -> impl IntoResponse {
//!     // user is AuthenticatedUser
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::Utc;

use super::{claims::AccessClaims, token_fingerprint, AuthError, AuthenticatedUser};
use crate::state::AppState;
use crate::storage::{RevokedTokenRepository, UserRepository};

/// Extractor for authenticated users.
///
/// Checks, in order: a `Bearer` authorization header, the revocation list,
/// the token signature and expiry, and that the user still exists.
///
/// # Example
///
/// ```rust,ignore
/// async fn get_balance(
///     Auth(user): Auth,
///     State(state): State<AppState>,
/// ) -> Result<Json<BalanceResponse>, ApiError> {
///     // user.user_id contains the authenticated user's ID
/// }
/// ```
pub struct Auth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        ensure_not_revoked(state, token)?;

        let claims = state.tokens.verify(token).inspect_err(|e| {
            tracing::debug!(error_code = e.error_code(), "Rejected access token");
        })?;

        let user = UserRepository::new(&state.db)
            .find(claims.user_id)?
            .ok_or(AuthError::UserNotFound)?;

        Ok(Auth(user.into()))
    }
}

/// A bearer token signed by this server, expiry not enforced.
///
/// Used by logout so that clients can always revoke the token they hold.
pub struct SignedToken {
    pub token: String,
    pub claims: AccessClaims,
}

impl FromRequestParts<AppState> for SignedToken {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        ensure_not_revoked(state, token)?;
        let claims = state.tokens.verify_ignoring_expiry(token)?;
        Ok(SignedToken {
            token: token.to_string(),
            claims,
        })
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, AuthError> {
    let auth_header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::InvalidAuthHeader)
}

fn ensure_not_revoked(state: &AppState, token: &str) -> Result<(), AuthError> {
    let revoked = RevokedTokenRepository::new(&state.db)
        .is_revoked(&token_fingerprint(token), Utc::now().timestamp())?;
    if revoked {
        return Err(AuthError::TokenRevoked);
    }
    Ok(())
}
