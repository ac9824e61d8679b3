// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and authenticated user representation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::roles::UserType;
use crate::storage::StoredUser;

/// Claims carried by access tokens issued by this server (HS256).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Numeric user id
    pub user_id: u64,
    pub email: String,
    pub user_type: UserType,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expiration (unix seconds)
    pub exp: i64,
}

/// Authenticated user information.
///
/// This is the primary type used throughout the application to represent
/// the authenticated user making a request. It is loaded from storage after
/// token verification, so it always reflects an existing account.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    pub user_id: u64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub user_type: UserType,
}

impl From<StoredUser> for AuthenticatedUser {
    fn from(user: StoredUser) -> Self {
        Self {
            user_id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            user_type: user.user_type,
        }
    }
}
