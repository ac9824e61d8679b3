// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Accounts authenticate with email and password and receive an HS256 JWT
//! signed with the server secret.
//!
//! ## Auth Flow
//!
//! 1. Client registers or logs in and receives a token
//! 2. Client sends `Authorization: Bearer <token>`
//! 3. The [`Auth`] extractor:
//!    - rejects tokens on the revocation list
//!    - verifies signature and expiry
//!    - loads the user the token names
//! 4. Logout adds the token's SHA-256 fingerprint to the revocation list
//!
//! ## Security
//!
//! - Passwords are stored as salted PBKDF2-HMAC-SHA256 hashes
//! - Raw tokens are never stored
//! - Clock skew tolerance is 60 seconds

pub mod claims;
pub mod error;
pub mod extractor;
pub mod password;
pub mod roles;
pub mod tokens;

pub use claims::{AccessClaims, AuthenticatedUser};
pub use error::AuthError;
pub use extractor::{Auth, SignedToken};
pub use password::{hash_password, verify_password, PasswordError};
pub use roles::UserType;
pub use tokens::{token_fingerprint, TokenIssuer};
