// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! This module defines the request and response data structures used by
//! the REST API. Request types keep every field optional so that handlers
//! can report exactly which field is missing.
//!
//! ## Money
//!
//! Amounts are rendered as decimal strings with two fractional digits
//! (`"15.00"`), never as JSON numbers.
//!
//! ## Model Categories
//!
//! - **Accounts**: registration, login, logout
//! - **Posts**: paid content with author ownership
//! - **Wallet**: balance, history and funding

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

use crate::auth::{AuthenticatedUser, UserType};
use crate::storage::{StoredPost, StoredTransaction, StoredUser, TransactionType};

// =============================================================================
// Accounts
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    /// Date of birth, `YYYY-MM-DD`
    pub dob: Option<String>,
    /// `viewer` or `editor`
    pub user_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: u64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub user_type: UserType,
}

impl From<StoredUser> for UserResponse {
    fn from(user: StoredUser) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            user_type: user.user_type,
        }
    }
}

impl From<AuthenticatedUser> for UserResponse {
    fn from(user: AuthenticatedUser) -> Self {
        Self {
            id: user.user_id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            user_type: user.user_type,
        }
    }
}

/// Returned by register and login.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub message: String,
    /// Bearer token for subsequent requests
    pub token: String,
    pub user: UserResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// =============================================================================
// Posts
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthorSummary {
    pub id: u64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<StoredUser> for AuthorSummary {
    fn from(user: StoredUser) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
        }
    }
}

impl From<&AuthenticatedUser> for AuthorSummary {
    fn from(user: &AuthenticatedUser) -> Self {
        Self {
            id: user.user_id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PostResponse {
    pub id: u64,
    pub title: String,
    pub description: String,
    /// 1 to 5
    pub rating: u8,
    pub author: AuthorSummary,
    /// RFC 3339
    pub created_at: String,
    /// RFC 3339
    pub updated_at: String,
}

impl PostResponse {
    pub fn new(post: StoredPost, author: AuthorSummary) -> Self {
        Self {
            id: post.id,
            title: post.title,
            description: post.description,
            rating: post.rating,
            author,
            created_at: post.created_at.to_rfc3339(),
            updated_at: post.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PostListResponse {
    pub posts: Vec<PostResponse>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CreatePostRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    /// Integer from 1 to 5
    #[schema(value_type = Option<i64>)]
    pub rating: Option<Value>,
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    /// Integer from 1 to 5
    #[schema(value_type = Option<i64>)]
    pub rating: Option<Value>,
}

// =============================================================================
// Wallet
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BalanceResponse {
    /// Decimal string, e.g. `"15.00"`
    pub balance: String,
    /// ISO currency code, upper case
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransactionEntry {
    pub id: u64,
    /// Always positive decimal string
    pub amount: String,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub description: String,
    /// RFC 3339
    pub created_at: String,
}

impl From<StoredTransaction> for TransactionEntry {
    fn from(tx: StoredTransaction) -> Self {
        Self {
            id: tx.id,
            amount: tx.amount.to_string(),
            transaction_type: tx.transaction_type,
            description: tx.description,
            created_at: tx.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransactionListResponse {
    pub transactions: Vec<TransactionEntry>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct TransactionListQuery {
    /// Maximum entries to return (default 50, max 100)
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct FundWalletRequest {
    /// Amount in major units, as a string (`"10.00"`) or number
    #[schema(value_type = Option<String>)]
    pub amount: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FundWalletResponse {
    pub client_secret: String,
    pub payment_intent_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WebhookAckResponse {
    pub status: String,
}
