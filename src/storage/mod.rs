// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistent storage in a single embedded redb database.
//!
//! ## Storage Layout
//!
//! ```text
//! $DATA_DIR/
//!   postwallet.redb   # users, wallets, ledger, posts, revoked tokens
//! ```
//!
//! See [`db`] for the table layout and the atomicity model.

pub mod db;
pub mod ownership;
pub mod repository;

pub use db::{Database, StoreError, StoreResult};
pub use ownership::OwnedResource;
pub use repository::{
    normalize_email, LedgerStore, NewPost, NewUser, PostRepository, RevokedTokenRepository,
    StoredPost, StoredTransaction, StoredUser, StoredWallet, TransactionType, UserRepository,
};
