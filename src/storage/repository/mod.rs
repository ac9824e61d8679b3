// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to the embedded database.
//!
//! Each repository provides CRUD operations for a specific entity type.
//! Operations that must share an atomic unit with another repository are
//! exposed as associated functions taking an open `WriteTransaction`.

pub mod ledger;
pub mod posts;
pub mod revoked_tokens;
pub mod users;

pub use ledger::{LedgerStore, StoredTransaction, StoredWallet, TransactionType};
pub use posts::{NewPost, PostRepository, StoredPost};
pub use revoked_tokens::RevokedTokenRepository;
pub use users::{normalize_email, NewUser, StoredUser, UserRepository};
