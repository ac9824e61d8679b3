// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `sequences`: sequence name → last issued id
//! - `users`: user_id → serialized StoredUser
//! - `user_emails`: normalized email → user_id
//! - `wallets`: wallet_id → serialized StoredWallet
//! - `wallet_owners`: user_id → wallet_id
//! - `transactions`: tx_id → serialized StoredTransaction
//! - `wallet_tx_index`: (wallet_id, !tx_id) → tx_id
//! - `payment_refs`: external payment reference → tx_id
//! - `posts`: post_id → serialized StoredPost
//! - `revoked_tokens`: token fingerprint → expiry (unix seconds)
//!
//! ## Atomicity
//!
//! redb admits a single write transaction at a time. Every balance mutation
//! runs inside [`Database::write`], so mutations of the same wallet are
//! serialized and a failed unit is rolled back as a whole.

use std::path::Path;

use redb::{
    ReadTransaction, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction,
};
use serde::{de::DeserializeOwned, Serialize};

// =============================================================================
// Table Definitions
// =============================================================================

/// Monotonic id sequences: name → last issued value.
pub(crate) const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

/// Primary user table: user_id → serialized StoredUser (JSON bytes).
pub(crate) const USERS: TableDefinition<u64, &[u8]> = TableDefinition::new("users");

/// Unique index: normalized email → user_id.
pub(crate) const USER_EMAILS: TableDefinition<&str, u64> = TableDefinition::new("user_emails");

/// Primary wallet table: wallet_id → serialized StoredWallet (JSON bytes).
pub(crate) const WALLETS: TableDefinition<u64, &[u8]> = TableDefinition::new("wallets");

/// One-to-one index: user_id → wallet_id.
pub(crate) const WALLET_OWNERS: TableDefinition<u64, u64> = TableDefinition::new("wallet_owners");

/// Append-only ledger entries: tx_id → serialized StoredTransaction.
pub(crate) const TRANSACTIONS: TableDefinition<u64, &[u8]> = TableDefinition::new("transactions");

/// Index: (wallet_id, inverted tx_id) → tx_id.
///
/// Ids are issued in increasing order, so inverting them makes a forward
/// range scan return the newest entries first.
pub(crate) const WALLET_TX_INDEX: TableDefinition<(u64, u64), u64> =
    TableDefinition::new("wallet_tx_index");

/// Unique index: external payment reference → tx_id.
pub(crate) const PAYMENT_REFS: TableDefinition<&str, u64> = TableDefinition::new("payment_refs");

/// Posts: post_id → serialized StoredPost.
pub(crate) const POSTS: TableDefinition<u64, &[u8]> = TableDefinition::new("posts");

/// Revoked access tokens: SHA-256 fingerprint → expiry (unix seconds).
pub(crate) const REVOKED_TOKENS: TableDefinition<&str, i64> =
    TableDefinition::new("revoked_tokens");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Database
// =============================================================================

/// Embedded ACID database shared by every repository.
pub struct Database {
    db: redb::Database,
}

impl Database {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = redb::Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(SEQUENCES)?;
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(USER_EMAILS)?;
            let _ = write_txn.open_table(WALLETS)?;
            let _ = write_txn.open_table(WALLET_OWNERS)?;
            let _ = write_txn.open_table(TRANSACTIONS)?;
            let _ = write_txn.open_table(WALLET_TX_INDEX)?;
            let _ = write_txn.open_table(PAYMENT_REFS)?;
            let _ = write_txn.open_table(POSTS)?;
            let _ = write_txn.open_table(REVOKED_TOKENS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Run `f` inside one write transaction.
    ///
    /// Commits when `f` returns `Ok`. On `Err` the transaction is aborted and
    /// nothing `f` wrote becomes visible.
    pub fn write<T, E>(&self, f: impl FnOnce(&WriteTransaction) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let txn = self.db.begin_write().map_err(StoreError::from)?;
        match f(&txn) {
            Ok(value) => {
                txn.commit().map_err(StoreError::from)?;
                Ok(value)
            }
            Err(e) => {
                if let Err(abort_err) = txn.abort() {
                    tracing::warn!(error = %abort_err, "Failed to abort write transaction");
                }
                Err(e)
            }
        }
    }

    /// Run `f` against a consistent read snapshot.
    pub fn read<T>(&self, f: impl FnOnce(&ReadTransaction) -> StoreResult<T>) -> StoreResult<T> {
        let txn = self.db.begin_read()?;
        f(&txn)
    }

    /// Verify the database can serve a read transaction.
    pub fn health_check(&self) -> StoreResult<()> {
        self.read(|txn| {
            let table = txn.open_table(SEQUENCES)?;
            let _ = table.get("users")?;
            Ok(())
        })
    }
}

/// Issue the next id of the named sequence inside an open write transaction.
///
/// Ids start at 1 and are never reused.
pub(crate) fn next_id(txn: &WriteTransaction, sequence: &str) -> StoreResult<u64> {
    let mut table = txn.open_table(SEQUENCES)?;
    let current = table.get(sequence)?.map(|v| v.value()).unwrap_or(0);
    let next = current + 1;
    table.insert(sequence, next)?;
    Ok(next)
}

pub(crate) fn encode<T: Serialize>(value: &T) -> StoreResult<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> StoreResult<T> {
    Ok(serde_json::from_slice(bytes)?)
}

// =============================================================================
// Tests
// =============================================================================
