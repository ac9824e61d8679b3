// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger store: wallets and their append-only transaction log.
//!
//! ## Invariants
//!
//! - Exactly one wallet per user (`wallet_owners` index).
//! - A wallet balance equals the signed sum of its transactions and is never
//!   negative.
//! - An external payment reference appears on at most one transaction.
//!
//! Balance changes go through [`crate::ledger::Ledger`], which pairs every
//! wallet update with exactly one [`LedgerStore::append_transaction`] call in
//! the same write transaction.

use chrono::{DateTime, Utc};
use redb::{ReadableTable, WriteTransaction};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::storage::db::{
    decode, encode, next_id, Database, PAYMENT_REFS, TRANSACTIONS, WALLETS, WALLET_OWNERS,
    WALLET_TX_INDEX,
};
use crate::storage::{StoreError, StoreResult};

/// Direction of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Funds added to the wallet
    Deposit,
    /// Funds removed from the wallet
    Withdrawal,
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Deposit => write!(f, "deposit"),
            Self::Withdrawal => write!(f, "withdrawal"),
        }
    }
}

/// Persisted wallet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredWallet {
    pub id: u64,
    pub user_id: u64,
    /// Always scale 2, never negative
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredWallet {
    /// Whether the balance covers `amount` (already at scale 2).
    pub fn has_sufficient_funds(&self, amount: Decimal) -> bool {
        self.balance >= amount
    }
}

/// Immutable ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredTransaction {
    pub id: u64,
    pub wallet_id: u64,
    /// Always positive; the sign comes from `transaction_type`
    pub amount: Decimal,
    pub transaction_type: TransactionType,
    pub description: String,
    /// Provider reference (e.g. a payment intent id), unique when present
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub external_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Index key ordering a wallet's transactions newest first.
fn tx_index_key(wallet_id: u64, tx_id: u64) -> (u64, u64) {
    (wallet_id, !tx_id)
}

/// Read/write access to wallets and transactions.
pub struct LedgerStore<'a> {
    db: &'a Database,
}

impl<'a> LedgerStore<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Fetch the user's wallet, creating an empty one on first access.
    pub fn get_or_create_wallet(&self, user_id: u64) -> StoreResult<StoredWallet> {
        if let Some(wallet) = self.find_wallet_by_user(user_id)? {
            return Ok(wallet);
        }
        // Another request may have created it in between; the write path
        // re-checks under the write lock.
        self.db.write(|txn| Self::wallet_for_user(txn, user_id))
    }

    /// Fetch the user's wallet without creating it.
    pub fn find_wallet_by_user(&self, user_id: u64) -> StoreResult<Option<StoredWallet>> {
        self.db.read(|txn| {
            let owners = txn.open_table(WALLET_OWNERS)?;
            let Some(wallet_id) = owners.get(user_id)?.map(|v| v.value()) else {
                return Ok(None);
            };
            let wallets = txn.open_table(WALLETS)?;
            match wallets.get(wallet_id)? {
                Some(value) => Ok(Some(decode(value.value())?)),
                None => Ok(None),
            }
        })
    }

    /// Get a wallet by id.
    pub fn get_wallet(&self, wallet_id: u64) -> StoreResult<StoredWallet> {
        self.db.read(|txn| {
            let wallets = txn.open_table(WALLETS)?;
            match wallets.get(wallet_id)? {
                Some(value) => decode(value.value()),
                None => Err(StoreError::NotFound(format!("Wallet {wallet_id}"))),
            }
        })
    }

    /// List a wallet's transactions, newest first.
    pub fn list_transactions(
        &self,
        wallet_id: u64,
        limit: usize,
    ) -> StoreResult<Vec<StoredTransaction>> {
        self.db.read(|txn| {
            let index = txn.open_table(WALLET_TX_INDEX)?;
            let transactions = txn.open_table(TRANSACTIONS)?;

            let mut results = Vec::with_capacity(limit.min(128));
            let range = index.range((wallet_id, 0u64)..=(wallet_id, u64::MAX))?;
            for entry in range {
                if results.len() >= limit {
                    break;
                }
                let (_, tx_id) = entry?;
                if let Some(value) = transactions.get(tx_id.value())? {
                    results.push(decode(value.value())?);
                }
            }
            Ok(results)
        })
    }

    /// Whether a transaction already carries this external reference.
    pub fn transaction_exists_with_ref(&self, external_ref: &str) -> StoreResult<bool> {
        self.db.read(|txn| {
            let refs = txn.open_table(PAYMENT_REFS)?;
            Ok(refs.get(external_ref)?.is_some())
        })
    }

    // =========================================================================
    // In-transaction operations
    // =========================================================================

    /// Get-or-create inside an open write transaction.
    pub(crate) fn wallet_for_user(
        txn: &WriteTransaction,
        user_id: u64,
    ) -> StoreResult<StoredWallet> {
        let mut owners = txn.open_table(WALLET_OWNERS)?;
        let existing = owners.get(user_id)?.map(|v| v.value());
        match existing {
            Some(wallet_id) => Self::load_wallet(txn, wallet_id),
            None => {
                let now = Utc::now();
                let wallet = StoredWallet {
                    id: next_id(txn, "wallets")?,
                    user_id,
                    balance: Decimal::new(0, 2),
                    created_at: now,
                    updated_at: now,
                };
                owners.insert(user_id, wallet.id)?;
                Self::save_wallet(txn, &wallet)?;
                tracing::info!(wallet_id = wallet.id, user_id, "Created wallet");
                Ok(wallet)
            }
        }
    }

    /// Load a wallet inside an open write transaction.
    pub(crate) fn load_wallet(txn: &WriteTransaction, wallet_id: u64) -> StoreResult<StoredWallet> {
        let wallets = txn.open_table(WALLETS)?;
        let bytes = {
            let value = wallets
                .get(wallet_id)?
                .ok_or_else(|| StoreError::NotFound(format!("Wallet {wallet_id}")))?;
            value.value().to_vec()
        };
        decode(&bytes)
    }

    pub(crate) fn save_wallet(txn: &WriteTransaction, wallet: &StoredWallet) -> StoreResult<()> {
        let bytes = encode(wallet)?;
        let mut wallets = txn.open_table(WALLETS)?;
        wallets.insert(wallet.id, bytes.as_slice())?;
        Ok(())
    }

    /// Reference check inside an open write transaction.
    pub(crate) fn ref_exists(txn: &WriteTransaction, external_ref: &str) -> StoreResult<bool> {
        let refs = txn.open_table(PAYMENT_REFS)?;
        let exists = refs.get(external_ref)?.is_some();
        Ok(exists)
    }

    /// Append a ledger entry. Only callable inside an open write transaction.
    ///
    /// # Returns
    /// - `Err(StoreError::AlreadyExists)` if `external_ref` is already recorded
    pub fn append_transaction(
        txn: &WriteTransaction,
        wallet_id: u64,
        amount: Decimal,
        transaction_type: TransactionType,
        description: &str,
        external_ref: Option<&str>,
    ) -> StoreResult<StoredTransaction> {
        if let Some(reference) = external_ref {
            let mut refs = txn.open_table(PAYMENT_REFS)?;
            if refs.get(reference)?.is_some() {
                return Err(StoreError::AlreadyExists(format!(
                    "Transaction with reference {reference}"
                )));
            }
            let tx_id = next_id(txn, "transactions")?;
            refs.insert(reference, tx_id)?;
            return Self::insert_transaction(
                txn,
                StoredTransaction {
                    id: tx_id,
                    wallet_id,
                    amount,
                    transaction_type,
                    description: description.to_string(),
                    external_ref: Some(reference.to_string()),
                    created_at: Utc::now(),
                },
            );
        }

        let tx = StoredTransaction {
            id: next_id(txn, "transactions")?,
            wallet_id,
            amount,
            transaction_type,
            description: description.to_string(),
            external_ref: None,
            created_at: Utc::now(),
        };
        Self::insert_transaction(txn, tx)
    }

    fn insert_transaction(
        txn: &WriteTransaction,
        tx: StoredTransaction,
    ) -> StoreResult<StoredTransaction> {
        let bytes = encode(&tx)?;
        let mut transactions = txn.open_table(TRANSACTIONS)?;
        transactions.insert(tx.id, bytes.as_slice())?;
        let mut index = txn.open_table(WALLET_TX_INDEX)?;
        index.insert(tx_index_key(tx.wallet_id, tx.id), tx.id)?;
        Ok(tx)
    }
}
