// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Wallet Ledger
//!
//! Atomic balance mutations with paired transaction records.
//!
//! Every mutation loads the wallet, checks the new balance, writes it back and
//! appends exactly one [`StoredTransaction`], all inside one redb write
//! transaction. redb admits a single writer at a time, so concurrent
//! mutations of a wallet are serialized and a rejected mutation leaves no
//! trace.

pub mod error;
pub mod fee;
pub mod money;

use std::sync::Arc;

use chrono::Utc;
use redb::WriteTransaction;
use rust_decimal::Decimal;

pub use error::{LedgerError, LedgerResult};
pub use fee::{FeeDebitHook, POST_CREATION_FEE_DESCRIPTION};

use crate::storage::{
    Database, LedgerStore, StoreError, StoredTransaction, StoredWallet, TransactionType,
};

/// Result of a referenced deposit.
#[derive(Debug, Clone)]
pub enum DepositOutcome {
    /// The wallet was credited
    Credited {
        balance: Decimal,
        transaction: StoredTransaction,
    },
    /// The reference was already recorded; nothing changed
    AlreadyProcessed,
}

/// Ledger engine. Cheap to clone.
#[derive(Clone)]
pub struct Ledger {
    db: Arc<Database>,
}

impl Ledger {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// The user's wallet, created empty on first access.
    pub fn wallet_for_user(&self, user_id: u64) -> LedgerResult<StoredWallet> {
        Ok(LedgerStore::new(&self.db).get_or_create_wallet(user_id)?)
    }

    pub fn wallet(&self, wallet_id: u64) -> LedgerResult<StoredWallet> {
        Ok(LedgerStore::new(&self.db).get_wallet(wallet_id)?)
    }

    /// Newest-first transaction history.
    pub fn transactions(
        &self,
        wallet_id: u64,
        limit: usize,
    ) -> LedgerResult<Vec<StoredTransaction>> {
        Ok(LedgerStore::new(&self.db).list_transactions(wallet_id, limit)?)
    }

    /// Whether the wallet covers `amount`, rounded to cents first.
    pub fn has_sufficient_funds(&self, wallet_id: u64, amount: Decimal) -> LedgerResult<bool> {
        let wallet = self.wallet(wallet_id)?;
        Ok(wallet.has_sufficient_funds(money::quantize(amount)))
    }

    /// Credit the wallet. Returns the new balance.
    pub fn deposit(
        &self,
        wallet_id: u64,
        amount: Decimal,
        description: &str,
    ) -> LedgerResult<Decimal> {
        let amount = money::validate_amount(amount)?;
        let (balance, tx) = self.db.write(|txn| {
            apply(txn, wallet_id, amount, TransactionType::Deposit, description, None)
        })?;
        tracing::info!(wallet_id, transaction_id = tx.id, %amount, %balance, "Deposit recorded");
        Ok(balance)
    }

    /// Debit the wallet. Returns the new balance.
    ///
    /// Fails with [`LedgerError::InsufficientFunds`] and no side effect when
    /// the balance does not cover `amount`.
    pub fn withdraw(
        &self,
        wallet_id: u64,
        amount: Decimal,
        description: &str,
    ) -> LedgerResult<Decimal> {
        self.withdraw_and(wallet_id, amount, description, |_| Ok(()))
            .map(|(balance, ())| balance)
    }

    /// Debit the wallet and run `grant` in the same atomic unit.
    ///
    /// If `grant` fails the debit is rolled back too, so a caller can never
    /// pay for something it did not receive.
    pub fn withdraw_and<T>(
        &self,
        wallet_id: u64,
        amount: Decimal,
        description: &str,
        grant: impl FnOnce(&WriteTransaction) -> Result<T, StoreError>,
    ) -> LedgerResult<(Decimal, T)> {
        let amount = money::validate_amount(amount)?;
        let result = self.db.write(|txn| {
            let (balance, tx) = apply(
                txn,
                wallet_id,
                amount,
                TransactionType::Withdrawal,
                description,
                None,
            )?;
            let granted = grant(txn)?;
            Ok::<_, LedgerError>((balance, tx, granted))
        });

        match result {
            Ok((balance, tx, granted)) => {
                tracing::info!(wallet_id, transaction_id = tx.id, %amount, %balance, "Withdrawal recorded");
                Ok((balance, granted))
            }
            Err(LedgerError::InsufficientFunds { required, balance }) => {
                tracing::info!(wallet_id, %required, %balance, "Withdrawal rejected: insufficient funds");
                Err(LedgerError::InsufficientFunds { required, balance })
            }
            Err(e) => Err(e),
        }
    }

    /// Credit the wallet once per external reference.
    ///
    /// The reference check runs inside the same write transaction as the
    /// credit, so concurrent deliveries of one reference credit exactly once.
    pub fn deposit_with_reference(
        &self,
        wallet_id: u64,
        amount: Decimal,
        description: &str,
        external_ref: &str,
    ) -> LedgerResult<DepositOutcome> {
        let amount = money::validate_amount(amount)?;
        let outcome = self.db.write(|txn| {
            if LedgerStore::ref_exists(txn, external_ref)? {
                return Ok::<_, LedgerError>(DepositOutcome::AlreadyProcessed);
            }
            let (balance, transaction) = apply(
                txn,
                wallet_id,
                amount,
                TransactionType::Deposit,
                description,
                Some(external_ref),
            )?;
            Ok(DepositOutcome::Credited {
                balance,
                transaction,
            })
        })?;

        match &outcome {
            DepositOutcome::Credited { balance, transaction } => tracing::info!(
                wallet_id,
                transaction_id = transaction.id,
                external_ref,
                %amount,
                %balance,
                "Referenced deposit recorded"
            ),
            DepositOutcome::AlreadyProcessed => {
                tracing::info!(wallet_id, external_ref, "Reference already recorded, skipping")
            }
        }
        Ok(outcome)
    }
}

/// Mutate the balance and append the paired transaction.
fn apply(
    txn: &WriteTransaction,
    wallet_id: u64,
    amount: Decimal,
    transaction_type: TransactionType,
    description: &str,
    external_ref: Option<&str>,
) -> LedgerResult<(Decimal, StoredTransaction)> {
    let mut wallet = LedgerStore::load_wallet(txn, wallet_id)?;

    wallet.balance = match transaction_type {
        TransactionType::Deposit => wallet.balance + amount,
        TransactionType::Withdrawal => {
            if !wallet.has_sufficient_funds(amount) {
                return Err(LedgerError::InsufficientFunds {
                    required: amount,
                    balance: wallet.balance,
                });
            }
            wallet.balance - amount
        }
    };
    wallet.updated_at = Utc::now();
    LedgerStore::save_wallet(txn, &wallet)?;

    let tx = LedgerStore::append_transaction(
        txn,
        wallet_id,
        amount,
        transaction_type,
        description,
        external_ref,
    )?;
    Ok((wallet.balance, tx))
}
