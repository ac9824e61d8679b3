// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger errors.

use rust_decimal::Decimal;

use crate::storage::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Zero, negative, malformed or sub-cent amount
    #[error("{0}")]
    InvalidAmount(String),

    /// Balance does not cover the withdrawal; nothing was changed
    #[error("insufficient funds: required {required}, balance {balance}")]
    InsufficientFunds { required: Decimal, balance: Decimal },

    #[error("{0} not found")]
    NotFound(String),

    #[error("storage error: {0}")]
    Store(StoreError),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

impl From<StoreError> for LedgerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => LedgerError::NotFound(what),
            other => LedgerError::Store(other),
        }
    }
}
