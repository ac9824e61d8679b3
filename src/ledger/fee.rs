// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Fee debit hook for paid actions.

use redb::WriteTransaction;
use rust_decimal::Decimal;

use super::{money, Ledger, LedgerError, LedgerResult};
use crate::storage::StoreError;

/// Description recorded on post creation fee withdrawals.
pub const POST_CREATION_FEE_DESCRIPTION: &str = "Post creation fee";

/// Debits a fixed cost from the acting user's wallet.
#[derive(Clone)]
pub struct FeeDebitHook {
    ledger: Ledger,
    cost: Decimal,
    description: &'static str,
}

impl FeeDebitHook {
    /// Hook charging `cost` for each created post.
    pub fn post_creation(ledger: Ledger, cost: Decimal) -> Self {
        Self {
            ledger,
            cost,
            description: POST_CREATION_FEE_DESCRIPTION,
        }
    }

    pub fn cost(&self) -> Decimal {
        self.cost
    }

    /// Charge the fee with nothing granted in return. Returns the new balance.
    pub fn charge(&self, user_id: u64) -> LedgerResult<Decimal> {
        self.charge_with(user_id, |_| Ok(())).map(|(balance, ())| balance)
    }

    /// Charge the fee and run `grant` in the same atomic unit.
    ///
    /// Fails with [`LedgerError::InsufficientFunds`] before `grant` runs when
    /// the wallet cannot cover the fee. If `grant` fails, the debit is rolled
    /// back.
    pub fn charge_with<T>(
        &self,
        user_id: u64,
        grant: impl FnOnce(&WriteTransaction) -> Result<T, StoreError>,
    ) -> LedgerResult<(Decimal, T)> {
        let wallet = self.ledger.wallet_for_user(user_id)?;

        if !wallet.has_sufficient_funds(money::quantize(self.cost)) {
            tracing::info!(
                user_id,
                wallet_id = wallet.id,
                cost = %self.cost,
                balance = %wallet.balance,
                "Fee rejected: insufficient funds"
            );
            return Err(LedgerError::InsufficientFunds {
                required: self.cost,
                balance: wallet.balance,
            });
        }

        // The balance is re-checked under the write lock.
        self.ledger
            .withdraw_and(wallet.id, self.cost, self.description, grant)
    }
}
