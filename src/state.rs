// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::TokenIssuer;
use crate::config::AppConfig;
use crate::ledger::{FeeDebitHook, Ledger};
use crate::payments::PaymentBridge;
use crate::storage::Database;

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub ledger: Ledger,
    pub post_fee: FeeDebitHook,
    pub tokens: Arc<TokenIssuer>,
    /// `None` when Stripe is not configured
    pub payments: Option<PaymentBridge>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(db: Arc<Database>, config: AppConfig) -> Self {
        let ledger = Ledger::new(db.clone());
        Self {
            post_fee: FeeDebitHook::post_creation(ledger.clone(), config.post_creation_cost),
            tokens: Arc::new(TokenIssuer::new(
                config.jwt_secret.as_bytes(),
                config.jwt_ttl_secs,
            )),
            ledger,
            db,
            payments: None,
            config: Arc::new(config),
        }
    }

    /// Enable wallet funding through `bridge`.
    pub fn with_payments(mut self, bridge: PaymentBridge) -> Self {
        self.payments = Some(bridge);
        self
    }
}
