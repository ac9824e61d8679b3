// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Payment Intent Bridge
//!
//! Connects wallet funding to the payment provider:
//!
//! 1. [`PaymentBridge::create_intent`] asks the provider for a payment
//!    intent tagged with the user's id and email.
//! 2. The client completes payment with the returned `client_secret`.
//! 3. The provider delivers `payment_intent.succeeded`;
//!    [`PaymentBridge::handle_confirmation`] verifies it and credits the
//!    wallet once per intent id.

use std::{collections::BTreeMap, sync::Arc};

use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::auth::AuthenticatedUser;
use crate::ledger::{money, DepositOutcome, Ledger, LedgerError};
use crate::providers::{PaymentIntent, PaymentProvider, WebhookError};
use crate::storage::{Database, StoreError, UserRepository};

/// Description recorded on provider-confirmed deposits.
pub const STRIPE_DEPOSIT_DESCRIPTION: &str = "Stripe deposit";

/// Event type that credits a wallet.
pub const PAYMENT_SUCCEEDED_EVENT: &str = "payment_intent.succeeded";

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("{0}")]
    InvalidAmount(String),

    /// Provider failure, carrying the provider's message
    #[error("{0}")]
    Provider(String),

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl From<StoreError> for PaymentError {
    fn from(e: StoreError) -> Self {
        PaymentError::Ledger(e.into())
    }
}

impl From<WebhookError> for PaymentError {
    fn from(e: WebhookError) -> Self {
        match e {
            WebhookError::InvalidSignature => PaymentError::InvalidSignature,
            WebhookError::InvalidPayload(detail) => PaymentError::InvalidPayload(detail),
        }
    }
}

/// What a verified provider event did.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmationOutcome {
    Credited {
        user_id: u64,
        intent_id: String,
        amount: Decimal,
        balance: Decimal,
    },
    /// The intent was already credited
    AlreadyProcessed { intent_id: String },
    /// Metadata names no existing user; acknowledged without credit
    UnknownUser { intent_id: String },
    /// Event type that does not move money
    Ignored { event_type: String },
}

/// Wallet funding through an injected payment provider.
#[derive(Clone)]
pub struct PaymentBridge {
    provider: Arc<dyn PaymentProvider>,
    db: Arc<Database>,
    ledger: Ledger,
    currency: String,
    webhook_secret: String,
}

impl PaymentBridge {
    pub fn new(
        provider: Arc<dyn PaymentProvider>,
        db: Arc<Database>,
        currency: impl Into<String>,
        webhook_secret: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            ledger: Ledger::new(db.clone()),
            db,
            currency: currency.into(),
            webhook_secret: webhook_secret.into(),
        }
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Minimum accepted deposit (1.00 in major units).
    pub fn minimum_deposit() -> Decimal {
        Decimal::new(100, money::SCALE)
    }

    /// Create a payment intent for `amount` (major units) on behalf of `user`.
    pub async fn create_intent(
        &self,
        user: &AuthenticatedUser,
        amount: Decimal,
    ) -> Result<PaymentIntent, PaymentError> {
        if amount < Self::minimum_deposit() {
            return Err(PaymentError::InvalidAmount(
                "Minimum deposit is $1.00".to_string(),
            ));
        }
        let amount_minor = money::to_minor_units(amount)
            .ok_or_else(|| PaymentError::InvalidAmount("Amount is too large".to_string()))?;

        let metadata = BTreeMap::from([
            ("user_id".to_string(), user.user_id.to_string()),
            ("user_email".to_string(), user.email.clone()),
        ]);

        let intent = self
            .provider
            .create_payment_intent(amount_minor, &self.currency, &metadata)
            .await
            .map_err(|e| {
                warn!(user_id = user.user_id, error = %e, "Payment intent creation failed");
                PaymentError::Provider(e.to_string())
            })?;

        info!(
            user_id = user.user_id,
            intent_id = %intent.id,
            amount_minor,
            "Payment intent created"
        );
        Ok(intent)
    }

    /// Verify and apply a provider event delivery.
    ///
    /// Replays and events for unknown users succeed without crediting, so the
    /// provider stops retrying them.
    pub fn handle_confirmation(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<ConfirmationOutcome, PaymentError> {
        let event = self
            .provider
            .verify_and_parse_webhook(payload, signature_header, &self.webhook_secret)
            .inspect_err(|e| warn!(error = %e, "Rejected webhook delivery"))?;

        if event.event_type != PAYMENT_SUCCEEDED_EVENT {
            info!(event_id = %event.id, event_type = %event.event_type, "Ignoring webhook event");
            return Ok(ConfirmationOutcome::Ignored {
                event_type: event.event_type,
            });
        }

        let intent = &event.data.object;
        let intent_id = intent["id"]
            .as_str()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| PaymentError::InvalidPayload("payment intent id missing".to_string()))?
            .to_string();
        let amount_minor = intent["amount"].as_i64().ok_or_else(|| {
            PaymentError::InvalidPayload("payment intent amount missing".to_string())
        })?;

        let Some(user_id) = metadata_user_id(intent) else {
            warn!(intent_id = %intent_id, "Payment intent has no usable user_id metadata");
            return Ok(ConfirmationOutcome::UnknownUser { intent_id });
        };
        if UserRepository::new(&self.db).find(user_id)?.is_none() {
            warn!(intent_id = %intent_id, user_id, "Payment intent names an unknown user");
            return Ok(ConfirmationOutcome::UnknownUser { intent_id });
        }

        let amount = money::from_minor_units(amount_minor);
        let wallet = self.ledger.wallet_for_user(user_id)?;
        match self.ledger.deposit_with_reference(
            wallet.id,
            amount,
            STRIPE_DEPOSIT_DESCRIPTION,
            &intent_id,
        )? {
            DepositOutcome::Credited { balance, .. } => Ok(ConfirmationOutcome::Credited {
                user_id,
                intent_id,
                amount,
                balance,
            }),
            DepositOutcome::AlreadyProcessed => {
                Ok(ConfirmationOutcome::AlreadyProcessed { intent_id })
            }
        }
    }
}

/// `metadata.user_id` as written by [`PaymentBridge::create_intent`]
/// (a decimal string); bare numbers are accepted too.
fn metadata_user_id(intent: &serde_json::Value) -> Option<u64> {
    let value = &intent["metadata"]["user_id"];
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use serde_json::json;

    use super::*;
    use crate::providers::stripe::sign_payload;
    use crate::test_support::{seed_user, temp_db, FakeProvider, WEBHOOK_SECRET};

    fn bridge(provider: Arc<FakeProvider>) -> (PaymentBridge, Arc<Database>, tempfile::TempDir) {
        let (db, dir) = temp_db();
        let bridge = PaymentBridge::new(provider, db.clone(), "usd", WEBHOOK_SECRET);
        (bridge, db, dir)
    }

    fn succeeded_event(intent_id: &str, user_id: serde_json::Value, amount: i64) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "id": format!("evt_{intent_id}"),
            "type": "payment_intent.succeeded",
            "data": {
                "object": {
                    "id": intent_id,
                    "amount": amount,
                    "currency": "usd",
                    "metadata": { "user_id": user_id, "user_email": "ada@example.com" }
                }
            }
        }))
        .unwrap()
    }

    fn signed(payload: &[u8]) -> String {
        sign_payload(payload, WEBHOOK_SECRET, chrono::Utc::now().timestamp()).unwrap()
    }

    #[tokio::test]
    async fn create_intent_sends_minor_units_and_metadata() {
        let provider = Arc::new(FakeProvider::default());
        let (bridge, db, _dir) = bridge(provider.clone());
        let user = seed_user(&db, "ada@example.com");

        let intent = bridge
            .create_intent(&user.clone().into(), dec!(15.999))
            .await
            .unwrap();
        assert_eq!(intent.id, "pi_fake_1");

        let calls = provider.calls();
        assert_eq!(calls.len(), 1);
        let (amount_minor, currency, metadata) = &calls[0];
        assert_eq!(*amount_minor, 1599);
        assert_eq!(currency, "usd");
        assert_eq!(metadata["user_id"], user.id.to_string());
        assert_eq!(metadata["user_email"], "ada@example.com");
    }

    #[tokio::test]
    async fn create_intent_enforces_minimum() {
        let provider = Arc::new(FakeProvider::default());
        let (bridge, db, _dir) = bridge(provider.clone());
        let user = seed_user(&db, "ada@example.com");

        let result = bridge.create_intent(&user.into(), dec!(0.99)).await;
        assert!(matches!(result, Err(PaymentError::InvalidAmount(msg)) if msg == "Minimum deposit is $1.00"));
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn provider_failure_carries_provider_message() {
        let provider = Arc::new(FakeProvider::failing("Your card was declined."));
        let (bridge, db, _dir) = bridge(provider);
        let user = seed_user(&db, "ada@example.com");

        let result = bridge.create_intent(&user.into(), dec!(10.00)).await;
        assert!(matches!(result, Err(PaymentError::Provider(msg)) if msg == "Your card was declined."));
    }

    #[test]
    fn confirmation_credits_once() {
        let (bridge, db, _dir) = bridge(Arc::new(FakeProvider::default()));
        let user = seed_user(&db, "ada@example.com");
        let payload = succeeded_event("pi_123", json!(user.id.to_string()), 1500);

        let first = bridge.handle_confirmation(&payload, &signed(&payload)).unwrap();
        assert_eq!(
            first,
            ConfirmationOutcome::Credited {
                user_id: user.id,
                intent_id: "pi_123".to_string(),
                amount: dec!(15.00),
                balance: dec!(15.00),
            }
        );

        let replay = bridge.handle_confirmation(&payload, &signed(&payload)).unwrap();
        assert_eq!(
            replay,
            ConfirmationOutcome::AlreadyProcessed {
                intent_id: "pi_123".to_string()
            }
        );

        let ledger = Ledger::new(db.clone());
        let wallet = ledger.wallet_for_user(user.id).unwrap();
        assert_eq!(wallet.balance.to_string(), "15.00");
        let txs = ledger.transactions(wallet.id, 50).unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].description, "Stripe deposit");
        assert_eq!(txs[0].external_ref.as_deref(), Some("pi_123"));
    }

    #[test]
    fn bad_signature_is_rejected_before_parsing() {
        let (bridge, _db, _dir) = bridge(Arc::new(FakeProvider::default()));

        let result = bridge.handle_confirmation(b"not json", "t=1,v1=00");
        assert!(matches!(result, Err(PaymentError::InvalidSignature)));
    }

    #[test]
    fn invalid_json_with_valid_signature_is_invalid_payload() {
        let (bridge, _db, _dir) = bridge(Arc::new(FakeProvider::default()));
        let payload = b"not json";

        let result = bridge.handle_confirmation(payload, &signed(payload));
        assert!(matches!(result, Err(PaymentError::InvalidPayload(_))));
    }

    #[test]
    fn unknown_user_is_acknowledged_without_credit() {
        let (bridge, db, _dir) = bridge(Arc::new(FakeProvider::default()));
        let payload = succeeded_event("pi_404", json!("999"), 1500);

        let outcome = bridge.handle_confirmation(&payload, &signed(&payload)).unwrap();
        assert!(matches!(outcome, ConfirmationOutcome::UnknownUser { .. }));
        assert!(!crate::storage::LedgerStore::new(&db)
            .transaction_exists_with_ref("pi_404")
            .unwrap());

        let missing = succeeded_event("pi_405", serde_json::Value::Null, 1500);
        let outcome = bridge.handle_confirmation(&missing, &signed(&missing)).unwrap();
        assert!(matches!(outcome, ConfirmationOutcome::UnknownUser { .. }));
    }

    #[test]
    fn other_event_types_are_ignored() {
        let (bridge, _db, _dir) = bridge(Arc::new(FakeProvider::default()));
        let payload = serde_json::to_vec(&json!({
            "id": "evt_1",
            "type": "payment_intent.created",
            "data": { "object": { "id": "pi_1" } }
        }))
        .unwrap();

        let outcome = bridge.handle_confirmation(&payload, &signed(&payload)).unwrap();
        assert_eq!(
            outcome,
            ConfirmationOutcome::Ignored {
                event_type: "payment_intent.created".to_string()
            }
        );
    }
}
