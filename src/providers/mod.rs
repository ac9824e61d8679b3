// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! External payment providers.
//!
//! The [`PaymentProvider`] trait is the seam between the wallet and a
//! hosted payment service. [`stripe::StripeClient`] is the production
//! implementation; tests inject their own.

pub mod stripe;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

/// A payment request created at the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    /// Provider id (e.g. `pi_...`)
    pub id: String,
    /// Secret handed to the client to complete payment
    pub client_secret: String,
}

/// A verified provider event.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEventData {
    /// The resource the event is about (a payment intent for `payment_intent.*`)
    pub object: Value,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("payment provider configuration missing: {0}")]
    MissingConfig(String),

    #[error("payment provider request failed: {0}")]
    Request(String),

    /// The provider refused the request; carries the provider's message
    #[error("{0}")]
    Rejected(String),

    #[error("payment provider response was invalid: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("webhook signature is invalid")]
    InvalidSignature,

    #[error("webhook payload is invalid: {0}")]
    InvalidPayload(String),
}

/// Capability required from a hosted payment service.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a payment intent for `amount_minor` units of `currency`.
    async fn create_payment_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<PaymentIntent, ProviderError>;

    /// Verify a webhook delivery against `secret` and parse its event.
    ///
    /// The signature is checked before the payload is parsed.
    fn verify_and_parse_webhook(
        &self,
        payload: &[u8],
        signature_header: &str,
        secret: &str,
    ) -> Result<WebhookEvent, WebhookError>;
}
