// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Stripe integration for wallet funding.
//!
//! - Payment intents are created through the REST API with form-encoded
//!   bodies and a per-request `Idempotency-Key`.
//! - Webhooks are verified with the `Stripe-Signature` scheme:
//!   `t=<unix ts>,v1=<hex HMAC-SHA256(secret, "<t>.<payload>")>`.

use std::{collections::BTreeMap, time::Duration};

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use sha2::Sha256;
use tracing::info;
use uuid::Uuid;

use super::{PaymentIntent, PaymentProvider, ProviderError, WebhookError, WebhookEvent};
use crate::config::StripeConfig;

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of a signed webhook delivery.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Clone)]
pub struct StripeClient {
    api_base_url: String,
    secret_key: String,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct PaymentIntentResponse {
    id: String,
    #[serde(default)]
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    #[serde(default)]
    message: Option<String>,
}

impl StripeClient {
    pub fn new(config: &StripeConfig) -> Result<Self, ProviderError> {
        if config.secret_key.trim().is_empty() {
            return Err(ProviderError::MissingConfig("STRIPE_SECRET_KEY".to_string()));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| ProviderError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
            http,
        })
    }

    async fn post_form(
        &self,
        path: &str,
        form: &[(String, String)],
        idempotency_key: &str,
    ) -> Result<reqwest::Response, ProviderError> {
        let response = self
            .http
            .post(format!("{}{}", self.api_base_url, path))
            .bearer_auth(&self.secret_key)
            .header("Idempotency-Key", idempotency_key)
            .form(form)
            .send()
            .await
            .map_err(|e| ProviderError::Request(format!("POST {path} failed: {e}")))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(match provider_message(&body) {
            Some(message) => ProviderError::Rejected(message),
            None => ProviderError::Request(format!("POST {path} returned {status}")),
        })
    }
}

#[async_trait]
impl PaymentProvider for StripeClient {
    async fn create_payment_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<PaymentIntent, ProviderError> {
        let form = payment_intent_form(amount_minor, currency, metadata);
        let idempotency_key = Uuid::new_v4().to_string();

        let response = self
            .post_form("/v1/payment_intents", &form, &idempotency_key)
            .await?;
        let intent: PaymentIntentResponse = response.json().await.map_err(|e| {
            ProviderError::InvalidResponse(format!("payment intent invalid JSON: {e}"))
        })?;

        let client_secret = intent.client_secret.ok_or_else(|| {
            ProviderError::InvalidResponse("payment intent has no client_secret".to_string())
        })?;

        info!(intent_id = %intent.id, amount_minor, currency, "Created Stripe payment intent");
        Ok(PaymentIntent {
            id: intent.id,
            client_secret,
        })
    }

    fn verify_and_parse_webhook(
        &self,
        payload: &[u8],
        signature_header: &str,
        secret: &str,
    ) -> Result<WebhookEvent, WebhookError> {
        verify_signature(payload, signature_header, secret, Utc::now().timestamp())?;
        parse_event(payload)
    }
}

/// Parse a webhook payload whose signature was already verified.
pub fn parse_event(payload: &[u8]) -> Result<WebhookEvent, WebhookError> {
    serde_json::from_slice(payload).map_err(|e| WebhookError::InvalidPayload(e.to_string()))
}

/// Verify a `Stripe-Signature` header at time `now` (unix seconds).
///
/// Accepts the delivery when any `v1` signature matches and the signed
/// timestamp is within [`SIGNATURE_TOLERANCE_SECS`] of `now`, in either
/// direction. Comparison is constant time.
pub fn verify_signature(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
    now: i64,
) -> Result<(), WebhookError> {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for item in signature_header.split(',') {
        let Some((key, value)) = item.split_once('=') else {
            continue;
        };
        match key.trim() {
            "t" => timestamp = value.trim().parse().ok(),
            "v1" => signatures.push(value.trim()),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(WebhookError::InvalidSignature)?;
    let within_tolerance = now
        .checked_sub(timestamp)
        .is_some_and(|age| age.unsigned_abs() <= SIGNATURE_TOLERANCE_SECS.unsigned_abs());
    if signatures.is_empty() || !within_tolerance {
        return Err(WebhookError::InvalidSignature);
    }

    for signature in signatures {
        let Ok(expected) = hex::decode(signature) else {
            continue;
        };
        let mac = signed_payload_mac(payload, secret, timestamp)?;
        if mac.verify_slice(&expected).is_ok() {
            return Ok(());
        }
    }
    Err(WebhookError::InvalidSignature)
}

/// Build a `Stripe-Signature` header for `payload` signed at `timestamp`.
///
/// Useful for replaying deliveries against a local server.
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> Result<String, WebhookError> {
    let mac = signed_payload_mac(payload, secret, timestamp)?;
    Ok(format!(
        "t={timestamp},v1={}",
        hex::encode(mac.finalize().into_bytes())
    ))
}

fn signed_payload_mac(
    payload: &[u8],
    secret: &str,
    timestamp: i64,
) -> Result<HmacSha256, WebhookError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| WebhookError::InvalidSignature)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

fn payment_intent_form(
    amount_minor: i64,
    currency: &str,
    metadata: &BTreeMap<String, String>,
) -> Vec<(String, String)> {
    let mut form = vec![
        ("amount".to_string(), amount_minor.to_string()),
        ("currency".to_string(), currency.to_ascii_lowercase()),
        (
            "automatic_payment_methods[enabled]".to_string(),
            "true".to_string(),
        ),
    ];
    for (key, value) in metadata {
        form.push((format!("metadata[{key}]"), value.clone()));
    }
    form
}

fn provider_message(body: &str) -> Option<String> {
    serde_json::from_str::<StripeErrorResponse>(body)
        .ok()
        .and_then(|response| response.error.message)
        .map(|message| message.trim().to_string())
        .filter(|message| !message.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";
    const PAYLOAD: &[u8] = br#"{"id":"evt_1","type":"payment_intent.succeeded","data":{"object":{"id":"pi_123"}}}"#;

    #[test]
    fn signed_payload_verifies() {
        let header = sign_payload(PAYLOAD, SECRET, 1_700_000_000).unwrap();
        assert!(verify_signature(PAYLOAD, &header, SECRET, 1_700_000_010).is_ok());
    }

    #[test]
    fn tampered_payload_fails() {
        let header = sign_payload(PAYLOAD, SECRET, 1_700_000_000).unwrap();
        let tampered = br#"{"id":"evt_1","type":"payment_intent.succeeded","data":{"object":{"id":"pi_999"}}}"#;
        assert!(matches!(
            verify_signature(tampered, &header, SECRET, 1_700_000_000),
            Err(WebhookError::InvalidSignature)
        ));
    }

    #[test]
    fn wrong_secret_fails() {
        let header = sign_payload(PAYLOAD, "whsec_other", 1_700_000_000).unwrap();
        assert!(verify_signature(PAYLOAD, &header, SECRET, 1_700_000_000).is_err());
    }

    #[test]
    fn stale_timestamp_fails() {
        let header = sign_payload(PAYLOAD, SECRET, 1_700_000_000).unwrap();
        let now = 1_700_000_000 + SIGNATURE_TOLERANCE_SECS + 1;
        assert!(verify_signature(PAYLOAD, &header, SECRET, now).is_err());
    }

    #[test]
    fn extreme_timestamps_are_rejected() {
        let now = 1_700_000_000;
        for t in [i64::MIN, i64::MAX, -1, now + SIGNATURE_TOLERANCE_SECS + 1] {
            let header = format!("t={t},v1=00");
            assert!(
                matches!(
                    verify_signature(b"{}", &header, SECRET, now),
                    Err(WebhookError::InvalidSignature)
                ),
                "t={t} should be rejected"
            );
        }
        assert!(verify_signature(b"{}", "t=0,v1=00", SECRET, i64::MIN).is_err());
    }

    #[test]
    fn future_timestamp_within_tolerance_verifies() {
        let header = sign_payload(PAYLOAD, SECRET, 1_700_000_060).unwrap();
        assert!(verify_signature(PAYLOAD, &header, SECRET, 1_700_000_000).is_ok());
    }

    #[test]
    fn any_matching_v1_signature_is_accepted() {
        let valid = sign_payload(PAYLOAD, SECRET, 1_700_000_000).unwrap();
        let valid_sig = valid.split_once("v1=").unwrap().1;
        let header = format!("t=1700000000,v1=deadbeef,v0=ignored,v1={valid_sig}");
        assert!(verify_signature(PAYLOAD, &header, SECRET, 1_700_000_000).is_ok());
    }

    #[test]
    fn malformed_headers_fail() {
        for header in ["", "garbage", "t=abc,v1=00", "t=1700000000", "v1=00"] {
            assert!(
                verify_signature(PAYLOAD, header, SECRET, 1_700_000_000).is_err(),
                "header {header:?} should be rejected"
            );
        }
    }

    #[test]
    fn parse_event_reads_type_and_object() {
        let event = parse_event(PAYLOAD).unwrap();
        assert_eq!(event.id, "evt_1");
        assert_eq!(event.event_type, "payment_intent.succeeded");
        assert_eq!(event.data.object["id"], "pi_123");
        assert!(matches!(
            parse_event(b"not json"),
            Err(WebhookError::InvalidPayload(_))
        ));
    }

    #[test]
    fn payment_intent_form_flattens_metadata() {
        let metadata = BTreeMap::from([
            ("user_email".to_string(), "ada@example.com".to_string()),
            ("user_id".to_string(), "7".to_string()),
        ]);
        let form = payment_intent_form(1500, "USD", &metadata);

        assert!(form.contains(&("amount".to_string(), "1500".to_string())));
        assert!(form.contains(&("currency".to_string(), "usd".to_string())));
        assert!(form.contains(&("metadata[user_id]".to_string(), "7".to_string())));
        assert!(form.contains(&(
            "metadata[user_email]".to_string(),
            "ada@example.com".to_string()
        )));
    }

    #[test]
    fn provider_message_extracts_stripe_error() {
        let body = r#"{"error":{"type":"card_error","message":"Your card was declined."}}"#;
        assert_eq!(
            provider_message(body).as_deref(),
            Some("Your card was declined.")
        );
        assert_eq!(provider_message("<html>bad gateway</html>"), None);
        assert_eq!(provider_message(r#"{"error":{}}"#), None);
    }

    #[test]
    fn client_requires_secret_key() {
        let config = StripeConfig {
            secret_key: "  ".to_string(),
            webhook_secret: SECRET.to_string(),
            api_base_url: "https://api.stripe.com".to_string(),
        };
        assert!(matches!(
            StripeClient::new(&config),
            Err(ProviderError::MissingConfig(_))
        ));
    }
}
