// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared fixtures for unit tests.

use std::{
    collections::BTreeMap,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method, Request, StatusCode,
    },
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use crate::auth::{password::hash_password_with, UserType};
use crate::config::{AppConfig, LogFormat};
use crate::payments::PaymentBridge;
use crate::providers::{
    stripe, PaymentIntent, PaymentProvider, ProviderError, WebhookError, WebhookEvent,
};
use crate::state::AppState;
use crate::storage::{Database, NewUser, StoredUser, UserRepository};

pub const JWT_SECRET: &[u8] = b"test-jwt-secret";
pub const WEBHOOK_SECRET: &str = "whsec_test_secret";
pub const TEST_PASSWORD: &str = "correct horse battery staple";

pub fn temp_db() -> (Arc<Database>, TempDir) {
    let dir = TempDir::new().unwrap();
    let db = Database::open(&dir.path().join("test.redb")).unwrap();
    (Arc::new(db), dir)
}

pub fn test_config(data_dir: PathBuf) -> AppConfig {
    AppConfig {
        data_dir,
        host: "127.0.0.1".to_string(),
        port: 0,
        jwt_secret: String::from_utf8(JWT_SECRET.to_vec()).unwrap(),
        jwt_ttl_secs: 3600,
        token_blacklist_ttl_secs: 7200,
        post_creation_cost: Decimal::new(500, 2),
        payment_currency: "usd".to_string(),
        stripe: None,
        log_format: LogFormat::Pretty,
    }
}

/// State without payment support.
pub fn test_state() -> (AppState, TempDir) {
    let (db, dir) = temp_db();
    let state = AppState::new(db, test_config(dir.path().to_path_buf()));
    (state, dir)
}

/// State with a payment bridge backed by `provider`.
pub fn test_state_with_provider(provider: Arc<FakeProvider>) -> (AppState, TempDir) {
    let (state, dir) = test_state();
    let bridge = PaymentBridge::new(provider, state.db.clone(), "usd", WEBHOOK_SECRET);
    (state.with_payments(bridge), dir)
}

/// Insert a user directly (cheap password hash).
pub fn seed_user(db: &Database, email: &str) -> StoredUser {
    UserRepository::new(db)
        .create(NewUser {
            email: email.to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            dob: NaiveDate::from_ymd_opt(1990, 12, 10).unwrap(),
            user_type: UserType::Editor,
            password_hash: hash_password_with(TEST_PASSWORD, 1_000).unwrap(),
        })
        .unwrap()
}

/// Insert a user and issue a token for it.
pub fn create_user(state: &AppState, email: &str) -> (StoredUser, String) {
    let user = seed_user(&state.db, email);
    let token = state.tokens.issue(&user).unwrap();
    (user, token)
}

/// Credit a user's wallet outside of any provider flow.
pub fn fund_user(state: &AppState, user_id: u64, amount: Decimal) {
    let wallet = state.ledger.wallet_for_user(user_id).unwrap();
    state.ledger.deposit(wallet.id, amount, "test funding").unwrap();
}

/// Run `request` through the full router; the body is parsed as JSON
/// (`Value::Null` when empty).
pub async fn send(state: &AppState, request: Request<Body>) -> (StatusCode, Value) {
    let response = crate::api::router(state.clone())
        .oneshot(request)
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

/// JSON request with an optional bearer token.
pub async fn send_json(
    state: &AppState,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    send(state, builder.body(body).unwrap()).await
}

type IntentCall = (i64, String, BTreeMap<String, String>);

/// Provider double: records intent requests, verifies webhooks with the real
/// Stripe signature scheme.
#[derive(Default)]
pub struct FakeProvider {
    calls: Mutex<Vec<IntentCall>>,
    failure: Option<String>,
}

impl FakeProvider {
    pub fn failing(message: &str) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failure: Some(message.to_string()),
        }
    }

    pub fn calls(&self) -> Vec<IntentCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentProvider for FakeProvider {
    async fn create_payment_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<PaymentIntent, ProviderError> {
        let mut calls = self.calls.lock().unwrap();
        calls.push((amount_minor, currency.to_string(), metadata.clone()));
        if let Some(message) = &self.failure {
            return Err(ProviderError::Rejected(message.clone()));
        }
        let n = calls.len();
        Ok(PaymentIntent {
            id: format!("pi_fake_{n}"),
            client_secret: format!("pi_fake_{n}_secret_abc"),
        })
    }

    fn verify_and_parse_webhook(
        &self,
        payload: &[u8],
        signature_header: &str,
        secret: &str,
    ) -> Result<WebhookEvent, WebhookError> {
        stripe::verify_signature(payload, signature_header, secret, Utc::now().timestamp())?;
        stripe::parse_event(payload)
    }
}
